//! Packet processing services for different network layers.
//!
//! The `service` module deals with protocol logic above the dispatch
//! registries. Each protocol owns its state and registers an inbound
//! handler with the stack.

pub mod arp;

pub use self::arp::{
    ArpService,
    Resolution,
};
