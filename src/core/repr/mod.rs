//! Serialization for packet and frame wire formats.

pub mod arp;
pub mod ethernet;
pub mod ipv4;

pub use self::arp::{
    hw_types,
    Arp,
    Op as ArpOp,
};
pub use self::ethernet::{
    eth_types,
    Address as EthernetAddress,
    Frame as EthernetFrame,
};
pub use self::ipv4::Address as Ipv4Address;
