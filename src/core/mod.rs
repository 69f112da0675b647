//! Core, platform independent networking code.

pub mod arp_cache;
pub mod dev;
pub mod netdev;
pub mod repr;
pub mod service;
pub mod time;
