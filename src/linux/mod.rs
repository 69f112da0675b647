//! Linux platform support.

pub mod dev;
pub mod libc;

pub use self::dev::Tap;
