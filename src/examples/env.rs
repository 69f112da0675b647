use std::sync::Arc;

use core::netdev::{
    DriverDef,
    NetDevice,
    Netif,
    Stack,
    NETDEV_FLAG_BROADCAST,
    NETDEV_TYPE_ETHERNET,
};
use core::repr::{
    EthernetFrame,
    Ipv4Address,
};
use core::service::ArpService;

/// Default TAP interface name.
pub static DEFAULT_TAP_NAME: &'static str = "tap0";

lazy_static! {
    /// Default interface IPv4 address.
    pub static ref DEFAULT_IPV4_ADDR: Ipv4Address = {
        Ipv4Address::new([10, 0, 0, 102])
    };

    /// Default interface IPv4 netmask.
    pub static ref DEFAULT_IPV4_NETMASK: Ipv4Address = {
        Ipv4Address::new([255, 255, 255, 0])
    };
}

/// Driver parameters for Ethernet TAP devices.
pub fn ethernet_driver() -> DriverDef {
    DriverDef {
        device_type: NETDEV_TYPE_ETHERNET,
        mtu: 1500,
        flags: NETDEV_FLAG_BROADCAST,
        header_len: EthernetFrame::<&[u8]>::HEADER_LEN,
        addr_len: 6,
    }
}

/// A wired up demo environment.
pub struct Env {
    pub stack: Arc<Stack>,
    pub arp: Arc<ArpService>,
    pub dev: Arc<NetDevice>,
    pub netif: Arc<Netif>,
}

#[cfg(target_os = "linux")]
mod platform {
    use std::sync::Arc;

    use core::netdev::{
        Family,
        NetDevice,
        Stack,
        NETDEV_TYPE_ETHERNET,
    };
    use core::service::ArpService;
    use examples::env::{
        ethernet_driver,
        Env,
        DEFAULT_IPV4_ADDR,
        DEFAULT_IPV4_NETMASK,
        DEFAULT_TAP_NAME,
    };
    use linux::Tap;

    pub fn default_env() -> Env {
        let tap = Tap::new(DEFAULT_TAP_NAME);
        let hw_addr = tap.hw_addr();

        let mut stack = Stack::new();
        stack.register_driver(ethernet_driver()).unwrap();

        let arp = Arc::new(ArpService::new());
        ArpService::register(&arp, &mut stack).unwrap();

        let stack = Arc::new(stack);
        let dev = stack
            .new_device(NETDEV_TYPE_ETHERNET, DEFAULT_TAP_NAME, hw_addr, Box::new(tap))
            .unwrap();
        let netif = NetDevice::attach_netif(
            &dev,
            Family::Ipv4,
            *DEFAULT_IPV4_ADDR,
            *DEFAULT_IPV4_NETMASK,
        );

        println!(
            "Interface: (name = {}, MTU = {}, MAC = {}, IPv4 = {})",
            dev.name(),
            dev.mtu(),
            dev.addr(),
            netif.unicast(),
        );

        Env {
            stack,
            arp,
            dev,
            netif,
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use super::Env;

    pub fn default_env() -> Env {
        panic!("Sorry, demos are only supported on Linux.");
    }
}

pub use self::platform::default_env;
