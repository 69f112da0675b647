//! Device and protocol dispatch.
//!
//! The `netdev` module routes inbound frames from device drivers to the
//! protocol handlers registered for their EtherType, and gives protocol
//! modules a transmit path onto a device. Both registries are populated
//! while the stack is still exclusively owned; sharing the stack freezes
//! them, so the receive path reads them without a lock.

use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    RwLock,
    Weak,
};
use std::thread;
use std::time::Duration;

use {
    Error,
    Result,
};
use core::dev::Device;
use core::repr::{
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
};

/// Device type code registered by Ethernet drivers.
pub const NETDEV_TYPE_ETHERNET: u16 = 0x0001;

/// The device supports link level broadcast.
pub const NETDEV_FLAG_BROADCAST: u16 = 0x0001;

/// Address family of a protocol interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Ipv4,
}

/// Static parameters a driver registers for a device type.
///
/// `new_device` clones these into every device record of the type.
#[derive(Clone, Copy, Debug)]
pub struct DriverDef {
    pub device_type: u16,
    pub mtu: usize,
    pub flags: u16,
    pub header_len: usize,
    pub addr_len: usize,
}

/// Handler invoked with the payload and receiving device of every inbound
/// frame carrying a registered EtherType.
pub type ProtocolHandler = Box<Fn(&[u8], &Arc<NetDevice>) + Send + Sync>;

/// A logical attachment of a protocol address to a device.
#[derive(Debug)]
pub struct Netif {
    family: Family,
    unicast: Ipv4Address,
    netmask: Ipv4Address,
    dev: Weak<NetDevice>,
}

impl Netif {
    pub fn family(&self) -> Family {
        self.family
    }

    /// Returns the unicast protocol address of the interface.
    pub fn unicast(&self) -> Ipv4Address {
        self.unicast
    }

    pub fn netmask(&self) -> Ipv4Address {
        self.netmask
    }

    /// Returns the device the interface is attached to.
    pub fn device(&self) -> Result<Arc<NetDevice>> {
        self.dev.upgrade().ok_or(Error::NoOp)
    }
}

/// A device record, cloned from its driver definition at allocation.
pub struct NetDevice {
    name: String,
    device_type: u16,
    mtu: usize,
    flags: u16,
    header_len: usize,
    addr_len: usize,
    addr: EthernetAddress,
    backend: Mutex<Box<Device + Send>>,
    netifs: RwLock<Vec<Arc<Netif>>>,
}

impl ::std::fmt::Debug for NetDevice {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("NetDevice")
            .field("name", &self.name)
            .field("device_type", &self.device_type)
            .field("mtu", &self.mtu)
            .field("flags", &self.flags)
            .field("header_len", &self.header_len)
            .field("addr_len", &self.addr_len)
            .field("addr", &self.addr)
            .finish()
    }
}

impl NetDevice {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> u16 {
        self.device_type
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn addr_len(&self) -> usize {
        self.addr_len
    }

    /// Returns the link address of the device.
    pub fn addr(&self) -> EthernetAddress {
        self.addr
    }

    /// Attaches a protocol interface to a device.
    pub fn attach_netif(
        dev: &Arc<NetDevice>,
        family: Family,
        unicast: Ipv4Address,
        netmask: Ipv4Address,
    ) -> Arc<Netif> {
        let netif = Arc::new(Netif {
            family,
            unicast,
            netmask,
            dev: Arc::downgrade(dev),
        });

        let mut netifs = match dev.netifs.write() {
            Ok(netifs) => netifs,
            Err(err) => err.into_inner(),
        };
        netifs.push(netif.clone());

        netif
    }

    /// Returns the first interface attached for the address family, if any.
    pub fn netif(&self, family: Family) -> Option<Arc<Netif>> {
        let netifs = match self.netifs.read() {
            Ok(netifs) => netifs,
            Err(err) => err.into_inner(),
        };
        netifs
            .iter()
            .find(|netif| netif.family == family)
            .map(|netif| netif.clone())
    }

    /// Encapsulates a payload into an Ethernet frame and sends it through
    /// the backing driver.
    pub fn transmit(
        &self,
        payload_type: u16,
        payload: &[u8],
        dst_addr: EthernetAddress,
    ) -> Result<()> {
        let mut eth_buffer = vec![0; EthernetFrame::<&[u8]>::buffer_len(payload.len())];

        {
            let mut eth_frame = EthernetFrame::try_new(&mut eth_buffer[..])?;
            eth_frame.set_dst_addr(dst_addr);
            eth_frame.set_src_addr(self.addr);
            eth_frame.set_payload_type(payload_type);
            eth_frame.payload_mut().copy_from_slice(payload);
        }

        self.backend().send(&eth_buffer)
    }

    fn backend(&self) -> MutexGuard<Box<Device + Send>> {
        match self.backend.lock() {
            Ok(backend) => backend,
            Err(err) => err.into_inner(),
        }
    }
}

/// Registries of device drivers and protocol handlers.
pub struct Stack {
    drivers: HashMap<u16, DriverDef>,
    protocols: HashMap<u16, ProtocolHandler>,
}

impl Stack {
    pub fn new() -> Stack {
        Stack {
            drivers: HashMap::new(),
            protocols: HashMap::new(),
        }
    }

    /// Registers a driver definition for a device type code.
    pub fn register_driver(&mut self, def: DriverDef) -> Result<()> {
        if self.drivers.contains_key(&def.device_type) {
            return Err(Error::InUse);
        }

        self.drivers.insert(def.device_type, def);
        Ok(())
    }

    /// Registers an inbound handler for an EtherType.
    pub fn register_protocol(&mut self, payload_type: u16, handler: ProtocolHandler) -> Result<()> {
        if self.protocols.contains_key(&payload_type) {
            return Err(Error::InUse);
        }

        self.protocols.insert(payload_type, handler);
        Ok(())
    }

    /// Allocates a device of a registered type, cloning the driver
    /// definition's parameters into the record.
    pub fn new_device(
        &self,
        device_type: u16,
        name: &str,
        addr: EthernetAddress,
        backend: Box<Device + Send>,
    ) -> Result<Arc<NetDevice>> {
        let def = self.drivers.get(&device_type).ok_or(Error::NoOp)?;

        Ok(Arc::new(NetDevice {
            name: name.to_string(),
            device_type: def.device_type,
            mtu: def.mtu,
            flags: def.flags,
            header_len: def.header_len,
            addr_len: def.addr_len,
            addr,
            backend: Mutex::new(backend),
            netifs: RwLock::new(Vec::new()),
        }))
    }

    /// Routes an inbound frame to the protocol registered for its EtherType.
    ///
    /// Frames addressed to neither the device nor the broadcast address are
    /// dropped.
    pub fn dispatch(&self, dev: &Arc<NetDevice>, frame: &[u8]) -> Result<()> {
        let eth_frame = EthernetFrame::try_new(frame)?;

        if eth_frame.dst_addr() != dev.addr() && !eth_frame.dst_addr().is_broadcast() {
            debug!(
                "Ignoring ethernet frame with destination {}.",
                eth_frame.dst_addr()
            );
            return Err(Error::Ignored);
        }

        match self.protocols.get(&eth_frame.payload_type()) {
            Some(handler) => {
                handler(eth_frame.payload(), dev);
                Ok(())
            }
            None => {
                debug!(
                    "Ignoring ethernet frame with type {}.",
                    eth_frame.payload_type()
                );
                Err(Error::Ignored)
            }
        }
    }
}

/// Spawns the receive thread for a device.
///
/// The thread reads frames from the backing driver and feeds them through
/// the stack's dispatch until the driver reports a fatal error.
pub fn spawn_rx(stack: Arc<Stack>, dev: Arc<NetDevice>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buffer = vec![0; dev.header_len() + dev.mtu()];

        loop {
            let recv = dev.backend().recv(&mut buffer);
            match recv {
                Ok(frame_len) => {
                    if let Err(err) = stack.dispatch(&dev, &buffer[.. frame_len]) {
                        debug!("Dropping frame on {} with {:?}.", dev.name(), err);
                    }
                }
                Err(Error::Exhausted) => {
                    thread::sleep(Duration::from_millis(1));
                }
                Err(err) => {
                    debug!("Stopping receive on {} with {:?}.", dev.name(), err);
                    return;
                }
            }
        }
    })
}
