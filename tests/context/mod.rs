use std::io::{
    Error as IOError,
    ErrorKind,
};
use std::sync::mpsc::{
    channel,
    Receiver,
    RecvTimeoutError,
    Sender,
};
use std::sync::{
    Arc,
    Mutex,
};
use std::time::Duration;

use picostack::core::dev::Device;
use picostack::core::netdev::{
    spawn_rx,
    DriverDef,
    Family,
    NetDevice,
    Netif,
    Stack,
    NETDEV_FLAG_BROADCAST,
    NETDEV_TYPE_ETHERNET,
};
use picostack::core::repr::{
    eth_types,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
};
use picostack::core::service::ArpService;
use picostack::{
    Error,
    Result,
};

pub fn eth(i: u8) -> EthernetAddress {
    EthernetAddress::new([0x02, 0, 0, 0, 0, i])
}

pub fn ipv4(i: u8) -> Ipv4Address {
    Ipv4Address::new([10, 0, 0, i])
}

/// One end of an in-memory link. Frames sent on one end are received on
/// the other, standing in for a pair of TAP interfaces on a bridge.
pub struct Pipe {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

pub fn pipe_pair() -> (Pipe, Pipe) {
    let (a_tx, b_rx) = channel();
    let (b_tx, a_rx) = channel();

    (Pipe { tx: a_tx, rx: a_rx }, Pipe { tx: b_tx, rx: b_rx })
}

impl Device for Pipe {
    fn send(&mut self, buffer: &[u8]) -> Result<()> {
        self.tx
            .send(buffer.to_vec())
            .map_err(|_| Error::IO(IOError::new(ErrorKind::BrokenPipe, "peer gone")))
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.rx.recv_timeout(Duration::from_millis(10)) {
            Ok(frame) => {
                let frame_len = frame.len();
                buffer[.. frame_len].copy_from_slice(&frame);
                Ok(frame_len)
            }
            Err(RecvTimeoutError::Timeout) => Err(Error::Exhausted),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::IO(IOError::new(ErrorKind::BrokenPipe, "peer gone")))
            }
        }
    }

    fn max_transmission_unit(&self) -> usize {
        1500
    }
}

/// A host under test: a stack with an ARP service, one pipe backed device,
/// a live receive thread, and a recording IPv4 handler. The receive thread
/// keeps the stack and device alive.
pub struct Host {
    pub arp: Arc<ArpService>,
    pub netif: Arc<Netif>,
    pub ipv4_received: Arc<Mutex<Vec<Vec<u8>>>>,
}

pub fn host(name: &str, hw_addr: EthernetAddress, ipv4_addr: Ipv4Address, link: Pipe) -> Host {
    let mut stack = Stack::new();
    stack
        .register_driver(DriverDef {
            device_type: NETDEV_TYPE_ETHERNET,
            mtu: 1500,
            flags: NETDEV_FLAG_BROADCAST,
            header_len: EthernetFrame::<&[u8]>::HEADER_LEN,
            addr_len: 6,
        })
        .unwrap();

    let arp = Arc::new(ArpService::new());
    ArpService::register(&arp, &mut stack).unwrap();

    let ipv4_received = Arc::new(Mutex::new(Vec::new()));
    let received = ipv4_received.clone();
    stack
        .register_protocol(
            eth_types::IPV4,
            Box::new(move |payload, _| {
                received.lock().unwrap().push(payload.to_vec());
            }),
        )
        .unwrap();

    let stack = Arc::new(stack);
    let dev = stack
        .new_device(NETDEV_TYPE_ETHERNET, name, hw_addr, Box::new(link))
        .unwrap();
    let netif = NetDevice::attach_netif(
        &dev,
        Family::Ipv4,
        ipv4_addr,
        Ipv4Address::new([255, 255, 255, 0]),
    );
    spawn_rx(stack, dev);

    Host {
        arp,
        netif,
        ipv4_received,
    }
}

/// Builds two hosts wired back to back.
pub fn wired_hosts() -> (Host, Host) {
    let (link_a, link_b) = pipe_pair();

    let host_a = host("testA", eth(1), ipv4(1), link_a);
    let host_b = host("testB", eth(2), ipv4(2), link_b);

    (host_a, host_b)
}
