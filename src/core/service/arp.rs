//! ARP resolution and inbound ARP handling.

use std::sync::Arc;
use std::time::{
    Duration,
    Instant,
};

use {
    Error,
    Result,
};
use core::arp_cache::{
    ArpCache,
    Pending,
    Update,
};
use core::netdev::{
    Family,
    NetDevice,
    Netif,
    Stack,
};
use core::repr::{
    eth_types,
    Arp,
    ArpOp,
    EthernetAddress,
    Ipv4Address,
};
use core::time::{
    Env,
    SystemEnv,
};

/// How long a resolver blocks waiting for a reply to an in-flight query.
pub const ARP_RESOLVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of an address resolution attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The binding is resolved; use the returned hardware address.
    Found(EthernetAddress),
    /// A request was broadcast and any payload was buffered; it will be
    /// transmitted when the reply arrives, so the caller must drop the
    /// packet from its own transmit path.
    Query,
}

impl Resolution {
    /// Returns the integer code of the resolver contract: 1 when found, 0
    /// when a query went out. Callers map errors to -1.
    pub fn code(&self) -> i32 {
        match *self {
            Resolution::Found(_) => 1,
            Resolution::Query => 0,
        }
    }
}

/// IPv4 over Ethernet address resolution.
///
/// Owns the binding cache and implements both sides of the protocol: the
/// resolver that callers invoke before transmitting, and the receive
/// handler the dispatch registry feeds with inbound ARP payloads.
pub struct ArpService<T = SystemEnv>
where
    T: Env,
{
    cache: ArpCache<T>,
}

impl ArpService<SystemEnv> {
    pub fn new() -> ArpService<SystemEnv> {
        ArpService::with_env(SystemEnv::new())
    }
}

impl<T: Env> ArpService<T> {
    pub fn with_env(time_env: T) -> ArpService<T> {
        ArpService {
            cache: ArpCache::new(time_env),
        }
    }

    /// Registers the inbound ARP handler with a stack.
    pub fn register(service: &Arc<ArpService<T>>, stack: &mut Stack) -> Result<()>
    where
        T: 'static,
    {
        let arp = service.clone();
        stack.register_protocol(
            eth_types::ARP,
            Box::new(move |payload, dev| {
                if let Err(err) = arp.recv_packet(payload, dev) {
                    debug!("Dropping ARP packet with {:?}.", err);
                }
            }),
        )
    }

    /// Handles an inbound ARP payload received on a device.
    ///
    /// Every valid message refreshes an existing binding for its sender.
    /// Messages that target the receiving device's own unicast address
    /// additionally create the binding, and requests among them are
    /// answered with a unicast reply.
    pub fn recv_packet(&self, payload: &[u8], dev: &Arc<NetDevice>) -> Result<()> {
        let arp_repr = Arp::deserialize(payload)?;

        let (merged, pending) = {
            let mut cache = self.cache.lock();
            cache.sweep_if_due();
            match cache.update(arp_repr.source_proto_addr, arp_repr.source_hw_addr) {
                Update::Merged { pending } => (true, pending),
                Update::NotMerged => (false, None),
            }
        };

        if let Some(pending) = pending {
            transmit_pending(pending, arp_repr.source_hw_addr, dev);
        }

        let netif = match dev.netif(Family::Ipv4) {
            Some(netif) => netif,
            None => return Ok(()),
        };

        if netif.unicast() != arp_repr.target_proto_addr {
            debug!(
                "Ignoring ARP with target IPv4 address {}.",
                arp_repr.target_proto_addr
            );
            return Ok(());
        }

        if !merged {
            let mut cache = self.cache.lock();
            if let Err(err) = cache.insert(arp_repr.source_proto_addr, arp_repr.source_hw_addr) {
                debug!(
                    "Dropping ARP binding for {} with {:?}.",
                    arp_repr.source_proto_addr, err
                );
            }
        }

        if arp_repr.op == ArpOp::Request {
            debug!(
                "Sending ARP reply to {}/{}.",
                arp_repr.source_proto_addr, arp_repr.source_hw_addr
            );
            send_reply(
                &netif,
                arp_repr.source_hw_addr,
                arp_repr.source_proto_addr,
            )?;
        }

        Ok(())
    }

    /// Resolves the hardware address bound to a protocol address.
    ///
    /// A hit returns `Found` immediately. A miss creates a query-in-flight
    /// entry, buffers `payload` with it, broadcasts a request, and returns
    /// `Query`. When a query for the address is already in flight the
    /// request is retransmitted and the call blocks until the reply
    /// arrives or the wait deadline passes, whichever comes first.
    pub fn resolve(
        &self,
        netif: &Arc<Netif>,
        pa: Ipv4Address,
        payload: Option<&[u8]>,
    ) -> Result<Resolution> {
        let mut cache = self.cache.lock();
        let deadline = Instant::now() + ARP_RESOLVE_TIMEOUT;

        if let Some(slot) = cache.find(pa) {
            if !cache.ha(slot).is_unspecified() {
                return Ok(Resolution::Found(cache.ha(slot)));
            }

            // A query is already in flight. Retransmit in case the first
            // request was lost, then wait for the reply.
            send_request(netif, pa)?;

            loop {
                let now = Instant::now();
                if now >= deadline {
                    if cache.is_used(slot) {
                        cache.clear(slot);
                    }
                    return Err(Error::Timeout);
                }

                let (woken, timed_out) = cache.wait(slot, deadline - now);
                cache = woken;

                if !cache.is_used(slot) || timed_out {
                    if cache.is_used(slot) {
                        cache.clear(slot);
                    }
                    return Err(Error::Timeout);
                }
                if !cache.ha(slot).is_unspecified() {
                    return Ok(Resolution::Found(cache.ha(slot)));
                }
                // Spurious wakeup; keep waiting out the deadline.
            }
        }

        let pending = payload.map(|data| Pending {
            payload: data.to_vec(),
            netif: netif.clone(),
        });
        cache.allocate(pa, pending)?;

        // Request loss is covered by the retransmit on the wait path, so
        // the transmit's result does not change the outcome.
        if let Err(err) = send_request(netif, pa) {
            debug!("Dropping ARP request for {} with {:?}.", pa, err);
        }

        Ok(Resolution::Query)
    }
}

/// Transmits a payload whose destination just resolved.
///
/// The payload goes out on the interface it was buffered for even when the
/// reply arrived on a different device, since it was addressed for that
/// interface's egress path.
fn transmit_pending(pending: Pending, ha: EthernetAddress, rx_dev: &Arc<NetDevice>) {
    let dev = match pending.netif.device() {
        Ok(dev) => dev,
        Err(err) => {
            debug!("Dropping pending payload with {:?}.", err);
            return;
        }
    };

    if !Arc::ptr_eq(&dev, rx_dev) {
        warn!(
            "Reply for pending payload received on {}, transmitting via {}.",
            rx_dev.name(),
            dev.name()
        );
    }

    if let Err(err) = dev.transmit(eth_types::IPV4, &pending.payload, ha) {
        debug!("Dropping pending payload with {:?}.", err);
    }
}

/// Broadcasts an ARP request for a protocol address via an interface.
fn send_request(netif: &Arc<Netif>, target_proto_addr: Ipv4Address) -> Result<()> {
    let dev = netif.device()?;
    let arp_repr = Arp {
        op: ArpOp::Request,
        source_hw_addr: dev.addr(),
        source_proto_addr: netif.unicast(),
        target_hw_addr: EthernetAddress::UNSPECIFIED,
        target_proto_addr,
    };

    debug!("Sending ARP request for {}.", target_proto_addr);
    send_packet(&dev, &arp_repr, EthernetAddress::BROADCAST)
}

/// Sends an ARP reply to a station via an interface.
fn send_reply(
    netif: &Arc<Netif>,
    target_hw_addr: EthernetAddress,
    target_proto_addr: Ipv4Address,
) -> Result<()> {
    let dev = netif.device()?;
    let arp_repr = Arp {
        op: ArpOp::Reply,
        source_hw_addr: dev.addr(),
        source_proto_addr: netif.unicast(),
        target_hw_addr,
        target_proto_addr,
    };

    send_packet(&dev, &arp_repr, target_hw_addr)
}

fn send_packet(dev: &Arc<NetDevice>, arp_repr: &Arp, dst_addr: EthernetAddress) -> Result<()> {
    let mut buffer = vec![0; arp_repr.buffer_len()];
    arp_repr.serialize(&mut buffer)?;
    dev.transmit(eth_types::ARP, &buffer, dst_addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{
        Error as IOError,
        ErrorKind,
    };
    use std::sync::Mutex;
    use std::thread;

    use core::arp_cache::ARP_TABLE_SIZE;
    use core::dev::Device;
    use core::netdev::{
        DriverDef,
        NETDEV_FLAG_BROADCAST,
        NETDEV_TYPE_ETHERNET,
    };
    use core::repr::EthernetFrame;
    use core::time::MockEnv;

    struct TestDevice {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Device for TestDevice {
        fn send(&mut self, buffer: &[u8]) -> Result<()> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(buffer.to_vec());
            Ok(())
        }

        fn recv(&mut self, _: &mut [u8]) -> Result<usize> {
            Err(Error::Exhausted)
        }

        fn max_transmission_unit(&self) -> usize {
            1500
        }
    }

    struct BrokenDevice;

    impl Device for BrokenDevice {
        fn send(&mut self, _: &[u8]) -> Result<()> {
            Err(Error::IO(IOError::new(ErrorKind::Other, "link down")))
        }

        fn recv(&mut self, _: &mut [u8]) -> Result<usize> {
            Err(Error::Exhausted)
        }

        fn max_transmission_unit(&self) -> usize {
            1500
        }
    }

    struct Fixture {
        service: Arc<ArpService<MockEnv>>,
        time_env: MockEnv,
        dev: Arc<NetDevice>,
        netif: Arc<Netif>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    fn ethernet_def() -> DriverDef {
        DriverDef {
            device_type: NETDEV_TYPE_ETHERNET,
            mtu: 1500,
            flags: NETDEV_FLAG_BROADCAST,
            header_len: EthernetFrame::<&[u8]>::HEADER_LEN,
            addr_len: 6,
        }
    }

    fn ipv4(i: u8) -> Ipv4Address {
        Ipv4Address::new([10, 0, 0, i])
    }

    fn eth(i: u8) -> EthernetAddress {
        EthernetAddress::new([0x02, 0, 0, 0, 0, i])
    }

    fn fixture() -> Fixture {
        let mut stack = Stack::new();
        stack.register_driver(ethernet_def()).unwrap();

        let time_env = MockEnv::new();
        let service = Arc::new(ArpService::with_env(time_env.clone()));
        ArpService::register(&service, &mut stack).unwrap();

        let sent = Arc::new(Mutex::new(Vec::new()));
        let dev = stack
            .new_device(
                NETDEV_TYPE_ETHERNET,
                "test0",
                eth(1),
                Box::new(TestDevice { sent: sent.clone() }),
            )
            .unwrap();
        let netif = NetDevice::attach_netif(
            &dev,
            Family::Ipv4,
            ipv4(1),
            Ipv4Address::new([255, 255, 255, 0]),
        );

        Fixture {
            service,
            time_env,
            dev,
            netif,
            sent,
        }
    }

    fn broken_fixture() -> (Arc<ArpService<MockEnv>>, Arc<NetDevice>, Arc<Netif>) {
        let mut stack = Stack::new();
        stack.register_driver(ethernet_def()).unwrap();

        let service = Arc::new(ArpService::with_env(MockEnv::new()));
        let dev = stack
            .new_device(NETDEV_TYPE_ETHERNET, "test0", eth(1), Box::new(BrokenDevice))
            .unwrap();
        let netif = NetDevice::attach_netif(
            &dev,
            Family::Ipv4,
            ipv4(1),
            Ipv4Address::new([255, 255, 255, 0]),
        );

        (service, dev, netif)
    }

    fn arp_payload(arp_repr: &Arp) -> Vec<u8> {
        let mut buffer = vec![0; arp_repr.buffer_len()];
        arp_repr.serialize(&mut buffer).unwrap();
        buffer
    }

    fn sent_frames(sent: &Arc<Mutex<Vec<Vec<u8>>>>) -> Vec<Vec<u8>> {
        sent.lock().unwrap().clone()
    }

    #[test]
    fn test_cold_resolve_then_reply_drains_payload() {
        let fixture = fixture();

        let resolution = fixture
            .service
            .resolve(&fixture.netif, ipv4(2), Some(&[0xDE, 0xAD]))
            .unwrap();
        assert_eq!(resolution, Resolution::Query);

        // A broadcast request went out.
        let frames = sent_frames(&fixture.sent);
        assert_eq!(frames.len(), 1);
        let eth_frame = EthernetFrame::try_new(&frames[0][..]).unwrap();
        assert_eq!(eth_frame.dst_addr(), EthernetAddress::BROADCAST);
        assert_eq!(eth_frame.payload_type(), eth_types::ARP);
        let request = Arp::deserialize(eth_frame.payload()).unwrap();
        assert_eq!(request.op, ArpOp::Request);
        assert_eq!(request.source_hw_addr, eth(1));
        assert_eq!(request.source_proto_addr, ipv4(1));
        assert_eq!(request.target_proto_addr, ipv4(2));

        // The reply resolves the entry and flushes the buffered payload.
        let reply = Arp {
            op: ArpOp::Reply,
            source_hw_addr: eth(2),
            source_proto_addr: ipv4(2),
            target_hw_addr: eth(1),
            target_proto_addr: ipv4(1),
        };
        fixture
            .service
            .recv_packet(&arp_payload(&reply), &fixture.dev)
            .unwrap();

        let frames = sent_frames(&fixture.sent);
        assert_eq!(frames.len(), 2);
        let eth_frame = EthernetFrame::try_new(&frames[1][..]).unwrap();
        assert_eq!(eth_frame.dst_addr(), eth(2));
        assert_eq!(eth_frame.payload_type(), eth_types::IPV4);
        assert_eq!(eth_frame.payload(), &[0xDE, 0xAD]);

        // A second reply finds no payload left to transmit.
        fixture
            .service
            .recv_packet(&arp_payload(&reply), &fixture.dev)
            .unwrap();
        assert_eq!(sent_frames(&fixture.sent).len(), 2);
    }

    #[test]
    fn test_hot_hit_transmits_nothing() {
        let fixture = fixture();

        fixture
            .service
            .resolve(&fixture.netif, ipv4(2), None)
            .unwrap();
        let reply = Arp {
            op: ArpOp::Reply,
            source_hw_addr: eth(2),
            source_proto_addr: ipv4(2),
            target_hw_addr: eth(1),
            target_proto_addr: ipv4(1),
        };
        fixture
            .service
            .recv_packet(&arp_payload(&reply), &fixture.dev)
            .unwrap();

        let frames_before = sent_frames(&fixture.sent).len();
        let resolution = fixture
            .service
            .resolve(&fixture.netif, ipv4(2), None)
            .unwrap();
        assert_eq!(resolution, Resolution::Found(eth(2)));
        assert_eq!(sent_frames(&fixture.sent).len(), frames_before);
    }

    #[test]
    fn test_second_resolver_times_out_and_clears() {
        let fixture = fixture();

        let resolution = fixture
            .service
            .resolve(&fixture.netif, ipv4(99), None)
            .unwrap();
        assert_eq!(resolution, Resolution::Query);

        let service = fixture.service.clone();
        let netif = fixture.netif.clone();
        let waiter = thread::spawn(move || service.resolve(&netif, ipv4(99), None));

        // The waiter retransmits the request and hits the deadline.
        assert_matches!(waiter.join().unwrap(), Err(Error::Timeout));
        assert_eq!(sent_frames(&fixture.sent).len(), 2);

        // The entry was cleared, so resolving again issues a fresh query.
        let resolution = fixture
            .service
            .resolve(&fixture.netif, ipv4(99), None)
            .unwrap();
        assert_eq!(resolution, Resolution::Query);
    }

    #[test]
    fn test_inbound_request_for_us_is_answered() {
        let fixture = fixture();

        let request = Arp {
            op: ArpOp::Request,
            source_hw_addr: eth(7),
            source_proto_addr: ipv4(7),
            target_hw_addr: EthernetAddress::UNSPECIFIED,
            target_proto_addr: ipv4(1),
        };
        fixture
            .service
            .recv_packet(&arp_payload(&request), &fixture.dev)
            .unwrap();

        let frames = sent_frames(&fixture.sent);
        assert_eq!(frames.len(), 1);
        let eth_frame = EthernetFrame::try_new(&frames[0][..]).unwrap();
        assert_eq!(eth_frame.dst_addr(), eth(7));
        assert_eq!(eth_frame.payload_type(), eth_types::ARP);
        let reply = Arp::deserialize(eth_frame.payload()).unwrap();
        assert_eq!(reply.op, ArpOp::Reply);
        assert_eq!(reply.source_hw_addr, eth(1));
        assert_eq!(reply.source_proto_addr, ipv4(1));
        assert_eq!(reply.target_hw_addr, eth(7));
        assert_eq!(reply.target_proto_addr, ipv4(7));

        // The sender's binding was learned on the way.
        let resolution = fixture
            .service
            .resolve(&fixture.netif, ipv4(7), None)
            .unwrap();
        assert_eq!(resolution, Resolution::Found(eth(7)));
    }

    #[test]
    fn test_inbound_reply_not_for_us_is_not_inserted() {
        let fixture = fixture();

        let reply = Arp {
            op: ArpOp::Reply,
            source_hw_addr: eth(8),
            source_proto_addr: ipv4(8),
            target_hw_addr: eth(42),
            target_proto_addr: ipv4(42),
        };
        fixture
            .service
            .recv_packet(&arp_payload(&reply), &fixture.dev)
            .unwrap();
        assert_eq!(sent_frames(&fixture.sent).len(), 0);

        // No binding was created, so a resolve issues a query.
        let resolution = fixture
            .service
            .resolve(&fixture.netif, ipv4(8), None)
            .unwrap();
        assert_eq!(resolution, Resolution::Query);
    }

    #[test]
    fn test_inbound_reply_not_for_us_refreshes_existing() {
        let fixture = fixture();

        let request = Arp {
            op: ArpOp::Request,
            source_hw_addr: eth(8),
            source_proto_addr: ipv4(8),
            target_hw_addr: EthernetAddress::UNSPECIFIED,
            target_proto_addr: ipv4(1),
        };
        fixture
            .service
            .recv_packet(&arp_payload(&request), &fixture.dev)
            .unwrap();

        let refreshed = Arp {
            op: ArpOp::Reply,
            source_hw_addr: eth(9),
            source_proto_addr: ipv4(8),
            target_hw_addr: eth(42),
            target_proto_addr: ipv4(42),
        };
        fixture
            .service
            .recv_packet(&arp_payload(&refreshed), &fixture.dev)
            .unwrap();

        let resolution = fixture
            .service
            .resolve(&fixture.netif, ipv4(8), None)
            .unwrap();
        assert_eq!(resolution, Resolution::Found(eth(9)));
    }

    #[test]
    fn test_receive_sweeps_stale_entries() {
        let fixture = fixture();

        let request = Arp {
            op: ArpOp::Request,
            source_hw_addr: eth(7),
            source_proto_addr: ipv4(7),
            target_hw_addr: EthernetAddress::UNSPECIFIED,
            target_proto_addr: ipv4(1),
        };
        fixture
            .service
            .recv_packet(&arp_payload(&request), &fixture.dev)
            .unwrap();

        fixture
            .time_env
            .advance(Duration::from_secs(301));

        // Any valid inbound message triggers the sweep.
        let unrelated = Arp {
            op: ArpOp::Reply,
            source_hw_addr: eth(9),
            source_proto_addr: ipv4(9),
            target_hw_addr: eth(42),
            target_proto_addr: ipv4(42),
        };
        fixture
            .service
            .recv_packet(&arp_payload(&unrelated), &fixture.dev)
            .unwrap();

        let resolution = fixture
            .service
            .resolve(&fixture.netif, ipv4(7), None)
            .unwrap();
        assert_eq!(resolution, Resolution::Query);
    }

    #[test]
    fn test_malformed_payload_changes_nothing() {
        let fixture = fixture();

        let request = Arp {
            op: ArpOp::Request,
            source_hw_addr: eth(7),
            source_proto_addr: ipv4(7),
            target_hw_addr: EthernetAddress::UNSPECIFIED,
            target_proto_addr: ipv4(1),
        };
        let payload = arp_payload(&request);

        assert_matches!(
            fixture.service.recv_packet(&payload[.. 27], &fixture.dev),
            Err(Error::Malformed)
        );
        assert_eq!(sent_frames(&fixture.sent).len(), 0);
    }

    #[test]
    fn test_resolve_with_full_table() {
        let fixture = fixture();

        {
            let mut cache = fixture.service.cache.lock();
            for i in 0 .. ARP_TABLE_SIZE {
                let pa = Ipv4Address::new([10, 1, (i >> 8) as u8, i as u8]);
                cache.insert(pa, eth(1)).unwrap();
            }
        }

        assert_matches!(
            fixture.service.resolve(&fixture.netif, ipv4(2), None),
            Err(Error::Exhausted)
        );
    }

    #[test]
    fn test_miss_ignores_transmit_failure() {
        let (service, dev, netif) = broken_fixture();

        // The request never leaves the device, but the query-in-flight
        // entry is created and the caller still gets a query.
        let resolution = service
            .resolve(&netif, ipv4(2), Some(&[0xDE, 0xAD]))
            .unwrap();
        assert_eq!(resolution, Resolution::Query);

        {
            let cache = service.cache.lock();
            let slot = cache.find(ipv4(2)).unwrap();
            assert!(cache.ha(slot).is_unspecified());
        }

        // The entry is live, so a reply still resolves it.
        let reply = Arp {
            op: ArpOp::Reply,
            source_hw_addr: eth(2),
            source_proto_addr: ipv4(2),
            target_hw_addr: eth(1),
            target_proto_addr: ipv4(1),
        };
        service.recv_packet(&arp_payload(&reply), &dev).unwrap();

        let resolution = service.resolve(&netif, ipv4(2), None).unwrap();
        assert_eq!(resolution, Resolution::Found(eth(2)));
    }

    #[test]
    fn test_wait_path_surfaces_transmit_failure() {
        let (service, _dev, netif) = broken_fixture();

        let resolution = service.resolve(&netif, ipv4(2), None).unwrap();
        assert_eq!(resolution, Resolution::Query);

        // The retransmit fails, so the error reaches the caller before
        // the wait even starts.
        assert_matches!(
            service.resolve(&netif, ipv4(2), None),
            Err(Error::IO(_))
        );

        // The cache was not touched: the entry is still in flight.
        let cache = service.cache.lock();
        let slot = cache.find(ipv4(2)).unwrap();
        assert!(cache.is_used(slot));
        assert!(cache.ha(slot).is_unspecified());
    }

    #[test]
    fn test_full_table_still_answers_requests() {
        let fixture = fixture();

        {
            let mut cache = fixture.service.cache.lock();
            for i in 0 .. ARP_TABLE_SIZE {
                let pa = Ipv4Address::new([10, 1, (i >> 8) as u8, i as u8]);
                cache.insert(pa, eth(1)).unwrap();
            }
        }

        let request = Arp {
            op: ArpOp::Request,
            source_hw_addr: eth(7),
            source_proto_addr: ipv4(7),
            target_hw_addr: EthernetAddress::UNSPECIFIED,
            target_proto_addr: ipv4(1),
        };
        fixture
            .service
            .recv_packet(&arp_payload(&request), &fixture.dev)
            .unwrap();

        // The insert is dropped silently but the reply still goes out.
        let frames = sent_frames(&fixture.sent);
        assert_eq!(frames.len(), 1);
        let eth_frame = EthernetFrame::try_new(&frames[0][..]).unwrap();
        let reply = Arp::deserialize(eth_frame.payload()).unwrap();
        assert_eq!(reply.op, ArpOp::Reply);
    }

    #[test]
    fn test_pending_payload_keeps_its_device() {
        let mut stack = Stack::new();
        stack.register_driver(ethernet_def()).unwrap();

        let service: Arc<ArpService<MockEnv>> = Arc::new(ArpService::with_env(MockEnv::new()));

        let sent_a = Arc::new(Mutex::new(Vec::new()));
        let dev_a = stack
            .new_device(
                NETDEV_TYPE_ETHERNET,
                "test0",
                eth(1),
                Box::new(TestDevice {
                    sent: sent_a.clone(),
                }),
            )
            .unwrap();
        let netif_a = NetDevice::attach_netif(
            &dev_a,
            Family::Ipv4,
            ipv4(1),
            Ipv4Address::new([255, 255, 255, 0]),
        );

        let sent_b = Arc::new(Mutex::new(Vec::new()));
        let dev_b = stack
            .new_device(
                NETDEV_TYPE_ETHERNET,
                "test1",
                eth(11),
                Box::new(TestDevice {
                    sent: sent_b.clone(),
                }),
            )
            .unwrap();

        service
            .resolve(&netif_a, ipv4(2), Some(&[0xBE, 0xEF]))
            .unwrap();

        // The reply arrives on the other device; the payload still leaves
        // through the interface it was buffered for.
        let reply = Arp {
            op: ArpOp::Reply,
            source_hw_addr: eth(2),
            source_proto_addr: ipv4(2),
            target_hw_addr: eth(1),
            target_proto_addr: ipv4(1),
        };
        let mut buffer = vec![0; reply.buffer_len()];
        reply.serialize(&mut buffer).unwrap();
        service.recv_packet(&buffer, &dev_b).unwrap();

        let frames = sent_a.lock().unwrap().clone();
        assert_eq!(frames.len(), 2);
        let eth_frame = EthernetFrame::try_new(&frames[1][..]).unwrap();
        assert_eq!(eth_frame.payload_type(), eth_types::IPV4);
        assert_eq!(eth_frame.payload(), &[0xBE, 0xEF]);
        assert_eq!(sent_b.lock().unwrap().len(), 0);
    }

    #[test]
    fn test_resolution_codes() {
        assert_eq!(Resolution::Found(eth(2)).code(), 1);
        assert_eq!(Resolution::Query.code(), 0);

        let fixture = fixture();
        let code = fixture
            .service
            .resolve(&fixture.netif, ipv4(2), None)
            .map_or(-1, |resolution| resolution.code());
        assert_eq!(code, 0);
    }
}
