//! Fixed capacity cache of IPv4 to Ethernet address bindings.
//!
//! The table backs the ARP resolver: a slot holds either a resolved binding
//! or a query-in-flight entry whose hardware address is still unspecified.
//! All slots and the sweep anchor sit behind one lock; every slot carries a
//! condition variable that is signaled whenever the slot resolves, is
//! cleared, or is evicted, so any number of threads can block on a single
//! outstanding query.

use std::sync::{
    Arc,
    Condvar,
    Mutex,
    MutexGuard,
};
use std::time::{
    Duration,
    Instant,
};

use {
    Error,
    Result,
};
use core::netdev::Netif;
use core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use core::time::{
    Env,
    SystemEnv,
};

/// Number of slots in the table. A full table refuses new entries; eviction
/// is time based only.
pub const ARP_TABLE_SIZE: usize = 4096;

/// How long a binding stays valid after its last write.
pub const ARP_ENTRY_TTL: Duration = Duration::from_secs(300);

/// Minimum time between expiry sweeps.
pub const ARP_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// An outbound payload buffered until its destination resolves, together
/// with the interface it was addressed for.
#[derive(Debug)]
pub struct Pending {
    pub payload: Vec<u8>,
    pub netif: Arc<Netif>,
}

struct Entry {
    used: bool,
    pa: Ipv4Address,
    ha: EthernetAddress,
    timestamp: Instant,
    pending: Option<Pending>,
}

impl Entry {
    fn free(now: Instant) -> Entry {
        Entry {
            used: false,
            pa: Ipv4Address::new([0; 4]),
            ha: EthernetAddress::UNSPECIFIED,
            timestamp: now,
            pending: None,
        }
    }
}

struct Table {
    entries: Vec<Entry>,
    last_sweep: Instant,
}

/// Handle to a live slot in the table.
///
/// Only meaningful under the guard it was obtained from, or across a
/// `wait` on the same guard provided `is_used` is re-checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot(usize);

/// Outcome of merging an observed sender binding.
#[derive(Debug)]
pub enum Update {
    /// An entry existed and was refreshed; any buffered payload is handed
    /// back for the caller to transmit.
    Merged { pending: Option<Pending> },
    /// No entry for the address; nothing changed.
    NotMerged,
}

/// Maintains a bounded set of expiring IPv4 to Ethernet address bindings.
pub struct ArpCache<T = SystemEnv>
where
    T: Env,
{
    state: Mutex<Table>,
    waiters: Vec<Condvar>,
    time_env: T,
}

impl<T: Env> ArpCache<T> {
    pub fn new(time_env: T) -> ArpCache<T> {
        let now = time_env.now_instant();
        ArpCache {
            state: Mutex::new(Table {
                entries: (0 .. ARP_TABLE_SIZE).map(|_| Entry::free(now)).collect(),
                last_sweep: now,
            }),
            waiters: (0 .. ARP_TABLE_SIZE).map(|_| Condvar::new()).collect(),
            time_env,
        }
    }

    /// Acquires exclusive access to the table.
    pub fn lock(&self) -> CacheGuard<T> {
        let table = match self.state.lock() {
            Ok(table) => table,
            Err(err) => err.into_inner(),
        };

        CacheGuard { cache: self, table }
    }
}

/// Exclusive access to the table for the duration of an operation sequence.
pub struct CacheGuard<'a, T: Env + 'a> {
    cache: &'a ArpCache<T>,
    table: MutexGuard<'a, Table>,
}

impl<'a, T: Env> CacheGuard<'a, T> {
    /// Returns the slot bound to a protocol address, if any.
    pub fn find(&self, pa: Ipv4Address) -> Option<Slot> {
        self.table
            .entries
            .iter()
            .position(|entry| entry.used && entry.pa == pa)
            .map(Slot)
    }

    /// Checks if the slot still holds a live entry.
    pub fn is_used(&self, slot: Slot) -> bool {
        self.table.entries[slot.0].used
    }

    /// Returns the hardware address of the slot; unspecified while a query
    /// is in flight.
    pub fn ha(&self, slot: Slot) -> EthernetAddress {
        self.table.entries[slot.0].ha
    }

    /// Inserts a resolved binding, merging into the existing entry if the
    /// address was bound while the caller did not hold the lock.
    pub fn insert(&mut self, pa: Ipv4Address, ha: EthernetAddress) -> Result<Slot> {
        if let Some(slot) = self.find(pa) {
            let now = self.cache.time_env.now_instant();
            {
                let entry = &mut self.table.entries[slot.0];
                entry.ha = ha;
                entry.timestamp = now;
            }
            self.cache.waiters[slot.0].notify_all();
            return Ok(slot);
        }

        let slot = self.free_slot().ok_or(Error::Exhausted)?;
        let now = self.cache.time_env.now_instant();
        {
            let entry = &mut self.table.entries[slot.0];
            entry.used = true;
            entry.pa = pa;
            entry.ha = ha;
            entry.timestamp = now;
            entry.pending = None;
        }
        self.cache.waiters[slot.0].notify_all();

        Ok(slot)
    }

    /// Creates a query-in-flight entry, buffering an outbound payload with
    /// it if one was provided.
    ///
    /// Callers look up `pa` under the same guard first; the new entry is
    /// the only one for the address.
    pub fn allocate(&mut self, pa: Ipv4Address, pending: Option<Pending>) -> Result<Slot> {
        debug_assert!(self.find(pa).is_none());

        let slot = self.free_slot().ok_or(Error::Exhausted)?;
        let now = self.cache.time_env.now_instant();
        let entry = &mut self.table.entries[slot.0];
        entry.used = true;
        entry.pa = pa;
        entry.ha = EthernetAddress::UNSPECIFIED;
        entry.timestamp = now;
        entry.pending = pending;

        Ok(slot)
    }

    /// Merges an observed sender binding into an existing entry.
    ///
    /// On a merge the entry is stamped, waiters are woken, and any buffered
    /// payload is handed back so the caller can transmit it to the newly
    /// learned address.
    pub fn update(&mut self, pa: Ipv4Address, ha: EthernetAddress) -> Update {
        let slot = match self.find(pa) {
            Some(slot) => slot,
            None => return Update::NotMerged,
        };

        let now = self.cache.time_env.now_instant();
        let pending = {
            let entry = &mut self.table.entries[slot.0];
            entry.ha = ha;
            entry.timestamp = now;
            entry.pending.take()
        };
        self.cache.waiters[slot.0].notify_all();

        Update::Merged { pending }
    }

    /// Releases a slot, dropping any buffered payload and waking waiters so
    /// they observe that the entry is gone.
    pub fn clear(&mut self, slot: Slot) {
        {
            let entry = &mut self.table.entries[slot.0];
            entry.used = false;
            entry.pa = Ipv4Address::new([0; 4]);
            entry.ha = EthernetAddress::UNSPECIFIED;
            entry.pending = None;
        }
        self.cache.waiters[slot.0].notify_all();
    }

    /// Evicts entries older than the TTL, at most once per sweep interval.
    pub fn sweep_if_due(&mut self) {
        let now = self.cache.time_env.now_instant();
        if now.duration_since(self.table.last_sweep) <= ARP_SWEEP_INTERVAL {
            return;
        }
        self.table.last_sweep = now;

        for i in 0 .. ARP_TABLE_SIZE {
            let expired = {
                let entry = &self.table.entries[i];
                entry.used && now.duration_since(entry.timestamp) > ARP_ENTRY_TTL
            };
            if expired {
                self.clear(Slot(i));
            }
        }
    }

    /// Blocks on the slot's channel until it is signaled or the timeout
    /// elapses, releasing the table lock for the duration of the wait.
    ///
    /// Wakeups may be spurious; callers re-check the slot state and their
    /// own deadline.
    pub fn wait(self, slot: Slot, timeout: Duration) -> (CacheGuard<'a, T>, bool) {
        let CacheGuard { cache, table } = self;

        let (table, wait_result) = match cache.waiters[slot.0].wait_timeout(table, timeout) {
            Ok(woken) => woken,
            Err(err) => err.into_inner(),
        };

        (CacheGuard { cache, table }, wait_result.timed_out())
    }

    fn free_slot(&self) -> Option<Slot> {
        self.table
            .entries
            .iter()
            .position(|entry| !entry.used)
            .map(Slot)
    }

    #[cfg(test)]
    fn used_count(&self) -> usize {
        self.table.entries.iter().filter(|entry| entry.used).count()
    }

    #[cfg(test)]
    fn last_sweep(&self) -> Instant {
        self.table.last_sweep
    }
}
