use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::transaction::Transaction;
use super::{Timestamp, TxnId, TS_NONE};
use crate::core::lock_stats::{LockHoldGuard, LockStatKind, LockStats};

pub type TxnHandle = Arc<Mutex<Transaction>>;

/// Owns the logical clock and the set of active transactions.
///
/// Ids are drawn and registered under the `active` lock, so a watermark read
/// under the same lock never misses a transaction that already holds an id.
#[derive(Debug)]
pub struct TxnRegistry {
    /// Last value handed out by the clock.
    clock: AtomicU64,
    /// Active transactions keyed by id; the first entry is the oldest.
    active: Mutex<BTreeMap<TxnId, TxnHandle>>,
    lock_stats: Arc<LockStats>,
}

impl TxnRegistry {
    pub fn new(lock_stats: Arc<LockStats>) -> Self {
        Self {
            clock: AtomicU64::new(TS_NONE),
            active: Mutex::new(BTreeMap::new()),
            lock_stats,
        }
    }

    fn lock_active(&self) -> (MutexGuard<'_, BTreeMap<TxnId, TxnHandle>>, LockHoldGuard<'_>) {
        self.lock_stats
            .timed(LockStatKind::Registry, || self.active.lock())
    }

    fn tick(&self) -> Timestamp {
        let previous = self.clock.fetch_add(1, Ordering::AcqRel);
        assert!(previous != u64::MAX, "logical clock overflowed");
        previous + 1
    }

    /// The last value drawn from the clock, or `TS_NONE` before the first draw.
    pub fn current_ts(&self) -> Timestamp {
        self.clock.load(Ordering::Acquire)
    }

    /// Draw a fresh id and register it as active.
    pub fn begin(&self) -> TxnId {
        let (mut active, _hold) = self.lock_active();
        let txn_id = self.tick();
        active.insert(txn_id, Arc::new(Mutex::new(Transaction::new(txn_id))));
        txn_id
    }

    /// Draw a commit timestamp. Newer than every id or commit timestamp
    /// handed out so far.
    pub fn allocate_commit_ts(&self) -> Timestamp {
        self.tick()
    }

    pub fn lookup(&self, txn_id: TxnId) -> Option<TxnHandle> {
        let (active, _hold) = self.lock_active();
        active.get(&txn_id).cloned()
    }

    pub fn is_active(&self, txn_id: TxnId) -> bool {
        let (active, _hold) = self.lock_active();
        active.contains_key(&txn_id)
    }

    /// Remove a terminated transaction. Returns false if it was not active.
    pub fn unregister(&self, txn_id: TxnId) -> bool {
        let (mut active, _hold) = self.lock_active();
        active.remove(&txn_id).is_some()
    }

    pub fn active_count(&self) -> usize {
        let (active, _hold) = self.lock_active();
        active.len()
    }

    /// Oldest active start timestamp. With nothing active this is the current
    /// clock value: every future transaction starts after it.
    pub fn low_watermark(&self) -> Timestamp {
        let (active, _hold) = self.lock_active();
        match active.keys().next() {
            Some(oldest) => *oldest,
            None => self.current_ts(),
        }
    }
}
