use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::core::errors::SnapKvError;
use crate::core::lock_stats::{LockStats, LockStatsSnapshot};
use crate::storage::{has_conflict, run_vacuum, ChainTable, VacuumReport, VacuumWorker, Version};
use crate::txn::{Timestamp, TxnHandle, TxnId, TxnRegistry};

const DEFAULT_SHARD_COUNT: usize = 16;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of independently locked shards in the key table (default: 16).
    pub shard_count: usize,
    /// Enable collection of lock wait/hold counters.
    pub lock_stats_enabled: bool,
    /// Run vacuum on a background thread at this interval.
    /// - None = vacuum only runs when called (or via the commit threshold)
    pub vacuum_interval: Option<Duration>,
    /// Run vacuum inline after this many successful commits.
    pub auto_vacuum_commit_threshold: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            lock_stats_enabled: false,
            vacuum_interval: None,
            auto_vacuum_commit_threshold: None,
        }
    }
}

impl StoreConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count.max(1);
        self
    }

    pub fn lock_stats_enabled(mut self, enabled: bool) -> Self {
        self.lock_stats_enabled = enabled;
        self
    }

    pub fn vacuum_interval(mut self, interval: Duration) -> Self {
        self.vacuum_interval = Some(interval);
        self
    }

    /// Zero disables the threshold.
    pub fn auto_vacuum_commit_threshold(mut self, commits: u64) -> Self {
        self.auto_vacuum_commit_threshold = (commits > 0).then_some(commits);
        self
    }
}

/// Point-in-time store statistics.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub active_transactions: usize,
    pub chain_count: usize,
    pub version_count: usize,
    pub current_ts: Timestamp,
    pub low_watermark: Timestamp,
}

/// State shared between store handles and the background vacuum worker.
struct StoreShared {
    registry: TxnRegistry,
    chains: ChainTable,
    lock_stats: Arc<LockStats>,
    auto_vacuum_commit_threshold: Option<u64>,
    commits_since_vacuum: AtomicU64,
}

impl StoreShared {
    fn vacuum(&self) -> VacuumReport {
        self.commits_since_vacuum.store(0, Ordering::Relaxed);
        let report = run_vacuum(&self.registry, &self.chains);
        if report.versions_removed > 0 || report.chains_removed > 0 {
            tracing::info!(
                watermark = report.watermark,
                versions_removed = report.versions_removed,
                chains_pruned = report.chains_pruned,
                chains_removed = report.chains_removed,
                "vacuum reclaimed versions"
            );
        }
        report
    }

    fn note_commit(&self) {
        let Some(threshold) = self.auto_vacuum_commit_threshold else {
            return;
        };
        let commits = self.commits_since_vacuum.fetch_add(1, Ordering::Relaxed) + 1;
        if commits >= threshold {
            tracing::debug!(commits, threshold, "commit threshold reached, running vacuum");
            self.vacuum();
        }
    }
}

/// A thread-safe, in-memory MVCC key-value store with snapshot isolation.
///
/// Transactions are addressed by id. Reads see what was committed before the
/// transaction began plus its own buffered writes; writes stay private until
/// commit. Two overlapping transactions that write the same key cannot both
/// commit: the first committer wins and the other gets
/// [`SnapKvError::WriteConflict`].
///
/// # Example
///
/// ```
/// use snapkv::Store;
///
/// let store = Store::open();
/// let t1 = store.begin_transaction();
/// store.put(t1, b"x", b"a").unwrap();
/// store.commit(t1).unwrap();
///
/// let t2 = store.begin_transaction();
/// assert_eq!(store.get(t2, b"x").unwrap(), Some(b"a".to_vec()));
/// store.rollback(t2).unwrap();
/// ```
pub struct Store {
    shared: Arc<StoreShared>,
    vacuum_worker: Option<VacuumWorker>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("current_ts", &self.shared.registry.current_ts())
            .field("active_transactions", &self.shared.registry.active_count())
            .field("lock_stats_enabled", &self.shared.lock_stats.enabled())
            .field("vacuum_worker", &self.vacuum_worker.is_some())
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::open()
    }
}

impl Store {
    /// Open an empty store with the given configuration.
    pub fn open_with_config(config: StoreConfig) -> Self {
        let lock_stats = Arc::new(LockStats::new(config.lock_stats_enabled));
        let shared = Arc::new(StoreShared {
            registry: TxnRegistry::new(lock_stats.clone()),
            chains: ChainTable::new(config.shard_count, lock_stats.clone()),
            lock_stats,
            auto_vacuum_commit_threshold: config.auto_vacuum_commit_threshold,
            commits_since_vacuum: AtomicU64::new(0),
        });

        let vacuum_worker = config.vacuum_interval.and_then(|interval| {
            let worker_shared = shared.clone();
            VacuumWorker::spawn(interval, move || {
                worker_shared.vacuum();
            })
        });

        Self {
            shared,
            vacuum_worker,
        }
    }

    /// Open an empty store with default settings.
    pub fn open() -> Self {
        Self::open_with_config(StoreConfig::default())
    }

    fn active_txn(&self, txn_id: TxnId) -> Result<TxnHandle, SnapKvError> {
        self.shared
            .registry
            .lookup(txn_id)
            .ok_or(SnapKvError::UnknownTransaction(txn_id))
    }

    /// Start a transaction. Its id is also its snapshot timestamp.
    pub fn begin_transaction(&self) -> TxnId {
        let txn_id = self.shared.registry.begin();
        tracing::debug!(txn = txn_id, "begin");
        txn_id
    }

    /// Read `key` as of the transaction's snapshot, preferring its own
    /// buffered write. `Ok(None)` for a missing or deleted key.
    pub fn get(&self, txn_id: TxnId, key: &[u8]) -> Result<Option<Vec<u8>>, SnapKvError> {
        let handle = self.active_txn(txn_id)?;
        let txn = handle.lock();
        if !txn.is_active() {
            return Err(SnapKvError::UnknownTransaction(txn_id));
        }
        if let Some(buffered) = txn.buffered(key) {
            return Ok(buffered.clone());
        }

        let snapshot = txn.snapshot();
        let Some(chain) = self.shared.chains.get(key) else {
            return Ok(None);
        };
        let (guard, _hold) = self.shared.chains.read_chain(&chain);
        let value = guard
            .find_visible(&snapshot)
            .and_then(|version| version.value().map(<[u8]>::to_vec));
        Ok(value)
    }

    /// Buffer `key = value` in the transaction.
    ///
    /// Fails with `WriteConflict` if another transaction already committed
    /// `key` after this one began; nothing is buffered in that case.
    pub fn put(&self, txn_id: TxnId, key: &[u8], value: &[u8]) -> Result<(), SnapKvError> {
        self.write(txn_id, key, Some(value.to_vec()))
    }

    /// Buffer a delete of `key`. Same conflict rule as [`Store::put`].
    pub fn delete(&self, txn_id: TxnId, key: &[u8]) -> Result<(), SnapKvError> {
        self.write(txn_id, key, None)
    }

    fn write(&self, txn_id: TxnId, key: &[u8], value: Option<Vec<u8>>) -> Result<(), SnapKvError> {
        let handle = self.active_txn(txn_id)?;
        let mut txn = handle.lock();
        if !txn.is_active() {
            return Err(SnapKvError::UnknownTransaction(txn_id));
        }

        if let Some(chain) = self.shared.chains.get(key) {
            let (guard, _hold) = self.shared.chains.read_chain(&chain);
            if has_conflict(&guard, &txn.snapshot()) {
                tracing::warn!(
                    txn = txn_id,
                    start_ts = txn.start_ts(),
                    newest_commit_ts = guard.newest().map(Version::commit_ts),
                    "write conflict on put"
                );
                return Err(SnapKvError::WriteConflict {
                    txn_id,
                    key: key.to_vec(),
                });
            }
        }

        txn.buffer_write(key, value);
        Ok(())
    }

    /// Commit the transaction's buffered writes and return its commit
    /// timestamp.
    ///
    /// All written chains are locked in key order for the duration of the
    /// re-validation, timestamp draw and append. On conflict the transaction
    /// is aborted and none of its writes become visible.
    pub fn commit(&self, txn_id: TxnId) -> Result<Timestamp, SnapKvError> {
        let handle = self.active_txn(txn_id)?;
        let mut txn = handle.lock();
        if !txn.is_active() {
            return Err(SnapKvError::UnknownTransaction(txn_id));
        }

        let snapshot = txn.snapshot();
        let start_ts = snapshot.read_ts();
        let writes: Vec<(Vec<u8>, Option<Vec<u8>>)> = txn.take_write_set().into_iter().collect();
        let chains: Vec<_> = writes
            .iter()
            .map(|(key, _)| self.shared.chains.get_or_create(key))
            .collect();
        let mut guards: Vec<_> = chains
            .iter()
            .map(|chain| self.shared.chains.write_chain(chain))
            .collect();

        let conflict = writes
            .iter()
            .zip(guards.iter())
            .find(|(_, (guard, _))| has_conflict(guard, &snapshot))
            .map(|((key, _), _)| key.clone());

        if let Some(key) = conflict {
            drop(guards);
            txn.mark_aborted();
            self.shared.registry.unregister(txn_id);
            tracing::warn!(
                txn = txn_id,
                start_ts,
                write_set_size = writes.len(),
                "write conflict on commit, transaction aborted"
            );
            return Err(SnapKvError::WriteConflict { txn_id, key });
        }

        let commit_ts = self.shared.registry.allocate_commit_ts();
        let write_set_size = writes.len();
        for ((_, value), (guard, _)) in writes.into_iter().zip(guards.iter_mut()) {
            guard.append(Version::new(commit_ts, value));
        }
        drop(guards);

        txn.mark_committed(commit_ts);
        self.shared.registry.unregister(txn_id);
        drop(txn);

        tracing::debug!(txn = txn_id, commit_ts, write_set_size, "commit");
        self.shared.note_commit();
        Ok(commit_ts)
    }

    /// Discard the transaction's buffered writes.
    pub fn rollback(&self, txn_id: TxnId) -> Result<(), SnapKvError> {
        let handle = self.active_txn(txn_id)?;
        let mut txn = handle.lock();
        if !txn.is_active() {
            return Err(SnapKvError::UnknownTransaction(txn_id));
        }

        let discarded = txn.write_set().len();
        txn.mark_aborted();
        self.shared.registry.unregister(txn_id);
        tracing::debug!(txn = txn_id, discarded, "rollback");
        Ok(())
    }

    /// Reclaim versions no active or future transaction can read, and drop
    /// key entries that aborted commits left empty.
    /// Returns the number of versions removed.
    pub fn vacuum(&self) -> usize {
        self.shared.vacuum().versions_removed
    }

    /// Like [`Store::vacuum`], with the full pass report.
    pub fn vacuum_report(&self) -> VacuumReport {
        self.shared.vacuum()
    }

    pub fn is_active(&self, txn_id: TxnId) -> bool {
        self.shared.registry.is_active(txn_id)
    }

    /// Oldest active start timestamp, or the current clock if none are active.
    pub fn low_watermark(&self) -> Timestamp {
        self.shared.registry.low_watermark()
    }

    /// Last value drawn from the logical clock.
    pub fn current_ts(&self) -> Timestamp {
        self.shared.registry.current_ts()
    }

    pub fn stats(&self) -> StoreStats {
        let handles = self.shared.chains.handles();
        let version_count = handles
            .iter()
            .map(|chain| {
                let (guard, _hold) = self.shared.chains.read_chain(chain);
                guard.len()
            })
            .sum();

        StoreStats {
            active_transactions: self.shared.registry.active_count(),
            chain_count: self.shared.chains.chain_count(),
            version_count,
            current_ts: self.current_ts(),
            low_watermark: self.low_watermark(),
        }
    }

    pub fn lock_stats(&self) -> LockStatsSnapshot {
        self.shared.lock_stats.snapshot()
    }

    pub fn reset_lock_stats(&self) {
        self.shared.lock_stats.reset();
    }
}
