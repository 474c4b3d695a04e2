use std::collections::BTreeMap;

use super::snapshot::Snapshot;
use super::{Timestamp, TxnId};

/// Buffered writes keyed by user key; `None` is a pending delete.
///
/// Kept ordered so commit can lock chains in a single global key order.
pub type WriteSet = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxnState {
    Active,
    Committed,
    Aborted,
}

#[derive(Debug)]
pub struct Transaction {
    id: TxnId,
    snapshot: Snapshot,
    state: TxnState,
    write_set: WriteSet,
}

impl Transaction {
    /// Start a transaction whose snapshot boundary is its own id.
    pub(crate) fn new(id: TxnId) -> Self {
        Self {
            id,
            snapshot: Snapshot::new(id),
            state: TxnState::Active,
            write_set: WriteSet::new(),
        }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn start_ts(&self) -> Timestamp {
        self.snapshot.read_ts()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TxnState::Active
    }

    pub fn write_set(&self) -> &WriteSet {
        &self.write_set
    }

    /// The buffered write for `key`, if this transaction has one.
    /// `Some(None)` means the transaction deleted the key.
    pub fn buffered(&self, key: &[u8]) -> Option<&Option<Vec<u8>>> {
        self.write_set.get(key)
    }

    pub(crate) fn buffer_write(&mut self, key: &[u8], value: Option<Vec<u8>>) {
        self.assert_active("buffer a write");
        self.write_set.insert(key.to_vec(), value);
    }

    pub(crate) fn take_write_set(&mut self) -> WriteSet {
        std::mem::take(&mut self.write_set)
    }

    pub(crate) fn mark_committed(&mut self, commit_ts: Timestamp) {
        self.assert_active("commit");
        assert!(
            commit_ts > self.start_ts(),
            "commit_ts {commit_ts} must be newer than start_ts {}",
            self.start_ts()
        );
        self.write_set.clear();
        self.state = TxnState::Committed;
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.assert_active("abort");
        self.write_set.clear();
        self.state = TxnState::Aborted;
    }

    fn assert_active(&self, action: &str) {
        assert!(
            self.is_active(),
            "cannot {action} transaction {} in state {:?}",
            self.id(),
            self.state()
        );
    }
}
