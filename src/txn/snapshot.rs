use super::Timestamp;

/// The read view of a transaction: everything committed strictly before
/// `read_ts`, nothing at or after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub(crate) read_ts: Timestamp,
}

impl Snapshot {
    pub fn new(read_ts: Timestamp) -> Self {
        Self { read_ts }
    }

    pub fn read_ts(&self) -> Timestamp {
        self.read_ts
    }

    pub fn is_visible(&self, commit_ts: Timestamp) -> bool {
        commit_ts < self.read_ts
    }

    /// A version this snapshot cannot see was committed after the snapshot
    /// was taken; writing over it would lose that update.
    pub fn is_overwritten_by(&self, commit_ts: Timestamp) -> bool {
        !self.is_visible(commit_ts)
    }
}
