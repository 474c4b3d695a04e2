use crate::txn::{Snapshot, Timestamp};

/// One committed value of a key. `value == None` is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    commit_ts: Timestamp,
    value: Option<Vec<u8>>,
}

impl Version {
    pub fn new(commit_ts: Timestamp, value: Option<Vec<u8>>) -> Self {
        Self { commit_ts, value }
    }

    pub fn commit_ts(&self) -> Timestamp {
        self.commit_ts
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

}

/// Committed history of one key, oldest first.
///
/// `commit_ts` is strictly increasing along the chain. Only commit appends and
/// only vacuum removes.
#[derive(Debug, Default)]
pub struct VersionChain {
    versions: Vec<Version>,
}

impl VersionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, version: Version) {
        if let Some(newest) = self.newest() {
            assert!(
                version.commit_ts > newest.commit_ts,
                "version chain out of order: appending commit_ts {} after {}",
                version.commit_ts,
                newest.commit_ts
            );
        }
        self.versions.push(version);
    }

    pub fn newest(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// The newest version the snapshot can see.
    pub fn find_visible(&self, snapshot: &Snapshot) -> Option<&Version> {
        self.versions
            .iter()
            .rev()
            .find(|version| snapshot.is_visible(version.commit_ts))
    }

    /// Drop every version shadowed by a newer version with
    /// `commit_ts <= watermark`. Returns how many were removed.
    ///
    /// The newest version at or below the watermark stays: it is what the
    /// oldest possible reader sees.
    pub fn prune_shadowed(&mut self, watermark: Timestamp) -> usize {
        let Some(keep_from) = self
            .versions
            .iter()
            .rposition(|version| version.commit_ts <= watermark)
        else {
            return 0;
        };
        self.versions.drain(..keep_from);
        keep_from
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
