use super::version::VersionChain;
use crate::txn::Snapshot;

/// First-committer-wins: a write conflicts when the key already has a version
/// the writer's snapshot cannot see, i.e. one committed at or after it began.
///
/// Chains are ordered by `commit_ts`, so only the newest version matters.
/// Vacuum never removes the newest version, so a conflict once observed stays
/// observable.
pub fn has_conflict(chain: &VersionChain, snapshot: &Snapshot) -> bool {
    chain
        .newest()
        .is_some_and(|newest| snapshot.is_overwritten_by(newest.commit_ts()))
}
