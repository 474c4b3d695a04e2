use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::version::VersionChain;
use crate::core::lock_stats::{LockHoldGuard, LockStatKind, LockStats};

pub type ChainHandle = Arc<RwLock<VersionChain>>;

type Shard = RwLock<HashMap<Vec<u8>, ChainHandle>>;

/// Key -> version chain map, split into independently locked shards.
///
/// Shard locks only guard lookups, inserts and removals; every chain carries
/// its own lock, so readers and writers of different keys never wait on each
/// other beyond a hash-map probe. A chain is only removed while it is empty
/// and the table holds the sole handle to it, so a handle obtained by one
/// thread stays the chain every other thread sees for as long as it is held.
#[derive(Debug)]
pub struct ChainTable {
    shards: Box<[Shard]>,
    hasher: RandomState,
    lock_stats: Arc<LockStats>,
}

impl ChainTable {
    pub fn new(shard_count: usize, lock_stats: Arc<LockStats>) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            hasher: RandomState::new(),
            lock_stats,
        }
    }

    fn shard_for(&self, key: &[u8]) -> &Shard {
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[index]
    }

    pub fn get(&self, key: &[u8]) -> Option<ChainHandle> {
        let shard = self.shard_for(key);
        let (guard, _hold) = self.lock_stats.timed(LockStatKind::Shard, || shard.read());
        guard.get(key).cloned()
    }

    pub fn get_or_create(&self, key: &[u8]) -> ChainHandle {
        if let Some(chain) = self.get(key) {
            return chain;
        }

        let shard = self.shard_for(key);
        let (mut guard, _hold) = self.lock_stats.timed(LockStatKind::Shard, || shard.write());
        guard
            .entry(key.to_vec())
            .or_insert_with(|| Arc::new(RwLock::new(VersionChain::new())))
            .clone()
    }

    /// Point-in-time list of every chain, for whole-table passes.
    pub fn handles(&self) -> Vec<ChainHandle> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            let (guard, _hold) = self.lock_stats.timed(LockStatKind::Shard, || shard.read());
            out.extend(guard.values().cloned());
        }
        out
    }

    /// Drop chains left empty by aborted commits. Chains still referenced
    /// outside the table are kept; a commit holding one may yet append to it.
    pub fn remove_empty(&self) -> usize {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let (mut guard, _hold) = self.lock_stats.timed(LockStatKind::Shard, || shard.write());
            guard.retain(|_, chain| {
                let orphaned = Arc::strong_count(chain) == 1 && chain.read().is_empty();
                removed += usize::from(orphaned);
                !orphaned
            });
        }
        removed
    }

    pub fn chain_count(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let (guard, _hold) = self.lock_stats.timed(LockStatKind::Shard, || shard.read());
                guard.len()
            })
            .sum()
    }

    pub fn read_chain<'a>(
        &'a self,
        chain: &'a ChainHandle,
    ) -> (RwLockReadGuard<'a, VersionChain>, LockHoldGuard<'a>) {
        self.lock_stats.timed(LockStatKind::Chain, || chain.read())
    }

    pub fn write_chain<'a>(
        &'a self,
        chain: &'a ChainHandle,
    ) -> (RwLockWriteGuard<'a, VersionChain>, LockHoldGuard<'a>) {
        self.lock_stats.timed(LockStatKind::Chain, || chain.write())
    }
}
