//! An in-memory key-value store with multi-version concurrency control.
//!
//! Every transaction reads a snapshot fixed at `begin`, buffers its writes
//! privately, and publishes them atomically at commit. Concurrent writers of
//! the same key follow first-committer-wins. Old versions are reclaimed by
//! [`Store::vacuum`] once no active transaction can read them.

mod core;
mod engine;
mod storage;
mod txn;

pub use crate::core::errors::SnapKvError;
pub use crate::core::lock_stats::{LockCounterSnapshot, LockStatsSnapshot};
pub use crate::engine::{Store, StoreConfig, StoreStats, StoreTxn};
pub use crate::storage::VacuumReport;
pub use crate::txn::{Timestamp, TxnId};
