//! Scoped transactions over a [`Store`].
//!
//! [`StoreTxn`] wraps a transaction id borrowed from a store and rolls the
//! transaction back if it is dropped without being committed.
//!
//! # Example
//!
//! ```
//! use snapkv::Store;
//!
//! let store = Store::open();
//! store
//!     .with_txn(|txn| {
//!         txn.put(b"alice", b"1")?;
//!         txn.put(b"bob", b"2")?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let reader = store.transaction();
//! assert_eq!(reader.get(b"bob").unwrap(), Some(b"2".to_vec()));
//! ```

use crate::core::errors::SnapKvError;
use crate::txn::{Timestamp, TxnId};

use super::store::Store;

pub struct StoreTxn<'a> {
    store: &'a Store,
    txn_id: TxnId,
    finished: bool,
}

impl<'a> StoreTxn<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            store,
            txn_id: store.begin_transaction(),
            finished: false,
        }
    }

    pub fn id(&self) -> TxnId {
        self.txn_id
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SnapKvError> {
        self.store.get(self.txn_id, key)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), SnapKvError> {
        self.store.put(self.txn_id, key, value)
    }

    pub fn delete(&self, key: &[u8]) -> Result<(), SnapKvError> {
        self.store.delete(self.txn_id, key)
    }

    pub fn commit(mut self) -> Result<Timestamp, SnapKvError> {
        // A failed commit has already aborted the transaction.
        self.finished = true;
        self.store.commit(self.txn_id)
    }

    pub fn rollback(mut self) -> Result<(), SnapKvError> {
        self.finished = true;
        self.store.rollback(self.txn_id)
    }
}

impl Drop for StoreTxn<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.store.rollback(self.txn_id) {
            tracing::debug!(txn = self.txn_id, error = %err, "rollback on drop skipped");
        }
    }
}

impl Store {
    /// Begin a transaction that rolls back unless committed.
    pub fn transaction(&self) -> StoreTxn<'_> {
        StoreTxn::new(self)
    }

    /// Run `f` in a fresh transaction: commit if it returns `Ok`, roll back if
    /// it returns `Err`. Write conflicts are returned to the caller; retrying
    /// is left to the application.
    pub fn with_txn<T, F>(&self, f: F) -> Result<T, SnapKvError>
    where
        F: FnOnce(&StoreTxn<'_>) -> Result<T, SnapKvError>,
    {
        let txn = self.transaction();
        match f(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback after failed closure did not apply");
                }
                Err(err)
            }
        }
    }
}
