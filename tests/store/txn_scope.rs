//! Scoped transactions: `Store::with_txn` and `StoreTxn` drop semantics.

use snapkv::{SnapKvError, Store};

#[test]
fn with_txn_commits_on_ok() {
    let store = Store::open();
    let answer = store
        .with_txn(|txn| {
            txn.put(b"a", b"1")?;
            txn.put(b"b", b"2")?;
            Ok(42)
        })
        .unwrap();
    assert_eq!(answer, 42);

    let reader = store.transaction();
    assert_eq!(reader.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(reader.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn with_txn_rolls_back_on_err() {
    let store = Store::open();
    let mut seen_id = None;
    let err = store
        .with_txn(|txn| -> Result<(), SnapKvError> {
            seen_id = Some(txn.id());
            txn.put(b"k", b"discarded")?;
            Err(SnapKvError::UnknownTransaction(0))
        })
        .unwrap_err();
    assert_eq!(err, SnapKvError::UnknownTransaction(0));

    let txn_id = seen_id.unwrap();
    assert!(!store.is_active(txn_id));
    assert_eq!(store.stats().version_count, 0);
}

#[test]
fn with_txn_surfaces_commit_conflict() {
    let store = Store::open();
    let err = store
        .with_txn(|txn| {
            txn.put(b"k", b"mine")?;
            // Another transaction commits the same key before this one does.
            store.with_txn(|other| other.put(b"k", b"theirs"))?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_write_conflict());
    assert_eq!(store.stats().active_transactions, 0);

    let reader = store.transaction();
    assert_eq!(reader.get(b"k").unwrap(), Some(b"theirs".to_vec()));
}

#[test]
fn dropped_txn_rolls_back() {
    let store = Store::open();
    let txn_id = {
        let txn = store.transaction();
        txn.put(b"k", b"never").unwrap();
        assert!(store.is_active(txn.id()));
        txn.id()
    };

    assert!(!store.is_active(txn_id));
    let reader = store.transaction();
    assert_eq!(reader.get(b"k").unwrap(), None);
}

#[test]
fn explicit_commit_returns_timestamp() {
    let store = Store::open();
    let txn = store.transaction();
    let txn_id = txn.id();
    txn.put(b"k", b"v").unwrap();
    let commit_ts = txn.commit().unwrap();

    assert!(commit_ts > txn_id);
    assert_eq!(commit_ts, store.current_ts());
    assert!(!store.is_active(txn_id));
}

#[test]
fn explicit_rollback_then_drop_is_quiet() {
    let store = Store::open();
    let txn = store.transaction();
    let txn_id = txn.id();
    txn.delete(b"k").unwrap();
    txn.rollback().unwrap();

    assert!(!store.is_active(txn_id));
    assert_eq!(store.stats().active_transactions, 0);
}

#[test]
fn dropping_txn_terminated_by_id_is_harmless() {
    let store = Store::open();
    let txn = store.transaction();
    store.rollback(txn.id()).unwrap();
    drop(txn);
    assert_eq!(store.stats().active_transactions, 0);
}
