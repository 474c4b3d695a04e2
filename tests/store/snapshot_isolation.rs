//! Snapshot visibility, read-your-own-writes and rollback isolation.

use snapkv::{SnapKvError, Store};

#[test]
fn end_to_end_scenario() {
    let store = Store::open();

    let t1 = store.begin_transaction();
    assert_eq!(t1, 1);
    store.put(t1, b"x", b"a").unwrap();
    assert_eq!(store.commit(t1).unwrap(), 2);

    let t2 = store.begin_transaction();
    assert_eq!(t2, 3);
    assert_eq!(store.get(t2, b"x").unwrap(), Some(b"a".to_vec()));

    let t3 = store.begin_transaction();
    store.put(t2, b"x", b"from-t2").unwrap();
    store.put(t3, b"x", b"from-t3").unwrap();

    store.commit(t2).unwrap();
    let err = store.commit(t3).unwrap_err();
    assert_eq!(
        err,
        SnapKvError::WriteConflict {
            txn_id: t3,
            key: b"x".to_vec()
        }
    );

    let check = store.begin_transaction();
    assert_eq!(store.get(check, b"x").unwrap(), Some(b"from-t2".to_vec()));
}

#[test]
fn missing_key_reads_as_none() {
    let store = Store::open();
    let t = store.begin_transaction();
    assert_eq!(store.get(t, b"nope").unwrap(), None);
}

#[test]
fn read_your_own_writes() {
    let store = Store::open();
    let t = store.begin_transaction();
    store.put(t, b"k", b"v1").unwrap();
    assert_eq!(store.get(t, b"k").unwrap(), Some(b"v1".to_vec()));

    store.put(t, b"k", b"v2").unwrap();
    assert_eq!(store.get(t, b"k").unwrap(), Some(b"v2".to_vec()));

    store.delete(t, b"k").unwrap();
    assert_eq!(store.get(t, b"k").unwrap(), None);
}

#[test]
fn uncommitted_writes_are_invisible_to_others() {
    let store = Store::open();
    let writer = store.begin_transaction();
    store.put(writer, b"k", b"v").unwrap();

    let reader = store.begin_transaction();
    assert_eq!(store.get(reader, b"k").unwrap(), None);

    store.commit(writer).unwrap();
    // Committed after the reader's snapshot.
    assert_eq!(store.get(reader, b"k").unwrap(), None);

    let late_reader = store.begin_transaction();
    assert_eq!(store.get(late_reader, b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn snapshot_is_stable_across_later_commits() {
    let store = Store::open();
    let setup = store.begin_transaction();
    store.put(setup, b"k", b"old").unwrap();
    store.commit(setup).unwrap();

    let reader = store.begin_transaction();
    assert_eq!(store.get(reader, b"k").unwrap(), Some(b"old".to_vec()));

    for i in 0..5 {
        let writer = store.begin_transaction();
        store.put(writer, b"k", format!("new-{i}").as_bytes()).unwrap();
        store.commit(writer).unwrap();
        assert_eq!(store.get(reader, b"k").unwrap(), Some(b"old".to_vec()));
    }

    let deleter = store.begin_transaction();
    store.delete(deleter, b"k").unwrap();
    store.commit(deleter).unwrap();
    assert_eq!(store.get(reader, b"k").unwrap(), Some(b"old".to_vec()));
}

#[test]
fn committed_delete_hides_key() {
    let store = Store::open();
    let t1 = store.begin_transaction();
    store.put(t1, b"k", b"v").unwrap();
    store.commit(t1).unwrap();

    let t2 = store.begin_transaction();
    store.delete(t2, b"k").unwrap();
    store.commit(t2).unwrap();

    let t3 = store.begin_transaction();
    assert_eq!(store.get(t3, b"k").unwrap(), None);
}

#[test]
fn rollback_discards_writes() {
    let store = Store::open();
    let t = store.begin_transaction();
    store.put(t, b"k", b"never").unwrap();
    store.rollback(t).unwrap();

    let reader = store.begin_transaction();
    assert_eq!(store.get(reader, b"k").unwrap(), None);
    assert_eq!(store.stats().version_count, 0);
}

#[test]
fn rollback_of_empty_transaction_succeeds() {
    let store = Store::open();
    let t = store.begin_transaction();
    store.rollback(t).unwrap();
    assert!(!store.is_active(t));
}

#[test]
fn terminated_transactions_are_unknown() {
    let store = Store::open();

    let committed = store.begin_transaction();
    store.commit(committed).unwrap();
    let rolled_back = store.begin_transaction();
    store.rollback(rolled_back).unwrap();

    for txn_id in [committed, rolled_back, 999] {
        let unknown = SnapKvError::UnknownTransaction(txn_id);
        assert_eq!(store.get(txn_id, b"k").unwrap_err(), unknown);
        assert_eq!(store.put(txn_id, b"k", b"v").unwrap_err(), unknown);
        assert_eq!(store.delete(txn_id, b"k").unwrap_err(), unknown);
        assert_eq!(store.commit(txn_id).unwrap_err(), unknown);
        assert_eq!(store.rollback(txn_id).unwrap_err(), unknown);
    }
}

#[test]
fn clock_advances_once_per_begin_and_commit() {
    let store = Store::open();
    assert_eq!(store.current_ts(), 0);

    let t1 = store.begin_transaction();
    let t2 = store.begin_transaction();
    assert_eq!(store.current_ts(), 2);

    let c1 = store.commit(t1).unwrap();
    assert_eq!(c1, 3);
    store.rollback(t2).unwrap();
    assert_eq!(store.current_ts(), 3);
}

#[test]
fn independent_stores_do_not_share_state() {
    let a = Store::open();
    let b = Store::open();

    let ta = a.begin_transaction();
    a.put(ta, b"k", b"a").unwrap();
    a.commit(ta).unwrap();

    let tb = b.begin_transaction();
    assert_eq!(tb, 1);
    assert_eq!(b.get(tb, b"k").unwrap(), None);
}
