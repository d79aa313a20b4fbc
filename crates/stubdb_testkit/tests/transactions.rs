//! Transaction isolation, commit and rollback behavior.

use std::sync::Arc;
use std::thread;
use stubdb_core::{
    BeginTransactionRequest, CommitRequest, Config, CoreError, LookupRequest, Mutation,
    RollbackRequest,
};
use stubdb_testkit::prelude::*;
use stubdb_testkit::scenarios::{item, item_key};

#[test]
fn put_in_transaction_is_invisible_until_commit() {
    let test_ds = TestDatastore::new();
    let txn = test_ds.begin();

    test_ds.put(item("a", 1), 0, Some(txn)).unwrap();
    assert!(test_ds.get(&item_key("a"), Some(txn)).unwrap().is_none());
    assert!(test_ds.record(&item_key("a")).is_none());

    let results = test_ds.commit_txn(txn);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].version, 0);
    assert_eq!(test_ds.version(&item_key("a")), Some(0));
}

#[test]
fn delete_in_transaction_is_staged() {
    let test_ds = scenarios::abc_datastore();
    let txn = test_ds.begin();

    test_ds.delete(item_key("a"), Some(txn)).unwrap();
    assert!(test_ds.get(&item_key("a"), Some(txn)).unwrap().is_some());
    assert!(test_ds.record(&item_key("a")).is_some());

    let results = test_ds.commit_txn(txn);
    assert_eq!(results[0].version, 1);
    assert!(test_ds.record(&item_key("a")).is_none());
}

#[test]
fn snapshot_ignores_other_transactions() {
    let test_ds = TestDatastore::new();
    let first = test_ds.begin();
    let second = test_ds.begin();

    test_ds.put(item("a", 1), 0, Some(first)).unwrap();
    test_ds.commit_txn(first);

    assert!(test_ds.get(&item_key("a"), Some(second)).unwrap().is_none());
    // The first commit wrote to the store, so the second can no longer commit.
    let err = test_ds
        .commit(CommitRequest::transaction(second))
        .unwrap_err();
    assert!(matches!(err, CoreError::GenerationConflict { .. }));
}

#[test]
fn unrelated_direct_write_aborts_commit() {
    let test_ds = scenarios::abc_datastore();
    let txn = test_ds.begin();
    test_ds.put(item("x", 1), 0, Some(txn)).unwrap();

    test_ds.put(item("unrelated", 1), 0, None).unwrap();

    let err = test_ds
        .commit(CommitRequest::transaction(txn))
        .unwrap_err();
    match err {
        CoreError::GenerationConflict {
            id,
            starting_seq,
            current_seq,
        } => {
            assert_eq!(id, txn);
            assert_eq!(starting_seq, 3);
            assert_eq!(current_seq, 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(test_ds.record(&item_key("x")).is_none());
    assert_eq!(test_ds.open_transactions(), 0);
}

#[test]
fn direct_delete_does_not_abort_commit() {
    let test_ds = scenarios::abc_datastore();
    let txn = test_ds.begin();
    test_ds.put(item("x", 1), 0, Some(txn)).unwrap();

    test_ds.delete(item_key("a"), None).unwrap();

    test_ds.commit_txn(txn);
    assert!(test_ds.record(&item_key("x")).is_some());
}

#[test]
fn failed_commit_consumes_transaction() {
    let test_ds = TestDatastore::new();
    let txn = test_ds.begin();
    test_ds.put(item("a", 1), 0, None).unwrap();

    assert!(test_ds.commit(CommitRequest::transaction(txn)).is_err());
    assert_eq!(
        test_ds
            .ds
            .rollback(RollbackRequest { transaction: txn })
            .unwrap_err(),
        CoreError::UnknownTransaction { id: txn }
    );
}

#[test]
fn rollback_discards_everything_staged() {
    let test_ds = scenarios::abc_datastore();
    let txn = test_ds.begin();
    test_ds.put(item("a", 99), 0, Some(txn)).unwrap();
    test_ds.delete(item_key("b"), Some(txn)).unwrap();

    test_ds.rollback(txn);

    assert_eq!(test_ds.record(&item_key("a")).unwrap().entity, item("a", 10));
    assert!(test_ds.record(&item_key("b")).is_some());
    assert_eq!(test_ds.sequence_id(None), 3);
}

#[test]
fn double_rollback_is_unknown() {
    let test_ds = TestDatastore::new();
    let txn = test_ds.begin();
    test_ds.rollback(txn);
    assert!(matches!(
        test_ds.ds.rollback(RollbackRequest { transaction: txn }),
        Err(CoreError::UnknownTransaction { .. })
    ));
}

#[test]
fn staged_then_supplied_mutations() {
    let test_ds = TestDatastore::new();
    let txn = test_ds.begin();
    test_ds.put(item("a", 1), 0, Some(txn)).unwrap();

    let response = test_ds
        .commit(
            CommitRequest::transaction(txn)
                .with(Mutation::upsert(item("a", 2), 0))
                .with(Mutation::insert(item("b", 1))),
        )
        .unwrap();
    let versions: Vec<i64> = response
        .mutation_results
        .iter()
        .map(|r| r.version)
        .collect();
    assert_eq!(versions, vec![0, 1, 0]);
    assert_eq!(test_ds.sequence_id(None), 3);
}

#[test]
fn lookup_in_transaction_reports_snapshot_sequence() {
    let test_ds = scenarios::abc_datastore();
    let txn = test_ds.begin();
    test_ds.put(item("d", 40), 0, None).unwrap();

    let response = test_ds
        .lookup(LookupRequest::new(vec![item_key("a"), item_key("d")]).in_transaction(txn))
        .unwrap();
    assert_eq!(response.found.len(), 1);
    assert_eq!(response.missing.len(), 1);
    assert_eq!(response.missing[0].version, 3);
}

#[test]
fn read_only_transaction_rejects_supplied_mutations_when_enforced() {
    let test_ds = TestDatastore::with_config(Config::new().enforce_read_only(true));
    test_ds.seed([item("a", 10)]);
    let txn = test_ds
        .begin_transaction(BeginTransactionRequest::read_only())
        .unwrap()
        .transaction;

    assert!(test_ds.get(&item_key("a"), Some(txn)).unwrap().is_some());
    assert!(matches!(
        test_ds.commit(CommitRequest::transaction(txn).with(Mutation::delete(item_key("a")))),
        Err(CoreError::ReadOnlyTransaction { .. })
    ));
    assert!(test_ds.record(&item_key("a")).is_some());
}

#[test]
fn read_only_transaction_commits_writes_by_default() {
    let test_ds = scenarios::abc_datastore();
    let txn = test_ds
        .begin_transaction(BeginTransactionRequest::read_only())
        .unwrap()
        .transaction;

    test_ds.put(item("d", 40), 0, Some(txn)).unwrap();
    let results = test_ds
        .commit(CommitRequest::transaction(txn).with(Mutation::delete(item_key("a"))))
        .unwrap()
        .mutation_results;

    assert_eq!(results.len(), 2);
    assert_eq!(test_ds.version(&item_key("d")), Some(0));
    assert!(test_ds.record(&item_key("a")).is_none());
}

#[test]
fn transaction_limit_is_enforced() {
    with_datastore_config(Config::new().max_open_transactions(2), |ds| {
        for _ in 0..2 {
            ds.begin_transaction(BeginTransactionRequest::default())
                .unwrap();
        }
        assert_eq!(
            ds.begin_transaction(BeginTransactionRequest::default())
                .unwrap_err(),
            CoreError::TooManyTransactions { limit: 2 }
        );
    });
}

#[test]
fn concurrent_transactions_one_winner() {
    let ds = Arc::new(scenarios::abc_datastore().ds);
    let txns: Vec<_> = (0..4)
        .map(|_| {
            ds.begin_transaction(BeginTransactionRequest::default())
                .unwrap()
                .transaction
        })
        .collect();

    let handles: Vec<_> = txns
        .into_iter()
        .enumerate()
        .map(|(i, txn)| {
            let ds = Arc::clone(&ds);
            thread::spawn(move || {
                let n = i64::try_from(i).unwrap();
                ds.put(item("shared", n), 0, Some(txn)).unwrap();
                ds.commit(CommitRequest::transaction(txn)).is_ok()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(ds.open_transactions(), 0);
}
