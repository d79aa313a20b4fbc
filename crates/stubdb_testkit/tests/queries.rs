//! Query evaluation through the datastore.

use stubdb_core::{
    CompositeFilter, CompositeOperator, CoreError, Direction, Entity, Filter, Key, KeyId, Operator,
    PropertyValue, Query, ResultType, RunQueryRequest, Value, KEY_PROPERTY,
};
use stubdb_testkit::prelude::*;
use stubdb_testkit::scenarios::item;

fn run(ds: &TestDatastore, query: Query) -> stubdb_core::QueryResultBatch {
    ds.run_query(RunQueryRequest::new(query)).unwrap().batch
}

fn names(batch: &stubdb_core::QueryResultBatch) -> Vec<String> {
    batch
        .entities()
        .map(|e| match &e.key.path.last().unwrap().id {
            KeyId::Name(name) => name.clone(),
            KeyId::Id(id) => id.to_string(),
        })
        .collect()
}

fn at_least_20() -> Query {
    Query::new()
        .kind("Item")
        .filter(Filter::ge("n", 20))
        .order_by("n", Direction::Ascending)
}

#[test]
fn filter_and_order() {
    let test_ds = scenarios::abc_datastore();
    let batch = run(&test_ds, at_least_20());
    assert_eq!(names(&batch), vec!["b", "c"]);
    assert_eq!(batch.snapshot_version, 3);
}

#[test]
fn limit_applies_after_order() {
    let test_ds = scenarios::abc_datastore();
    let batch = run(&test_ds, at_least_20().limit(1));
    assert_eq!(names(&batch), vec!["b"]);
}

#[test]
fn projection_exposes_only_listed() {
    let test_ds = scenarios::abc_datastore();
    test_ds.put(item("d", 40).with("secret", "x"), 0, None).unwrap();

    let batch = run(&test_ds, at_least_20().project(["n"]));
    assert_eq!(batch.entity_result_type, ResultType::Projection);
    for entity in batch.entities() {
        let props: Vec<&String> = entity.properties.keys().collect();
        assert_eq!(props, vec!["n"]);
    }
}

#[test]
fn keys_only_results() {
    let test_ds = scenarios::abc_datastore();
    let batch = run(&test_ds, Query::new().project([KEY_PROPERTY]));
    assert_eq!(batch.entity_result_type, ResultType::KeysOnly);
    assert_eq!(batch.entity_results.len(), 3);
    assert!(batch.entities().all(|e| e.properties.is_empty()));
    assert!(batch.entity_results.iter().all(|r| r.version == 0));
}

#[test]
fn repeated_property_matches_any() {
    let test_ds = scenarios::tagged_datastore();
    assert_eq!(
        run(&test_ds, Query::new().filter(Filter::eq("tags", 2)))
            .entity_results
            .len(),
        1
    );
    assert!(run(&test_ds, Query::new().filter(Filter::eq("tags", 5)))
        .entity_results
        .is_empty());
}

#[test]
fn null_equality_matches_unset() {
    let test_ds = scenarios::abc_datastore();
    test_ds
        .put(Entity::new(Key::name("Item", "blank")), 0, None)
        .unwrap();
    test_ds
        .put(Entity::new(Key::name("Item", "nil")).with("n", Value::Null), 0, None)
        .unwrap();

    let mut found = names(&run(&test_ds, Query::new().filter(Filter::is_null("n"))));
    found.sort();
    assert_eq!(found, vec!["blank", "nil"]);
}

#[test]
fn kind_filter_ignores_ancestors() {
    let test_ds = scenarios::family_datastore();
    let posts = run(&test_ds, Query::new().kind("Post"));
    assert_eq!(posts.entity_results.len(), 3);
    let users = run(&test_ds, Query::new().kind("User"));
    assert_eq!(users.entity_results.len(), 1);
}

#[test]
fn composite_and() {
    let test_ds = scenarios::numbered_datastore(10);
    let query = Query::new()
        .filter(Filter::and(vec![Filter::gt("n", 2), Filter::le("n", 5)]))
        .order_by("n", Direction::Descending);
    let batch = run(&test_ds, query);
    let ns: Vec<i64> = batch
        .entities()
        .map(|e| e.get("n").unwrap().as_single().unwrap().as_integer().unwrap())
        .collect();
    assert_eq!(ns, vec![5, 4, 3]);
}

#[test]
fn unsupported_shapes_fail_loudly() {
    let test_ds = scenarios::abc_datastore();

    let or = Query::new().filter(Filter::Composite(CompositeFilter {
        op: CompositeOperator::Or,
        filters: vec![Filter::eq("n", 10), Filter::eq("n", 20)],
    }));
    assert!(matches!(
        test_ds.run_query(RunQueryRequest::new(or)),
        Err(CoreError::UnsupportedFilter { .. })
    ));

    let ancestor = Query::new().filter(Filter::property(
        KEY_PROPERTY,
        Operator::HasAncestor,
        Key::name("User", "ada"),
    ));
    assert!(matches!(
        test_ds.run_query(RunQueryRequest::new(ancestor)),
        Err(CoreError::UnsupportedFilter { .. })
    ));

    let two_orders = Query::new()
        .order_by("n", Direction::Ascending)
        .order_by("m", Direction::Descending);
    assert!(matches!(
        test_ds.run_query(RunQueryRequest::new(two_orders)),
        Err(CoreError::UnsupportedQuery { .. })
    ));
}

#[test]
fn ordering_type_mismatch() {
    let test_ds = scenarios::abc_datastore();
    test_ds.put(item("a", 0).with("n", "ten"), 0, None).unwrap();

    let err = test_ds
        .run_query(RunQueryRequest::new(
            Query::new().order_by("n", Direction::Ascending),
        ))
        .unwrap_err();
    assert!(matches!(err, CoreError::OrderingTypeMismatch { .. }));
}

#[test]
fn ordering_rejects_null_mixed_with_values() {
    let test_ds = TestDatastore::new();
    test_ds.seed([
        item("a", 10),
        Entity::new(Key::name("Item", "b")).with("n", Value::Null),
        Entity::new(Key::name("Item", "c")),
    ]);

    for direction in [Direction::Ascending, Direction::Descending] {
        let err = test_ds
            .run_query(RunQueryRequest::new(Query::new().order_by("n", direction)))
            .unwrap_err();
        assert!(matches!(err, CoreError::OrderingTypeMismatch { .. }));
    }

    // Filtering out the null rows makes the order well defined again.
    let batch = run(
        &test_ds,
        Query::new()
            .filter(Filter::ge("n", 0))
            .order_by("n", Direction::Ascending),
    );
    assert_eq!(names(&batch), vec!["a"]);
}

#[test]
fn repeated_ordering() {
    let test_ds = TestDatastore::new();
    test_ds.seed([
        item("a", 0).with("n", PropertyValue::repeated([2, 1])),
        item("b", 0).with("n", PropertyValue::repeated([1, 9])),
        item("c", 0).with("n", PropertyValue::Repeated(Vec::new())),
    ]);
    let batch = run(&test_ds, Query::new().order_by("n", Direction::Ascending));
    assert_eq!(names(&batch), vec!["c", "b", "a"]);
}

#[test]
fn query_in_transaction_reads_snapshot() {
    let test_ds = scenarios::abc_datastore();
    let txn = test_ds.begin();
    test_ds.put(item("d", 40), 0, None).unwrap();
    test_ds.put(item("e", 50), 0, Some(txn)).unwrap();

    let batch = test_ds
        .run_query(RunQueryRequest::new(at_least_20()).in_transaction(txn))
        .unwrap()
        .batch;
    assert_eq!(names(&batch), vec!["b", "c"]);
    assert_eq!(batch.snapshot_version, 3);
}

#[test]
fn empty_store_returns_empty_batch() {
    with_datastore(|ds| {
        let batch = ds
            .run_query(RunQueryRequest::new(at_least_20()))
            .unwrap()
            .batch;
        assert!(batch.entity_results.is_empty());
        assert_eq!(batch.entity_result_type, ResultType::Full);
        assert_eq!(batch.snapshot_version, 0);
    });
}
