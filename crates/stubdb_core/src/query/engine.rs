//! Query execution.

use super::{Direction, EntityResult, PropertyOrder, Query, QueryResultBatch, ResultType};
use crate::entity::{EntityStore, StoredRecord};
use crate::error::{CoreError, CoreResult};
use crate::value::{PropertyValue, Value, ValueClass};
use std::cmp::Ordering;
use tracing::trace;

/// Evaluates queries against an [`EntityStore`].
///
/// Stateless; the caller picks the source (live store or a transaction's
/// snapshot).
pub struct QueryEngine;

impl QueryEngine {
    /// Runs `query` against `source`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::UnsupportedQuery`] for more than one order clause
    /// - [`CoreError::UnsupportedFilter`] for filters that cannot be evaluated
    /// - [`CoreError::OrderingTypeMismatch`] when the sort property holds
    ///   incomparable types across matching entities
    pub fn run(query: &Query, source: &EntityStore) -> CoreResult<QueryResultBatch> {
        let order = match query.order.as_slice() {
            [] => None,
            [order] => Some(order),
            _ => {
                return Err(CoreError::unsupported_query(format!(
                    "{} order clauses given, at most one is supported",
                    query.order.len()
                )))
            }
        };
        if let Some(filter) = &query.filter {
            filter.validate()?;
        }

        let mut records: Vec<&StoredRecord> = source
            .items()
            .map(|(_, record)| record)
            .filter(|record| match &query.kind {
                Some(kind) => record.entity.key.kind() == Some(kind.as_str()),
                None => true,
            })
            .filter(|record| {
                query
                    .filter
                    .as_ref()
                    .map_or(true, |filter| filter.matches(&record.entity))
            })
            .collect();

        if let Some(order) = order {
            sort_records(&mut records, order)?;
        }
        if let Some(limit) = query.limit {
            records.truncate(limit);
        }

        let result_type = query.result_type();
        let entity_results = records
            .into_iter()
            .map(|record| EntityResult {
                entity: match result_type {
                    ResultType::Full => record.entity.clone(),
                    ResultType::KeysOnly => record.entity.key_only(),
                    ResultType::Projection => record.entity.project(&query.projection),
                },
                version: record.version,
            })
            .collect::<Vec<_>>();

        trace!(
            kind = ?query.kind,
            results = entity_results.len(),
            ?result_type,
            seq = source.sequence_id(),
            "query evaluated"
        );
        Ok(QueryResultBatch {
            entity_result_type: result_type,
            entity_results,
            snapshot_version: source.sequence_id(),
        })
    }
}

/// A record's value for the sort property.
enum SortKey<'a> {
    /// Unset or `Null`.
    Null,
    Single(&'a Value),
    Repeated(&'a [Value]),
}

impl<'a> SortKey<'a> {
    fn of(record: &'a StoredRecord, property: &str) -> Self {
        match record.entity.get(property) {
            None => SortKey::Null,
            Some(PropertyValue::Single(v)) if v.is_null() => SortKey::Null,
            Some(PropertyValue::Single(v)) => SortKey::Single(v),
            Some(PropertyValue::Repeated(vs)) => SortKey::Repeated(vs),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Null, SortKey::Null) => Ordering::Equal,
            (SortKey::Single(a), SortKey::Single(b)) => a.sort_cmp(b),
            (SortKey::Repeated(a), SortKey::Repeated(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.sort_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            // Ruled out by `check_comparable`.
            _ => Ordering::Equal,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Null,
    Single(ValueClass),
    Repeated,
}

/// Rejects sort keys that mix incomparable types.
///
/// Every row must have the same shape: all unset or null, all scalars of
/// one class, or all repeated with elements of one class. Unset and null
/// are their own class and never compare with values.
fn check_comparable(keys: &[SortKey<'_>], property: &str) -> CoreResult<()> {
    let mismatch = |left: &'static str, right: &'static str| CoreError::OrderingTypeMismatch {
        property: property.to_string(),
        left,
        right,
    };

    let mut shape: Option<(Shape, &'static str)> = None;
    let mut element: Option<(ValueClass, &'static str)> = None;
    for key in keys {
        let current = match key {
            SortKey::Null => (Shape::Null, "null"),
            SortKey::Single(v) => (Shape::Single(v.class()), v.type_name()),
            SortKey::Repeated(vs) => {
                for v in vs.iter() {
                    match element {
                        None => element = Some((v.class(), v.type_name())),
                        Some((class, name)) if class != v.class() => {
                            return Err(mismatch(name, v.type_name()))
                        }
                        Some(_) => {}
                    }
                }
                (Shape::Repeated, "repeated")
            }
        };
        match shape {
            None => shape = Some(current),
            Some((seen, name)) if seen != current.0 => return Err(mismatch(name, current.1)),
            Some(_) => {}
        }
    }
    Ok(())
}

fn sort_records<'r>(records: &mut Vec<&'r StoredRecord>, order: &PropertyOrder) -> CoreResult<()> {
    let keys: Vec<SortKey<'r>> = records
        .iter()
        .map(|&record| SortKey::of(record, &order.property))
        .collect();
    check_comparable(&keys, &order.property)?;

    let mut keyed: Vec<(SortKey<'r>, &'r StoredRecord)> =
        keys.into_iter().zip(records.iter().copied()).collect();
    keyed.sort_by(|(a, _), (b, _)| match order.direction {
        Direction::Ascending => a.compare(b),
        Direction::Descending => b.compare(a),
    });
    *records = keyed.into_iter().map(|(_, record)| record).collect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::key::{Key, KeyId};
    use crate::query::{Filter, KEY_PROPERTY};

    fn item(name: &str, n: impl Into<PropertyValue>) -> Entity {
        Entity::new(Key::name("Item", name)).with("n", n)
    }

    fn abc_store() -> EntityStore {
        let mut store = EntityStore::new();
        store.put(item("a", 10), 0).unwrap();
        store.put(item("b", 20), 0).unwrap();
        store.put(item("c", 30), 0).unwrap();
        store
    }

    fn names(batch: &QueryResultBatch) -> Vec<String> {
        batch
            .entities()
            .map(|e| match &e.key.path[0].id {
                KeyId::Name(name) => name.clone(),
                KeyId::Id(id) => id.to_string(),
            })
            .collect()
    }

    fn ordered_by_n() -> Query {
        Query::new()
            .kind("Item")
            .filter(Filter::ge("n", 20))
            .order_by("n", Direction::Ascending)
    }

    #[test]
    fn filter_then_order() {
        let batch = QueryEngine::run(&ordered_by_n(), &abc_store()).unwrap();
        assert_eq!(names(&batch), vec!["b", "c"]);
        assert_eq!(batch.entity_result_type, ResultType::Full);
        assert_eq!(batch.snapshot_version, 3);
    }

    #[test]
    fn limit_truncates_after_sort() {
        let batch = QueryEngine::run(&ordered_by_n().limit(1), &abc_store()).unwrap();
        assert_eq!(names(&batch), vec!["b"]);
    }

    #[test]
    fn descending_order() {
        let query = Query::new().order_by("n", Direction::Descending);
        let batch = QueryEngine::run(&query, &abc_store()).unwrap();
        assert_eq!(names(&batch), vec!["c", "b", "a"]);
    }

    #[test]
    fn projection_keeps_only_listed_properties() {
        let mut store = EntityStore::new();
        store
            .put(item("a", 10).with("extra", "x"), 0)
            .unwrap();

        let batch = QueryEngine::run(&Query::new().project(["n"]), &store).unwrap();
        assert_eq!(batch.entity_result_type, ResultType::Projection);
        let entity = batch.entities().next().unwrap();
        assert_eq!(entity.properties.len(), 1);
        assert!(entity.get("n").is_some());
    }

    #[test]
    fn keys_only_projection() {
        let batch = QueryEngine::run(&Query::new().project([KEY_PROPERTY]), &abc_store()).unwrap();
        assert_eq!(batch.entity_result_type, ResultType::KeysOnly);
        assert_eq!(batch.entity_results.len(), 3);
        assert!(batch.entities().all(|e| e.properties.is_empty()));
    }

    #[test]
    fn kind_filter_uses_last_path_element() {
        let mut store = abc_store();
        let parent = Key::name("Item", "a");
        store
            .put(Entity::new(parent.child("Note", 1)).with("n", 50), 0)
            .unwrap();

        let items = QueryEngine::run(&Query::new().kind("Item"), &store).unwrap();
        assert_eq!(items.entity_results.len(), 3);
        let notes = QueryEngine::run(&Query::new().kind("Note"), &store).unwrap();
        assert_eq!(notes.entity_results.len(), 1);
    }

    #[test]
    fn repeated_property_any_match() {
        let mut store = EntityStore::new();
        store
            .put(
                Entity::new(Key::name("Item", "t")).with("tags", PropertyValue::repeated([1, 2, 3])),
                0,
            )
            .unwrap();

        let hit = QueryEngine::run(&Query::new().filter(Filter::eq("tags", 2)), &store).unwrap();
        assert_eq!(hit.entity_results.len(), 1);
        let miss = QueryEngine::run(&Query::new().filter(Filter::eq("tags", 5)), &store).unwrap();
        assert!(miss.entity_results.is_empty());
    }

    #[test]
    fn null_and_unset_do_not_order_against_values() {
        let mut store = EntityStore::new();
        store.put(item("a", 10), 0).unwrap();
        store.put(item("b", Value::Null), 0).unwrap();
        store.put(Entity::new(Key::name("Item", "c")), 0).unwrap();

        let err = QueryEngine::run(&Query::new().order_by("n", Direction::Ascending), &store)
            .unwrap_err();
        assert!(matches!(err, CoreError::OrderingTypeMismatch { .. }));

        store.delete(&Key::name("Item", "b")).unwrap();
        let err = QueryEngine::run(&Query::new().order_by("n", Direction::Descending), &store)
            .unwrap_err();
        assert!(matches!(err, CoreError::OrderingTypeMismatch { .. }));
    }

    #[test]
    fn all_null_rows_order_without_error() {
        let mut store = EntityStore::new();
        store.put(item("a", Value::Null), 0).unwrap();
        store.put(Entity::new(Key::name("Item", "b")), 0).unwrap();

        let batch = QueryEngine::run(&Query::new().order_by("n", Direction::Ascending), &store)
            .unwrap();
        assert_eq!(batch.entity_results.len(), 2);
    }

    #[test]
    fn null_inside_repeated_is_a_mismatch() {
        let mut store = EntityStore::new();
        store
            .put(item("a", PropertyValue::repeated([Value::Integer(1), Value::Null])), 0)
            .unwrap();
        store.put(item("b", PropertyValue::repeated([2])), 0).unwrap();

        let err = QueryEngine::run(&Query::new().order_by("n", Direction::Ascending), &store)
            .unwrap_err();
        assert!(matches!(err, CoreError::OrderingTypeMismatch { .. }));
    }

    #[test]
    fn mixed_numbers_sort_numerically() {
        let mut store = EntityStore::new();
        store.put(item("a", 2.5), 0).unwrap();
        store.put(item("b", 1), 0).unwrap();
        store.put(item("c", 3), 0).unwrap();

        let batch = QueryEngine::run(&Query::new().order_by("n", Direction::Ascending), &store)
            .unwrap();
        assert_eq!(names(&batch), vec!["b", "a", "c"]);
    }

    #[test]
    fn repeated_values_sort_lexicographically() {
        let mut store = EntityStore::new();
        store.put(item("a", PropertyValue::repeated([1, 5])), 0).unwrap();
        store.put(item("b", PropertyValue::repeated([1])), 0).unwrap();
        store.put(item("c", PropertyValue::repeated([0, 9])), 0).unwrap();

        let batch = QueryEngine::run(&Query::new().order_by("n", Direction::Ascending), &store)
            .unwrap();
        assert_eq!(names(&batch), vec!["c", "b", "a"]);
    }

    #[test]
    fn mixed_types_fail_ordering() {
        let mut store = abc_store();
        store.put(item("s", "text"), 0).unwrap();

        let err = QueryEngine::run(&Query::new().order_by("n", Direction::Ascending), &store)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::OrderingTypeMismatch { ref property, .. } if property == "n"
        ));
    }

    #[test]
    fn single_and_repeated_do_not_mix() {
        let mut store = abc_store();
        store.put(item("r", PropertyValue::repeated([1])), 0).unwrap();

        let err = QueryEngine::run(&Query::new().order_by("n", Direction::Ascending), &store)
            .unwrap_err();
        assert!(matches!(err, CoreError::OrderingTypeMismatch { .. }));
    }

    #[test]
    fn mismatch_outside_filter_is_ignored() {
        let mut store = abc_store();
        store.put(item("s", "text"), 0).unwrap();

        let query = Query::new()
            .filter(Filter::ge("n", 0))
            .order_by("n", Direction::Ascending);
        let batch = QueryEngine::run(&query, &store).unwrap();
        assert_eq!(batch.entity_results.len(), 3);
    }

    #[test]
    fn several_order_clauses_rejected() {
        let query = Query::new()
            .order_by("n", Direction::Ascending)
            .order_by("m", Direction::Ascending);
        let err = QueryEngine::run(&query, &abc_store()).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedQuery { .. }));
    }

    #[test]
    fn unsupported_filter_rejected_on_empty_store() {
        let query = Query::new().filter(Filter::and(Vec::new()));
        let err = QueryEngine::run(&query, &EntityStore::new()).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedFilter { .. }));
    }
}
