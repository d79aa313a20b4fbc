//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys, values, entities and
//! mutations. Key strategies draw from small pools so that generated
//! operations collide often enough to exercise versioning.

use proptest::prelude::*;
use stubdb_core::{Entity, Key, KeyId, Mutation, PathElement, PropertyValue, Value};

/// Strategy for generating kind names.
pub fn kind_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["Item", "User", "Post"]).prop_map(String::from)
}

/// Strategy for generating key ids, numeric or named.
pub fn key_id_strategy() -> impl Strategy<Value = KeyId> {
    prop_oneof![
        (-4i64..16).prop_map(KeyId::Id),
        prop::string::string_regex("[a-z]{1,6}")
            .expect("Invalid regex")
            .prop_map(KeyId::Name),
    ]
}

/// Strategy for generating keys with up to three path elements and an
/// optional namespace.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    (
        prop::option::of(prop::sample::select(vec!["", "tenant-a", "tenant-b"])),
        prop::collection::vec((kind_strategy(), key_id_strategy()), 1..=3),
    )
        .prop_map(|(namespace, path)| Key {
            namespace: namespace.map(String::from),
            path: path
                .into_iter()
                .map(|(kind, id)| PathElement { kind, id })
                .collect(),
        })
}

/// Strategy for generating keys from a small fixed pool.
///
/// Operations on these keys collide frequently.
pub fn pooled_key_strategy(pool: usize) -> impl Strategy<Value = Key> {
    let max = i64::try_from(pool.max(1)).unwrap_or(i64::MAX);
    (0..max).prop_map(|i| Key::id("Item", i))
}

/// Strategy for generating non-repeated values.
///
/// Doubles are finite; NaN breaks equality-based assertions.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Boolean),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Double),
        prop::string::string_regex("[a-zA-Z0-9 ]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::String),
        pooled_key_strategy(4).prop_map(Value::Key),
    ]
}

/// Strategy for generating property values.
pub fn property_value_strategy() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        3 => value_strategy().prop_map(PropertyValue::Single),
        1 => prop::collection::vec(value_strategy(), 0..4).prop_map(PropertyValue::Repeated),
    ]
}

/// Strategy for generating an entity under `key`.
pub fn entity_with_key_strategy(key: Key) -> impl Strategy<Value = Entity> {
    prop::collection::btree_map(
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
        property_value_strategy(),
        0..5,
    )
    .prop_map(move |properties| Entity {
        key: key.clone(),
        properties,
    })
}

/// Strategy for generating entities with arbitrary keys.
pub fn entity_strategy() -> impl Strategy<Value = Entity> {
    key_strategy().prop_flat_map(entity_with_key_strategy)
}

/// Strategy for generating entities keyed from a pool of `pool` keys.
pub fn pooled_entity_strategy(pool: usize) -> impl Strategy<Value = Entity> {
    pooled_key_strategy(pool).prop_flat_map(entity_with_key_strategy)
}

/// Strategy for generating mutations over a pool of `pool` keys.
///
/// Base versions are small so that both matches and conflicts occur.
pub fn mutation_strategy(pool: usize) -> impl Strategy<Value = Mutation> {
    let base = || prop::option::of(0i64..4);
    prop_oneof![
        2 => pooled_entity_strategy(pool).prop_map(Mutation::Insert),
        2 => (pooled_entity_strategy(pool), base())
            .prop_map(|(entity, base_version)| Mutation::Update { entity, base_version }),
        3 => (pooled_entity_strategy(pool), base())
            .prop_map(|(entity, base_version)| Mutation::Upsert { entity, base_version }),
        1 => pooled_key_strategy(pool).prop_map(Mutation::Delete),
    ]
}

/// Strategy for generating a sequence of mutations.
pub fn mutation_sequence_strategy(
    pool: usize,
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<Mutation>> {
    prop::collection::vec(mutation_strategy(pool), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
