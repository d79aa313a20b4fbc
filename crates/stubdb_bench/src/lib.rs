//! Benchmark utilities.

#![warn(missing_docs)]

use rand::Rng;
use stubdb_core::{Datastore, Entity, Key, PropertyValue};

/// Kind used by benchmark entities.
pub const BENCH_KIND: &str = "Bench";

/// Key of the `i`-th benchmark entity.
pub fn bench_key(i: usize) -> Key {
    Key::id(BENCH_KIND, i64::try_from(i).unwrap_or(i64::MAX))
}

/// Generate a random string of the specified length.
pub fn random_text(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}

/// Generate the `i`-th benchmark entity with a random score, random tags
/// and a text payload of `payload_size` characters.
pub fn random_entity(i: usize, payload_size: usize) -> Entity {
    let mut rng = rand::thread_rng();
    let tags: Vec<i64> = (0..4).map(|_| rng.gen_range(0..32)).collect();
    Entity::new(bench_key(i))
        .with("score", rng.gen_range(0..1000i64))
        .with("ratio", rng.gen::<f64>())
        .with("tags", PropertyValue::repeated(tags))
        .with("payload", random_text(payload_size))
}

/// Generate test entities with specified payload size.
pub fn generate_entities(count: usize, payload_size: usize) -> Vec<Entity> {
    (0..count).map(|i| random_entity(i, payload_size)).collect()
}

/// Creates a datastore seeded with `count` random entities.
pub fn populated_datastore(count: usize, payload_size: usize) -> Datastore {
    let ds = Datastore::new();
    for entity in generate_entities(count, payload_size) {
        ds.put(entity, 0, None).expect("Failed to seed entity");
    }
    ds
}
