//! Live entity map with its global write sequence.

use crate::entity::{Entity, StoredRecord};
use crate::error::CoreResult;
use crate::key::{Key, KeyBytes};
use std::collections::HashMap;

/// Key→record map plus the global sequence counter.
///
/// The live store and every transaction snapshot are both `EntityStore`s;
/// a snapshot is a deep [`Clone`] and shares nothing with the live map.
///
/// `seq` advances by one on every [`put`](Self::put) and is reported as
/// the snapshot version of queries. Deletes leave it untouched.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    /// Records keyed by canonical key bytes.
    records: HashMap<KeyBytes, StoredRecord>,
    /// Global write sequence.
    seq: i64,
}

impl EntityStore {
    /// Creates an empty store at sequence 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the record stored under `key`.
    pub fn get(&self, key: &Key) -> CoreResult<Option<&StoredRecord>> {
        let key_bytes = key.to_bytes()?;
        Ok(self.records.get(&key_bytes))
    }

    /// Checks if a record exists for `key`.
    pub fn contains(&self, key: &Key) -> CoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Writes `entity` at `version`, replacing any existing record, and
    /// advances the sequence.
    pub fn put(&mut self, entity: Entity, version: i64) -> CoreResult<()> {
        let key_bytes = entity.key.to_bytes()?;
        self.records
            .insert(key_bytes, StoredRecord::new(version, entity));
        self.seq += 1;
        Ok(())
    }

    /// Removes the record for `key`, returning it if present.
    pub fn delete(&mut self, key: &Key) -> CoreResult<Option<StoredRecord>> {
        let key_bytes = key.to_bytes()?;
        Ok(self.records.remove(&key_bytes))
    }

    /// Iterates over all records in unspecified order.
    pub fn items(&self) -> impl Iterator<Item = (&KeyBytes, &StoredRecord)> {
        self.records.iter()
    }

    /// Returns the current sequence number.
    #[must_use]
    pub fn sequence_id(&self) -> i64 {
        self.seq
    }

    /// Returns a deep copy suitable for a transaction snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str) -> Entity {
        Entity::new(Key::name("Item", name)).with("n", 1)
    }

    #[test]
    fn put_and_get() {
        let mut store = EntityStore::new();
        store.put(entity("a"), 0).unwrap();

        let record = store.get(&Key::name("Item", "a")).unwrap().unwrap();
        assert_eq!(record.version, 0);
        assert_eq!(record.entity, entity("a"));
        assert!(store.get(&Key::name("Item", "b")).unwrap().is_none());
    }

    #[test]
    fn put_advances_sequence() {
        let mut store = EntityStore::new();
        assert_eq!(store.sequence_id(), 0);
        store.put(entity("a"), 0).unwrap();
        store.put(entity("a"), 1).unwrap();
        assert_eq!(store.sequence_id(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_keeps_sequence() {
        let mut store = EntityStore::new();
        store.put(entity("a"), 0).unwrap();

        let removed = store.delete(&Key::name("Item", "a")).unwrap();
        assert!(removed.is_some());
        assert!(store.is_empty());
        assert_eq!(store.sequence_id(), 1);

        assert!(store.delete(&Key::name("Item", "a")).unwrap().is_none());
    }

    #[test]
    fn snapshot_is_isolated() {
        let mut store = EntityStore::new();
        store.put(entity("a"), 0).unwrap();

        let snapshot = store.snapshot();
        store.put(entity("b"), 0).unwrap();
        store.delete(&Key::name("Item", "a")).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&Key::name("Item", "a")).unwrap());
        assert_eq!(snapshot.sequence_id(), 1);
    }

    #[test]
    fn items_yields_every_record() {
        let mut store = EntityStore::new();
        for name in ["a", "b", "c"] {
            store.put(entity(name), 0).unwrap();
        }
        assert_eq!(store.items().count(), 3);
    }
}
