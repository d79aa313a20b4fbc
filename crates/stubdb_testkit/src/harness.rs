//! Model-checking harness.
//!
//! Drives a [`Datastore`] and a straightforward reference model side by
//! side and checks that every mutation result and every stored record
//! agree.

use std::collections::HashMap;
use stubdb_core::{CommitRequest, CoreError, Datastore, Entity, Key, Mutation};

/// Outcome the reference model predicts for one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Applied (or a no-op delete) reporting `version`.
    Applied {
        /// Reported version.
        version: i64,
    },
    /// Rejected with a version conflict reporting the current version.
    Conflict {
        /// Current stored version.
        version: i64,
    },
    /// Rejected with a precondition violation.
    Violation,
}

/// Reference model of the live store: key → (version, entity).
#[derive(Debug, Default, Clone)]
pub struct ReferenceModel {
    records: HashMap<Key, (i64, Entity)>,
}

impl ReferenceModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `mutation` to the model and returns the predicted outcome.
    pub fn apply(&mut self, mutation: &Mutation) -> Expected {
        let current = self.records.get(mutation.key()).map(|(v, _)| *v);
        match (mutation, current) {
            (Mutation::Insert(_), Some(_)) | (Mutation::Update { .. }, None) => {
                Expected::Violation
            }
            (Mutation::Insert(entity), None) => self.write(entity, 0),
            (
                Mutation::Update { entity, base_version } | Mutation::Upsert { entity, base_version },
                Some(version),
            ) => match base_version {
                Some(base) if *base != version => Expected::Conflict { version },
                _ => self.write(entity, version + 1),
            },
            (Mutation::Upsert { entity, .. }, None) => self.write(entity, 0),
            (Mutation::Delete(key), current) => {
                self.records.remove(key);
                Expected::Applied {
                    version: current.map_or(0, |v| v + 1),
                }
            }
        }
    }

    fn write(&mut self, entity: &Entity, version: i64) -> Expected {
        self.records
            .insert(entity.key.clone(), (version, entity.clone()));
        Expected::Applied { version }
    }

    /// Returns the modeled version of `key`.
    pub fn version(&self, key: &Key) -> Option<i64> {
        self.records.get(key).map(|(v, _)| *v)
    }

    /// Returns the number of modeled records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the model holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A datastore paired with its reference model.
pub struct ModelHarness {
    /// The datastore under test.
    pub ds: Datastore,
    /// The reference model.
    pub model: ReferenceModel,
}

impl ModelHarness {
    /// Creates a harness over an empty datastore.
    pub fn new() -> Self {
        Self {
            ds: Datastore::new(),
            model: ReferenceModel::new(),
        }
    }

    /// Commits one mutation and asserts the outcome matches the model.
    pub fn apply_and_check(&mut self, mutation: Mutation) -> Expected {
        let expected = self.model.apply(&mutation);
        let key = mutation.key().clone();
        let outcome = self.ds.commit(CommitRequest::new(vec![mutation]));

        match (expected, outcome) {
            (Expected::Applied { version }, Ok(response)) => {
                let result = &response.mutation_results[0];
                assert_eq!(result.key, key);
                assert_eq!(result.version, version, "version mismatch for {key}");
                assert!(!result.conflict_detected, "unexpected conflict for {key}");
            }
            (Expected::Conflict { version }, Ok(response)) => {
                let result = &response.mutation_results[0];
                assert_eq!(result.version, version, "conflict version mismatch for {key}");
                assert!(result.conflict_detected, "missing conflict for {key}");
            }
            (Expected::Violation, Err(CoreError::PreconditionViolation { key: got, .. })) => {
                assert_eq!(got, key);
            }
            (expected, actual) => {
                panic!("model expected {expected:?} for {key}, datastore returned {actual:?}")
            }
        }
        expected
    }

    /// Asserts every modeled record is stored with the modeled version and
    /// entity, and nothing else is stored.
    pub fn verify(&self) {
        assert_eq!(self.ds.len(), self.model.len(), "record count mismatch");
        for (key, (version, entity)) in &self.model.records {
            let record = self
                .ds
                .get(key, None)
                .expect("Failed to read key")
                .unwrap_or_else(|| panic!("{key} missing from datastore"));
            assert_eq!(record.version, *version, "version mismatch for {key}");
            assert_eq!(&record.entity, entity, "entity mismatch for {key}");
        }
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}
