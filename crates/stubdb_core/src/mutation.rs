//! Mutations and their application to the live store.

use crate::entity::{Entity, EntityStore};
use crate::error::{CoreError, CoreResult};
use crate::key::Key;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A single write request.
///
/// `base_version` enables conflict detection: when set, the write only
/// happens if the stored version still equals it. `None` writes
/// unconditionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    /// Create an entity that must not exist yet.
    Insert(Entity),
    /// Replace an entity that must already exist.
    Update {
        /// Replacement entity.
        entity: Entity,
        /// Expected current version.
        #[serde(default)]
        base_version: Option<i64>,
    },
    /// Create or replace an entity.
    Upsert {
        /// Entity to write.
        entity: Entity,
        /// Expected current version, if the entity exists.
        #[serde(default)]
        base_version: Option<i64>,
    },
    /// Remove an entity if present.
    Delete(Key),
}

impl Mutation {
    /// Creates an insert mutation.
    #[must_use]
    pub fn insert(entity: Entity) -> Self {
        Mutation::Insert(entity)
    }

    /// Creates an update guarded by `base_version`.
    #[must_use]
    pub fn update(entity: Entity, base_version: i64) -> Self {
        Mutation::Update {
            entity,
            base_version: Some(base_version),
        }
    }

    /// Creates an upsert guarded by `base_version`.
    #[must_use]
    pub fn upsert(entity: Entity, base_version: i64) -> Self {
        Mutation::Upsert {
            entity,
            base_version: Some(base_version),
        }
    }

    /// Creates an upsert without conflict detection.
    #[must_use]
    pub fn upsert_unchecked(entity: Entity) -> Self {
        Mutation::Upsert {
            entity,
            base_version: None,
        }
    }

    /// Creates a delete mutation.
    #[must_use]
    pub fn delete(key: Key) -> Self {
        Mutation::Delete(key)
    }

    /// Returns the key targeted by this mutation.
    #[must_use]
    pub fn key(&self) -> &Key {
        match self {
            Mutation::Insert(entity)
            | Mutation::Update { entity, .. }
            | Mutation::Upsert { entity, .. } => &entity.key,
            Mutation::Delete(key) => key,
        }
    }

    /// Returns a short name for the variant.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Mutation::Insert(_) => "insert",
            Mutation::Update { .. } => "update",
            Mutation::Upsert { .. } => "upsert",
            Mutation::Delete(_) => "delete",
        }
    }
}

/// Outcome of applying one mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    /// Key the mutation targeted.
    pub key: Key,
    /// New version on success; the current stored version on conflict.
    pub version: i64,
    /// True if `base_version` did not match and nothing was written.
    pub conflict_detected: bool,
}

impl MutationResult {
    fn applied(key: Key, version: i64) -> Self {
        Self {
            key,
            version,
            conflict_detected: false,
        }
    }

    fn conflict(key: Key, current_version: i64) -> Self {
        Self {
            key,
            version: current_version,
            conflict_detected: true,
        }
    }
}

/// Applies mutations to the live store.
///
/// Stateless; it borrows the store only for the duration of one call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationApplier;

impl MutationApplier {
    /// Applies a single mutation.
    ///
    /// Version conflicts are returned as results with
    /// `conflict_detected = true` and leave the store untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PreconditionViolation`] for an insert on an
    /// existing key or an update on a missing key.
    pub fn apply(store: &mut EntityStore, mutation: Mutation) -> CoreResult<MutationResult> {
        let current = store.get(mutation.key())?.map(|record| record.version);
        trace!(
            op = mutation.kind_name(),
            key = %mutation.key(),
            current_version = ?current,
            "applying mutation"
        );

        match mutation {
            Mutation::Insert(entity) => {
                if current.is_some() {
                    return Err(CoreError::precondition(
                        entity.key,
                        "insert target already exists",
                    ));
                }
                let key = entity.key.clone();
                store.put(entity, 0)?;
                Ok(MutationResult::applied(key, 0))
            }
            Mutation::Update {
                entity,
                base_version,
            } => {
                let Some(existing) = current else {
                    return Err(CoreError::precondition(
                        entity.key,
                        "update target does not exist",
                    ));
                };
                if base_version.is_some_and(|base| base != existing) {
                    return Ok(MutationResult::conflict(entity.key, existing));
                }
                let key = entity.key.clone();
                store.put(entity, existing + 1)?;
                Ok(MutationResult::applied(key, existing + 1))
            }
            Mutation::Upsert {
                entity,
                base_version,
            } => {
                if let (Some(existing), Some(base)) = (current, base_version) {
                    if existing != base {
                        return Ok(MutationResult::conflict(entity.key, existing));
                    }
                }
                let version = current.map_or(0, |v| v + 1);
                let key = entity.key.clone();
                store.put(entity, version)?;
                Ok(MutationResult::applied(key, version))
            }
            Mutation::Delete(key) => {
                let version = current.map_or(0, |v| v + 1);
                store.delete(&key)?;
                Ok(MutationResult::applied(key, version))
            }
        }
    }

    /// Applies mutations in order, stopping at the first error.
    ///
    /// Mutations applied before a failing one stay applied; the error's
    /// `applied` count says how many.
    pub fn apply_all<I>(store: &mut EntityStore, mutations: I) -> CoreResult<Vec<MutationResult>>
    where
        I: IntoIterator<Item = Mutation>,
    {
        let mut results = Vec::new();
        for mutation in mutations {
            let result = Self::apply(store, mutation).map_err(|e| e.with_applied(results.len()))?;
            results.push(result);
        }
        Ok(results)
    }
}
