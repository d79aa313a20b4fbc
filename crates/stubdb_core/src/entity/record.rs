//! Versioned stored record.

use crate::entity::Entity;
use serde::{Deserialize, Serialize};

/// An entity together with its per-key version.
///
/// Versions start at 0 for a fresh record and advance by exactly one on
/// every successful update of the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Per-key version.
    pub version: i64,
    /// The stored entity.
    pub entity: Entity,
}

impl StoredRecord {
    /// Creates a stored record.
    #[must_use]
    pub fn new(version: i64, entity: Entity) -> Self {
        Self { version, entity }
    }

    /// Version the record will carry after its next successful write.
    #[must_use]
    pub const fn next_version(&self) -> i64 {
        self.version + 1
    }
}
