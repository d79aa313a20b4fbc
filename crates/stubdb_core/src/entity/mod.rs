//! Entity types and storage.

mod record;
mod store;

pub use record::StoredRecord;
pub use store::EntityStore;

use crate::key::Key;
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A keyed bag of typed properties: the unit of storage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    /// The entity's key.
    pub key: Key,
    /// Properties by name.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Entity {
    /// Creates an entity with no properties.
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    /// Sets a property, consuming and returning the entity.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Sets a property in place, returning the previous value.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.properties.insert(name.into(), value.into())
    }

    /// Returns a property by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Returns a copy holding only the key.
    #[must_use]
    pub fn key_only(&self) -> Self {
        Self::new(self.key.clone())
    }

    /// Returns a copy holding the key and only the named properties.
    #[must_use]
    pub fn project(&self, names: &[String]) -> Self {
        let properties = self
            .properties
            .iter()
            .filter(|(name, _)| names.iter().any(|n| n == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            key: self.key.clone(),
            properties,
        }
    }
}
