//! Queries over the whole dataset.
//!
//! A query is evaluated as a straight scan: kind filter, predicate filter,
//! at most one sort clause, limit, then projection. There are no indexes.
//!
//! ```rust,ignore
//! use stubdb_core::{Direction, Filter, Query};
//!
//! let query = Query::new()
//!     .kind("Item")
//!     .filter(Filter::ge("n", 20))
//!     .order_by("n", Direction::Ascending)
//!     .limit(1);
//! ```

mod engine;
mod filter;

pub use engine::QueryEngine;
pub use filter::{CompositeFilter, CompositeOperator, Filter, Operator, PropertyFilter};

use crate::entity::Entity;
use serde::{Deserialize, Serialize};

/// Projection marker requesting key-only results.
pub const KEY_PROPERTY: &str = "__key__";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// A sort clause on one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOrder {
    /// Property to sort by.
    pub property: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: Direction,
}

/// A scan over the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    /// Only entities whose key's final element has this kind.
    pub kind: Option<String>,
    /// Predicate; `None` matches everything.
    pub filter: Option<Filter>,
    /// Sort clauses; at most one is supported.
    pub order: Vec<PropertyOrder>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Property names to return; empty returns full entities.
    pub projection: Vec<String>,
}

impl Query {
    /// Creates a query matching every entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to one kind.
    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the predicate.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Adds a sort clause.
    #[must_use]
    pub fn order_by(mut self, property: impl Into<String>, direction: Direction) -> Self {
        self.order.push(PropertyOrder {
            property: property.into(),
            direction,
        });
        self
    }

    /// Sets the result limit.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the projected property names.
    #[must_use]
    pub fn project<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = names.into_iter().map(Into::into).collect();
        self
    }

    /// Requests key-only results.
    #[must_use]
    pub fn keys_only(self) -> Self {
        self.project([KEY_PROPERTY])
    }

    /// Returns the result shape this query produces.
    #[must_use]
    pub fn result_type(&self) -> ResultType {
        match self.projection.as_slice() {
            [] => ResultType::Full,
            [only] if only == KEY_PROPERTY => ResultType::KeysOnly,
            _ => ResultType::Projection,
        }
    }
}

/// Shape of the entities in a result batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// Complete entities.
    Full,
    /// Keys only, no properties.
    KeysOnly,
    /// Keys plus the projected properties.
    Projection,
}

/// An entity (or a projection of one) with its stored version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityResult {
    /// The entity, possibly restricted by projection.
    pub entity: Entity,
    /// The record's version, or a placeholder for missing lookups.
    pub version: i64,
}

/// Results of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResultBatch {
    /// Shape of `entity_results`.
    pub entity_result_type: ResultType,
    /// Matching entities in result order.
    pub entity_results: Vec<EntityResult>,
    /// Sequence id of the store (or snapshot) that was read.
    pub snapshot_version: i64,
}

impl QueryResultBatch {
    /// Iterates over the result entities.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entity_results.iter().map(|r| &r.entity)
    }
}
