//! # StubDB Core
//!
//! In-memory transactional document store for tests.
//!
//! This crate provides:
//! - Hierarchical keys with a canonical byte form
//! - Versioned entity storage with a global write sequence
//! - Snapshot transactions with whole-store optimistic concurrency
//! - Insert, update, upsert and delete mutations with version checks
//! - Filtered, ordered and projected queries
//!
//! Everything lives in memory and is lost when the [`Datastore`] is dropped.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod config;
mod database;
mod entity;
mod error;
mod key;
mod mutation;
mod query;
mod transaction;
mod types;
mod value;

pub use api::{
    BeginTransactionRequest, BeginTransactionResponse, CommitRequest, CommitResponse,
    LookupRequest, LookupResponse, RollbackRequest, RollbackResponse, RunQueryRequest,
    RunQueryResponse,
};
pub use config::Config;
pub use database::Datastore;
pub use entity::{Entity, EntityStore, StoredRecord};
pub use error::{CoreError, CoreResult};
pub use key::{Key, KeyBytes, KeyId, PathElement};
pub use mutation::{Mutation, MutationApplier, MutationResult};
pub use query::{
    CompositeFilter, CompositeOperator, Direction, EntityResult, Filter, Operator,
    PropertyFilter, PropertyOrder, Query, QueryEngine, QueryResultBatch, ResultType,
    KEY_PROPERTY,
};
pub use transaction::{Transaction, TransactionManager};
pub use types::{TransactionId, TransactionMode};
pub use value::{PropertyValue, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
