//! Request and response shapes of the [`Datastore`](crate::Datastore)
//! operations.
//!
//! These are plain serde values with no transport attached; a gRPC or HTTP
//! front end (or the `stubdb` replay tool) maps its wire format onto them.

use crate::key::Key;
use crate::mutation::{Mutation, MutationResult};
use crate::query::{EntityResult, Query, QueryResultBatch};
use crate::types::{TransactionId, TransactionMode};
use serde::{Deserialize, Serialize};

/// Reads a batch of keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Keys to read.
    pub keys: Vec<Key>,
    /// Read from this transaction's snapshot instead of the live store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionId>,
}

impl LookupRequest {
    /// Creates a non-transactional lookup.
    #[must_use]
    pub fn new(keys: Vec<Key>) -> Self {
        Self {
            keys,
            transaction: None,
        }
    }

    /// Reads from `txn`'s snapshot.
    #[must_use]
    pub fn in_transaction(mut self, txn: TransactionId) -> Self {
        self.transaction = Some(txn);
        self
    }
}

/// Result of a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    /// Entities that exist, with their stored versions.
    pub found: Vec<EntityResult>,
    /// Key-only entities for keys that do not exist. The version is the
    /// sequence id of the store that was read.
    pub missing: Vec<EntityResult>,
}

/// Commits a transaction and/or applies mutations directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommitRequest {
    /// Transaction to commit; `None` applies `mutations` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionId>,
    /// Applied after the transaction's staged mutations.
    #[serde(default)]
    pub mutations: Vec<Mutation>,
}

impl CommitRequest {
    /// Creates a non-transactional commit of `mutations`.
    #[must_use]
    pub fn new(mutations: Vec<Mutation>) -> Self {
        Self {
            transaction: None,
            mutations,
        }
    }

    /// Creates a commit of `txn` with no extra mutations.
    #[must_use]
    pub fn transaction(txn: TransactionId) -> Self {
        Self {
            transaction: Some(txn),
            mutations: Vec::new(),
        }
    }

    /// Adds a mutation.
    #[must_use]
    pub fn with(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }
}

/// Result of a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitResponse {
    /// One result per applied mutation: staged first, then supplied.
    pub mutation_results: Vec<MutationResult>,
    /// Always 0; no indexes are maintained.
    pub index_updates: u32,
}

/// Opens a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BeginTransactionRequest {
    /// Access mode.
    #[serde(default)]
    pub mode: TransactionMode,
}

impl BeginTransactionRequest {
    /// Requests a read-only transaction.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            mode: TransactionMode::ReadOnly,
        }
    }

    /// Requests a read-write transaction.
    #[must_use]
    pub const fn read_write() -> Self {
        Self {
            mode: TransactionMode::ReadWrite,
        }
    }
}

/// The opened transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginTransactionResponse {
    /// Id to pass to later requests.
    pub transaction: TransactionId,
}

/// Discards a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRequest {
    /// Transaction to discard.
    pub transaction: TransactionId,
}

/// Empty acknowledgement of a rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RollbackResponse {}

/// Runs a query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunQueryRequest {
    /// The query.
    pub query: Query,
    /// Read from this transaction's snapshot instead of the live store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionId>,
}

impl RunQueryRequest {
    /// Creates a non-transactional query request.
    #[must_use]
    pub fn new(query: Query) -> Self {
        Self {
            query,
            transaction: None,
        }
    }

    /// Runs against `txn`'s snapshot.
    #[must_use]
    pub fn in_transaction(mut self, txn: TransactionId) -> Self {
        self.transaction = Some(txn);
        self
    }
}

/// Query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunQueryResponse {
    /// The single result batch.
    pub batch: QueryResultBatch,
}
