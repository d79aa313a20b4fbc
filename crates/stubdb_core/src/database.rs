//! The datastore facade.

use crate::api::{
    BeginTransactionRequest, BeginTransactionResponse, CommitRequest, CommitResponse,
    LookupRequest, LookupResponse, RollbackRequest, RollbackResponse, RunQueryRequest,
    RunQueryResponse,
};
use crate::config::Config;
use crate::entity::{Entity, EntityStore, StoredRecord};
use crate::error::{CoreError, CoreResult};
use crate::key::{Key, KeyBytes};
use crate::mutation::Mutation;
use crate::query::{EntityResult, QueryEngine};
use crate::transaction::{Transaction, TransactionManager};
use crate::types::TransactionId;
use parking_lot::Mutex;
use tracing::trace;

/// The live store together with the open-transaction table.
struct Inner {
    store: EntityStore,
    txns: TransactionManager,
}

impl Inner {
    /// The snapshot of an open transaction, else the live store.
    fn source(&self, txn: Option<TransactionId>) -> &EntityStore {
        self.txns
            .resolve(txn)
            .map_or(&self.store, Transaction::snapshot)
    }
}

/// An in-memory transactional document store.
///
/// `Datastore` is the single owner of the live data and of every open
/// transaction. All operations run under one lock, so a `Datastore` can be
/// shared between threads behind an [`Arc`](std::sync::Arc).
///
/// # Transactions
///
/// A transaction reads from a private copy of the store taken at begin and
/// stages its writes until commit. Commit fails with
/// [`CoreError::GenerationConflict`] if anything was written to the store
/// after the transaction began, even to unrelated keys.
///
/// ```rust,ignore
/// use stubdb_core::{BeginTransactionRequest, CommitRequest, Datastore, Entity, Key};
///
/// let ds = Datastore::new();
/// let txn = ds.begin_transaction(BeginTransactionRequest::default())?.transaction;
/// ds.put(Entity::new(Key::name("User", "ada")), 0, Some(txn))?;
/// ds.commit(CommitRequest::transaction(txn))?;
/// ```
///
/// # Reads with unknown transaction ids
///
/// Reads tagged with an id that names no open transaction fall back to the
/// live store. Writes with such an id fail with
/// [`CoreError::UnknownTransaction`].
pub struct Datastore {
    /// Configuration.
    config: Config,
    inner: Mutex<Inner>,
}

impl Datastore {
    /// Creates an empty datastore with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty datastore with a custom configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let txns = TransactionManager::new(&config);
        Self {
            config,
            inner: Mutex::new(Inner {
                store: EntityStore::new(),
                txns,
            }),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads the record for `key`.
    ///
    /// With an open `txn` the read comes from its snapshot and never sees
    /// writes made after begin, including the transaction's own.
    pub fn get(&self, key: &Key, txn: Option<TransactionId>) -> CoreResult<Option<StoredRecord>> {
        let inner = self.inner.lock();
        Ok(inner.source(txn).get(key)?.cloned())
    }

    /// Writes `entity`.
    ///
    /// With `txn`, stages an unconditional upsert (`version` is ignored and
    /// the snapshot is not touched). Without, writes `version` directly and
    /// advances the sequence.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownTransaction`] when staging fails, or
    /// [`CoreError::ReadOnlyTransaction`] if read-only mode is enforced.
    pub fn put(&self, entity: Entity, version: i64, txn: Option<TransactionId>) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        match txn {
            Some(id) => inner.txns.stage(id, Mutation::upsert_unchecked(entity)),
            None => {
                trace!(key = %entity.key, version, "direct put");
                inner.store.put(entity, version)
            }
        }
    }

    /// Removes `key`.
    ///
    /// With `txn`, stages a delete. Without, removes the live record if
    /// present; the sequence does not advance.
    pub fn delete(&self, key: Key, txn: Option<TransactionId>) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        match txn {
            Some(id) => inner.txns.stage(id, Mutation::delete(key)),
            None => {
                let removed = inner.store.delete(&key)?;
                trace!(key = %key, removed = removed.is_some(), "direct delete");
                Ok(())
            }
        }
    }

    /// Returns every record of the transaction snapshot or the live store.
    ///
    /// Order is unspecified.
    #[must_use]
    pub fn items(&self, txn: Option<TransactionId>) -> Vec<(KeyBytes, StoredRecord)> {
        let inner = self.inner.lock();
        inner
            .source(txn)
            .items()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    /// Returns the transaction's starting sequence, or the live sequence.
    #[must_use]
    pub fn sequence_id(&self, txn: Option<TransactionId>) -> i64 {
        self.inner.lock().source(txn).sequence_id()
    }

    /// Reads a batch of keys.
    ///
    /// Missing keys come back as key-only entities whose version is the
    /// sequence id of the store read.
    pub fn lookup(&self, request: LookupRequest) -> CoreResult<LookupResponse> {
        let inner = self.inner.lock();
        let source = inner.source(request.transaction);

        let mut found = Vec::new();
        let mut missing = Vec::new();
        for key in request.keys {
            match source.get(&key)? {
                Some(record) => found.push(EntityResult {
                    entity: record.entity.clone(),
                    version: record.version,
                }),
                None => missing.push(EntityResult {
                    entity: Entity::new(key),
                    version: source.sequence_id(),
                }),
            }
        }
        Ok(LookupResponse { found, missing })
    }

    /// Commits a transaction and/or applies mutations.
    ///
    /// See [`TransactionManager::commit`] for the protocol and error cases.
    /// Mutations are not applied atomically: on a precondition violation
    /// the mutations before it stay applied.
    pub fn commit(&self, request: CommitRequest) -> CoreResult<CommitResponse> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let mutation_results =
            inner
                .txns
                .commit(request.transaction, request.mutations, &mut inner.store)?;
        Ok(CommitResponse {
            mutation_results,
            index_updates: 0,
        })
    }

    /// Opens a transaction over a copy of the current store.
    pub fn begin_transaction(
        &self,
        request: BeginTransactionRequest,
    ) -> CoreResult<BeginTransactionResponse> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let transaction = inner.txns.begin(request.mode, &inner.store)?;
        Ok(BeginTransactionResponse { transaction })
    }

    /// Discards a transaction and everything staged in it.
    pub fn rollback(&self, request: RollbackRequest) -> CoreResult<RollbackResponse> {
        self.inner.lock().txns.rollback(request.transaction)?;
        Ok(RollbackResponse {})
    }

    /// Runs a query against a transaction snapshot or the live store.
    pub fn run_query(&self, request: RunQueryRequest) -> CoreResult<RunQueryResponse> {
        let inner = self.inner.lock();
        let batch = QueryEngine::run(&request.query, inner.source(request.transaction))?;
        Ok(RunQueryResponse { batch })
    }

    /// Seeds a fixture entity at version 0.
    ///
    /// # Errors
    ///
    /// [`CoreError::PreconditionViolation`] if the key already exists.
    pub fn insert_entity(&self, entity: Entity) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.store.contains(&entity.key)? {
            return Err(CoreError::precondition(
                entity.key,
                "fixture entity already exists",
            ));
        }
        trace!(key = %entity.key, "fixture inserted");
        inner.store.put(entity, 0)
    }

    /// Returns the number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    /// Returns `true` if there are no live records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn open_transactions(&self) -> usize {
        self.inner.lock().txns.open_count()
    }
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Datastore")
            .field("records", &inner.store.len())
            .field("sequence_id", &inner.store.sequence_id())
            .field("open_transactions", &inner.txns.open_count())
            .finish_non_exhaustive()
    }
}
