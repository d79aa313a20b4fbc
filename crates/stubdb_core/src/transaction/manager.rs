//! Transaction manager.

use crate::config::Config;
use crate::entity::EntityStore;
use crate::error::{CoreError, CoreResult};
use crate::mutation::{Mutation, MutationApplier, MutationResult};
use crate::transaction::state::Transaction;
use crate::types::{TransactionId, TransactionMode};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Owns the table of open transactions.
///
/// The manager never holds the live store; callers pass it in for begin
/// (to snapshot) and commit (to apply). Serializing those calls is the
/// caller's job; [`Datastore`](crate::Datastore) does it with one lock.
///
/// ## Commit protocol
///
/// 1. Remove the transaction from the table (it never survives commit)
/// 2. Reject if the live sequence moved since begin
/// 3. Apply staged mutations in staging order
/// 4. Apply mutations supplied with the commit
pub struct TransactionManager {
    /// Open transactions by id.
    open: HashMap<TransactionId, Transaction>,
    /// Limit on `open.len()`.
    max_open: usize,
    /// Whether read-only transactions reject writes.
    enforce_read_only: bool,
}

impl TransactionManager {
    /// Creates a manager with no open transactions.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            open: HashMap::new(),
            max_open: config.max_open_transactions,
            enforce_read_only: config.enforce_read_only,
        }
    }

    /// Begins a transaction over a deep copy of `store`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TooManyTransactions`] if the configured limit of
    /// open transactions is reached.
    pub fn begin(&mut self, mode: TransactionMode, store: &EntityStore) -> CoreResult<TransactionId> {
        if self.open.len() >= self.max_open {
            return Err(CoreError::TooManyTransactions {
                limit: self.max_open,
            });
        }

        let id = TransactionId::new();
        let txn = Transaction::new(id, mode, store.snapshot());
        debug!(
            txn = %id,
            ?mode,
            starting_seq = txn.starting_seq(),
            records = store.len(),
            "transaction started"
        );
        self.open.insert(id, txn);
        Ok(id)
    }

    /// Returns the open transaction named by `id`, if any.
    #[must_use]
    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.open.get(&id)
    }

    /// Resolves an optional id to an open transaction.
    ///
    /// Ids that name no open transaction resolve to `None`.
    #[must_use]
    pub fn resolve(&self, id: Option<TransactionId>) -> Option<&Transaction> {
        id.and_then(|id| self.get(id))
    }

    /// Stages a mutation against an open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownTransaction`] if `id` is not open, or
    /// [`CoreError::ReadOnlyTransaction`] for a read-only transaction when
    /// `Config::enforce_read_only` is set.
    pub fn stage(&mut self, id: TransactionId, mutation: Mutation) -> CoreResult<()> {
        let enforce_read_only = self.enforce_read_only;
        let txn = self
            .open
            .get_mut(&id)
            .ok_or(CoreError::UnknownTransaction { id })?;
        if enforce_read_only && txn.mode().is_read_only() {
            return Err(CoreError::ReadOnlyTransaction { id });
        }
        txn.stage(mutation);
        Ok(())
    }

    /// Commits a transaction and applies `extra` mutations.
    ///
    /// With `id == None` only `extra` is applied. Results are those of the
    /// staged mutations followed by those of `extra`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::UnknownTransaction`] if `id` is not open
    /// - [`CoreError::GenerationConflict`] if the store was written since
    ///   begin; nothing is applied
    /// - [`CoreError::ReadOnlyTransaction`] when writing through a read-only
    ///   transaction with enforcement on; nothing is applied
    /// - [`CoreError::PreconditionViolation`] from the first failing
    ///   mutation; earlier mutations stay applied
    pub fn commit(
        &mut self,
        id: Option<TransactionId>,
        extra: Vec<Mutation>,
        store: &mut EntityStore,
    ) -> CoreResult<Vec<MutationResult>> {
        let staged = match id {
            None => Vec::new(),
            Some(id) => self.take_validated(id, !extra.is_empty(), store)?,
        };

        let staged_count = staged.len();
        let extra_count = extra.len();
        let results =
            MutationApplier::apply_all(store, staged.into_iter().chain(extra)).inspect_err(|e| {
                warn!(txn = ?id, error = %e, "commit aborted mid-batch");
            })?;

        debug!(
            txn = ?id,
            staged = staged_count,
            extra = extra_count,
            conflicts = results.iter().filter(|r| r.conflict_detected).count(),
            seq = store.sequence_id(),
            "commit applied"
        );
        Ok(results)
    }

    /// Removes `id` from the table and checks it may commit.
    fn take_validated(
        &mut self,
        id: TransactionId,
        has_extra: bool,
        store: &EntityStore,
    ) -> CoreResult<Vec<Mutation>> {
        let txn = self
            .open
            .remove(&id)
            .ok_or(CoreError::UnknownTransaction { id })?;

        // Whole-store check: any direct write since begin aborts, even one
        // to a key this transaction never touched.
        if store.sequence_id() != txn.starting_seq() {
            warn!(
                txn = %id,
                starting_seq = txn.starting_seq(),
                current_seq = store.sequence_id(),
                "generation conflict"
            );
            return Err(CoreError::GenerationConflict {
                id,
                starting_seq: txn.starting_seq(),
                current_seq: store.sequence_id(),
            });
        }

        if self.enforce_read_only
            && txn.mode().is_read_only()
            && (has_extra || !txn.staged().is_empty())
        {
            return Err(CoreError::ReadOnlyTransaction { id });
        }

        Ok(txn.into_staged())
    }

    /// Discards a transaction and everything staged in it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownTransaction`] if `id` is not open.
    pub fn rollback(&mut self, id: TransactionId) -> CoreResult<()> {
        let txn = self
            .open
            .remove(&id)
            .ok_or(CoreError::UnknownTransaction { id })?;
        debug!(txn = %id, discarded = txn.staged().len(), "transaction rolled back");
        Ok(())
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("open_count", &self.open_count())
            .field("max_open", &self.max_open)
            .finish_non_exhaustive()
    }
}
