//! Transaction state.

use crate::entity::EntityStore;
use crate::mutation::Mutation;
use crate::types::{TransactionId, TransactionMode};

/// An open transaction.
///
/// Owns a private snapshot of the store and the ordered list of mutations
/// staged against it. A transaction is consumed exactly once, by commit or
/// rollback.
#[derive(Debug)]
pub struct Transaction {
    /// Transaction ID.
    id: TransactionId,
    /// Requested access mode.
    mode: TransactionMode,
    /// Live sequence number observed at begin.
    starting_seq: i64,
    /// Deep copy of the live store taken at begin.
    snapshot: EntityStore,
    /// Mutations in staging order.
    staged: Vec<Mutation>,
}

impl Transaction {
    /// Creates a transaction over `snapshot`.
    pub(crate) fn new(id: TransactionId, mode: TransactionMode, snapshot: EntityStore) -> Self {
        Self {
            id,
            mode,
            starting_seq: snapshot.sequence_id(),
            snapshot,
            staged: Vec::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the access mode.
    #[must_use]
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Returns the live sequence number observed at begin.
    #[must_use]
    pub fn starting_seq(&self) -> i64 {
        self.starting_seq
    }

    /// Returns the snapshot this transaction reads from.
    #[must_use]
    pub fn snapshot(&self) -> &EntityStore {
        &self.snapshot
    }

    /// Appends a mutation to the staged list.
    ///
    /// The snapshot is not touched.
    pub(crate) fn stage(&mut self, mutation: Mutation) {
        self.staged.push(mutation);
    }

    /// Returns the staged mutations in staging order.
    #[must_use]
    pub fn staged(&self) -> &[Mutation] {
        &self.staged
    }

    /// Consumes the transaction, yielding its staged mutations.
    pub(crate) fn into_staged(self) -> Vec<Mutation> {
        self.staged
    }
}
