//! Error types for StubDB core.

use crate::key::Key;
use crate::types::TransactionId;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in StubDB core operations.
///
/// Version conflicts are not errors. They are reported inline on
/// [`MutationResult`](crate::MutationResult) and never raised.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A mutation's precondition did not hold (insert on an existing key,
    /// update on a missing key).
    #[error("precondition violated for {key}: {message} ({applied} mutation(s) already applied)")]
    PreconditionViolation {
        /// Key targeted by the failing mutation.
        key: Key,
        /// Description of the violated precondition.
        message: String,
        /// Number of mutations of the same batch applied before the failure.
        applied: usize,
    },

    /// The transaction id does not name an open transaction.
    #[error("unknown transaction: {id}")]
    UnknownTransaction {
        /// The offending transaction id.
        id: TransactionId,
    },

    /// The store was written to after the transaction began.
    #[error(
        "generation conflict in {id}: transaction began at seq {starting_seq}, store is at seq {current_seq}"
    )]
    GenerationConflict {
        /// The transaction whose commit was rejected.
        id: TransactionId,
        /// Sequence number observed at begin.
        starting_seq: i64,
        /// Sequence number at commit time.
        current_seq: i64,
    },

    /// Rows hold values of incomparable types for the order property.
    #[error("cannot order by {property}: {left} and {right} values are not comparable")]
    OrderingTypeMismatch {
        /// Name of the order property.
        property: String,
        /// Type name of one side.
        left: &'static str,
        /// Type name of the other side.
        right: &'static str,
    },

    /// The filter tree uses a shape or operator the engine does not evaluate.
    #[error("unsupported filter: {message}")]
    UnsupportedFilter {
        /// Description of the unsupported construct.
        message: String,
    },

    /// The query uses a feature the engine does not evaluate.
    #[error("unsupported query: {message}")]
    UnsupportedQuery {
        /// Description of the unsupported construct.
        message: String,
    },

    /// A write was attempted through a read-only transaction.
    #[error("transaction {id} is read-only")]
    ReadOnlyTransaction {
        /// The read-only transaction.
        id: TransactionId,
    },

    /// The configured limit of concurrently open transactions was reached.
    #[error("too many open transactions (limit {limit})")]
    TooManyTransactions {
        /// Configured limit.
        limit: usize,
    },

    /// Key canonicalization failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a precondition violation error.
    pub fn precondition(key: Key, message: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            key,
            message: message.into(),
            applied: 0,
        }
    }

    /// Creates an unsupported filter error.
    pub fn unsupported_filter(message: impl Into<String>) -> Self {
        Self::UnsupportedFilter {
            message: message.into(),
        }
    }

    /// Creates an unsupported query error.
    pub fn unsupported_query(message: impl Into<String>) -> Self {
        Self::UnsupportedQuery {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Records how many mutations of a batch were applied before this error.
    #[must_use]
    pub(crate) fn with_applied(self, count: usize) -> Self {
        match self {
            Self::PreconditionViolation { key, message, .. } => Self::PreconditionViolation {
                key,
                message,
                applied: count,
            },
            other => other,
        }
    }

    /// Returns true if retrying the whole transaction may succeed.
    ///
    /// Only generation conflicts are caused by data contention; every other
    /// error signals caller misuse.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GenerationConflict { .. })
    }
}
