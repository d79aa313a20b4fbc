//! Datastore configuration.

/// Configuration for a [`Datastore`](crate::Datastore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of concurrently open transactions.
    ///
    /// Every open transaction holds a full copy of the store.
    pub max_open_transactions: usize,

    /// Whether writes through a read-only transaction are rejected.
    ///
    /// Off by default: the mode is then advisory and a read-only
    /// transaction stages and commits writes like a read-write one.
    pub enforce_read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_open_transactions: usize::MAX,
            enforce_read_only: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of concurrently open transactions.
    #[must_use]
    pub const fn max_open_transactions(mut self, limit: usize) -> Self {
        self.max_open_transactions = limit;
        self
    }

    /// Sets whether read-only transactions reject writes.
    #[must_use]
    pub const fn enforce_read_only(mut self, value: bool) -> Self {
        self.enforce_read_only = value;
        self
    }
}
