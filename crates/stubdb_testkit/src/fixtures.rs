//! Test fixtures and datastore helpers.
//!
//! Provides convenience functions for setting up test datastores
//! and common test scenarios.

use stubdb_core::{
    BeginTransactionRequest, CommitRequest, Config, Datastore, Entity, Key, Mutation,
    MutationResult, RollbackRequest, StoredRecord, TransactionId,
};

/// A test datastore with shorthand helpers.
pub struct TestDatastore {
    /// The datastore instance.
    pub ds: Datastore,
}

impl TestDatastore {
    /// Creates an empty datastore with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty datastore with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            ds: Datastore::with_config(config),
        }
    }

    /// Seeds fixture entities at version 0.
    pub fn seed<I>(&self, entities: I)
    where
        I: IntoIterator<Item = Entity>,
    {
        for entity in entities {
            self.ds
                .insert_entity(entity)
                .expect("Failed to seed entity");
        }
    }

    /// Begins a read-write transaction.
    pub fn begin(&self) -> TransactionId {
        self.ds
            .begin_transaction(BeginTransactionRequest::read_write())
            .expect("Failed to begin transaction")
            .transaction
    }

    /// Commits `txn` with no extra mutations.
    pub fn commit_txn(&self, txn: TransactionId) -> Vec<MutationResult> {
        self.ds
            .commit(CommitRequest::transaction(txn))
            .expect("Failed to commit transaction")
            .mutation_results
    }

    /// Applies mutations outside any transaction.
    pub fn apply(&self, mutations: Vec<Mutation>) -> Vec<MutationResult> {
        self.ds
            .commit(CommitRequest::new(mutations))
            .expect("Failed to apply mutations")
            .mutation_results
    }

    /// Rolls back `txn`.
    pub fn rollback(&self, txn: TransactionId) {
        self.ds
            .rollback(RollbackRequest { transaction: txn })
            .expect("Failed to roll back transaction");
    }

    /// Reads `key` from the live store.
    pub fn record(&self, key: &Key) -> Option<StoredRecord> {
        self.ds.get(key, None).expect("Failed to read key")
    }

    /// Returns the stored version of `key`, if present.
    pub fn version(&self, key: &Key) -> Option<i64> {
        self.record(key).map(|r| r.version)
    }
}

impl Default for TestDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestDatastore {
    type Target = Datastore;

    fn deref(&self) -> &Self::Target {
        &self.ds
    }
}

/// Runs a test with a fresh datastore.
///
/// # Example
///
/// ```rust,ignore
/// use stubdb_testkit::with_datastore;
///
/// #[test]
/// fn my_test() {
///     with_datastore(|ds| {
///         assert!(ds.is_empty());
///     });
/// }
/// ```
pub fn with_datastore<F, R>(f: F) -> R
where
    F: FnOnce(&Datastore) -> R,
{
    let test_ds = TestDatastore::new();
    f(&test_ds.ds)
}

/// Runs a test with a fresh datastore built from `config`.
pub fn with_datastore_config<F, R>(config: Config, f: F) -> R
where
    F: FnOnce(&Datastore) -> R,
{
    let test_ds = TestDatastore::with_config(config);
    f(&test_ds.ds)
}

/// Parses a JSON array of entities.
///
/// Handy for fixtures kept next to tests as text.
pub fn entities_from_json(json: &str) -> Vec<Entity> {
    serde_json::from_str(json).expect("Invalid entity fixture JSON")
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use stubdb_core::PropertyValue;

    /// Kind used by the scenario entities.
    pub const ITEM_KIND: &str = "Item";

    /// Key of a scenario item.
    pub fn item_key(name: &str) -> Key {
        Key::name(ITEM_KIND, name)
    }

    /// An item with one integer property `n`.
    pub fn item(name: &str, n: i64) -> Entity {
        Entity::new(item_key(name)).with("n", n)
    }

    /// Items `a`, `b`, `c` with `n` = 10, 20, 30.
    pub fn abc_datastore() -> TestDatastore {
        let test_ds = TestDatastore::new();
        test_ds.seed([item("a", 10), item("b", 20), item("c", 30)]);
        test_ds
    }

    /// `count` items named `item-<i>` with `n = i`.
    pub fn numbered_datastore(count: usize) -> TestDatastore {
        let test_ds = TestDatastore::new();
        test_ds.seed((0..count).map(|i| {
            let n = i64::try_from(i).expect("count fits in i64");
            item(&format!("item-{i}"), n)
        }));
        test_ds
    }

    /// One item `t` with repeated `tags = [1, 2, 3]`.
    pub fn tagged_datastore() -> TestDatastore {
        let test_ds = TestDatastore::new();
        test_ds.seed([Entity::new(item_key("t")).with("tags", PropertyValue::repeated([1, 2, 3]))]);
        test_ds
    }

    /// A user with two child posts, plus an unrelated root post.
    pub fn family_datastore() -> TestDatastore {
        let user = Key::name("User", "ada");
        let test_ds = TestDatastore::new();
        test_ds.seed([
            Entity::new(user.clone()).with("name", "Ada"),
            Entity::new(user.child("Post", 1)).with("title", "first"),
            Entity::new(user.child("Post", 2)).with("title", "second"),
            Entity::new(Key::id("Post", 3)).with("title", "orphan"),
        ]);
        test_ds
    }
}
