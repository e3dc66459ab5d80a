//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use simpledb_core::{Config, IdAlgorithm, Store};
use std::path::Path;
use tempfile::TempDir;

/// Configuration used by fixtures: fsync disabled for speed.
#[must_use]
pub fn test_config() -> Config {
    Config::default().sync_writes(false)
}

/// A store in a temporary directory that is removed on drop.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates an empty store with [`test_config`].
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Creates an empty store with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store =
            Store::open_with_config(temp_dir.path(), config).expect("Failed to open test store");
        Self { store, temp_dir }
    }

    /// Returns the store root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Closes the store and opens it again on the same directory.
    pub fn reopen(self) -> Self {
        self.reopen_with_config(test_config())
    }

    /// Closes the store and opens it again with `config`.
    pub fn reopen_with_config(self, config: Config) -> Self {
        let Self { store, temp_dir } = self;
        store.close();
        drop(store);
        let store =
            Store::open_with_config(temp_dir.path(), config).expect("Failed to reopen test store");
        Self { store, temp_dir }
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary store.
///
/// # Example
///
/// ```rust
/// use simpledb_core::IdAlgorithm;
/// use simpledb_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     store.add_collection("notes", IdAlgorithm::Seq10).unwrap();
///     let id = store.raw_collection("notes").create(b"{}").unwrap();
///     assert_eq!(id, "0000000001");
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let test_store = TestStore::new();
    f(&test_store.store)
}

/// Runs a test with a temporary store and its root path.
pub fn with_temp_store_path<F, R>(f: F) -> R
where
    F: FnOnce(&Store, &Path) -> R,
{
    let test_store = TestStore::new();
    f(&test_store.store, test_store.path())
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Name of the collection created by [`populated_store`].
    pub const POPULATED_COLLECTION: &str = "items";

    /// Creates a store with one `seq10` collection holding `record_count`
    /// records `{"index": i}`.
    pub fn populated_store(record_count: usize) -> TestStore {
        let test_store = TestStore::new();
        test_store
            .add_collection(POPULATED_COLLECTION, IdAlgorithm::Seq10)
            .expect("Failed to add collection");

        let items = test_store.raw_collection(POPULATED_COLLECTION);
        for i in 0..record_count {
            let data = format!(r#"{{"index":{i}}}"#).into_bytes();
            items.create(&data).expect("Failed to create record");
        }

        test_store
    }

    /// Creates a store with one collection per id algorithm, each holding
    /// one record. Returns the collection names.
    pub fn multi_collection_store() -> (TestStore, Vec<String>) {
        let test_store = TestStore::new();
        let mut names = Vec::with_capacity(IdAlgorithm::ALL.len());

        for algorithm in IdAlgorithm::ALL {
            let name = format!("{}items", algorithm.name());
            test_store
                .add_collection(&name, algorithm)
                .expect("Failed to add collection");

            let collection = test_store.raw_collection(&name);
            let data = format!(r#"{{"algorithm":"{algorithm}"}}"#).into_bytes();
            if algorithm == IdAlgorithm::Custom {
                collection
                    .create_with_id("first", &data)
                    .expect("Failed to create record");
            } else {
                collection.create(&data).expect("Failed to create record");
            }
            names.push(name);
        }

        (test_store, names)
    }
}
