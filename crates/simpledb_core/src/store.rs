//! Store facade.

use crate::check::{CheckOptions, CheckReport, Checker, FixReport};
use crate::collection::{Collection, RawCollection};
use crate::config::Config;
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::id::{validate_collection_name, IdAlgorithm, SequenceFile};
use crate::registry::{CollectionMetadata, Registry};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use simpledb_storage::{ensure_dir, AtomicWriter};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory view of the registry document.
#[derive(Debug, Clone)]
pub(crate) enum RegistryState {
    /// Parsed and usable.
    Loaded(Registry),
    /// The document on disk did not parse; Fix is required.
    Corrupt(String),
}

/// State shared by a [`Store`] and every handle derived from it.
#[derive(Debug)]
pub(crate) struct StoreInner {
    pub(crate) config: Config,
    pub(crate) dir: StoreDir,
    pub(crate) writer: AtomicWriter,
    registry: RwLock<RegistryState>,
    /// Serializes registry mutations store-wide.
    registry_write: Mutex<()>,
    /// Per-collection locks for sequence counters.
    sequence_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    closed: AtomicBool,
}

impl StoreInner {
    pub(crate) fn ensure_open(&self) -> CoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CoreError::Closed);
        }
        Ok(())
    }

    /// Looks up a collection's algorithm in the in-memory registry.
    pub(crate) fn resolve(&self, collection: &str) -> CoreResult<IdAlgorithm> {
        validate_collection_name(collection)?;
        match &*self.registry.read() {
            RegistryState::Loaded(registry) => registry
                .get(collection)
                .ok_or_else(|| CoreError::collection_not_found(collection))?
                .algorithm(),
            RegistryState::Corrupt(message) => Err(CoreError::corrupt_registry(
                self.dir.registry_path(),
                message.clone(),
            )),
        }
    }

    pub(crate) fn registry_snapshot(&self) -> CoreResult<Registry> {
        match &*self.registry.read() {
            RegistryState::Loaded(registry) => Ok(registry.clone()),
            RegistryState::Corrupt(message) => Err(CoreError::corrupt_registry(
                self.dir.registry_path(),
                message.clone(),
            )),
        }
    }

    /// Replaces the in-memory registry after a successful persist.
    pub(crate) fn publish_registry(&self, registry: Registry) {
        *self.registry.write() = RegistryState::Loaded(registry);
    }

    /// Takes the store-wide registry mutation lock.
    pub(crate) fn lock_registry(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.registry_write.lock()
    }

    /// Returns the sequence lock of `collection`, creating it on first use.
    pub(crate) fn sequence_lock(&self, collection: &str) -> Arc<Mutex<()>> {
        let mut locks = self.sequence_locks.lock();
        Arc::clone(
            locks
                .entry(collection.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Creates a collection's directory and, for sequential algorithms, a
    /// zero counter. Existing entries are left untouched.
    pub(crate) fn materialize_collection(
        &self,
        collection: &str,
        algorithm: IdAlgorithm,
    ) -> CoreResult<()> {
        let sync = self.writer.syncs();
        ensure_dir(&self.dir.collection_path(collection), sync)?;
        if let Some(format) = algorithm.sequence_format() {
            SequenceFile::new(self.dir.sequence_path(collection), format).init(&self.writer, 0)?;
        }
        Ok(())
    }
}

/// The main store handle.
///
/// `Store` is the entry point for SimpleDB. It provides:
/// - Collection registration and listing
/// - Collection handles for record CRUD and iteration
/// - Consistency check and repair
///
/// `Store` is `Send + Sync`; share it between threads behind an `Arc` or
/// hand out cloned [`RawCollection`] handles.
///
/// # Example
///
/// ```rust
/// use simpledb_core::{IdAlgorithm, Store};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = Store::open(dir.path()).unwrap();
///
/// store.add_collection("notes", IdAlgorithm::Seq10).unwrap();
/// let notes = store.raw_collection("notes");
///
/// let id = notes.create(br#"{"text":"hello"}"#).unwrap();
/// assert_eq!(id, "0000000001");
///
/// let bytes = notes.read(&id).unwrap();
/// assert_eq!(bytes, br#"{"id":"0000000001","text":"hello"}"#);
///
/// store.close();
/// ```
#[derive(Debug)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Store {
    /// Opens a store with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another process has the store locked (`DatabaseLocked`)
    /// - The registry format is incompatible (`InvalidFormat`)
    /// - I/O errors occur
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a store with a custom configuration.
    ///
    /// A missing registry is created empty. A registry that does not parse
    /// does not prevent opening: the store starts in a degraded mode where
    /// Check and Fix work but collection access fails with
    /// `CorruptRegistry` until Fix has repaired the registry.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use simpledb_core::{Config, Store};
    /// use std::time::Duration;
    ///
    /// let config = Config::default()
    ///     .max_create_attempts(8)
    ///     .create_retry_delay(Duration::from_millis(2));
    ///
    /// let store = Store::open_with_config(Path::new("my_store"), config)?;
    /// ```
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing, config.lock_directory)?;
        let writer = AtomicWriter::new(config.sync_writes);

        let registry = match dir.load_registry() {
            Ok(Some(registry)) => {
                registry.check_version()?;
                RegistryState::Loaded(registry)
            }
            Ok(None) => {
                if !config.create_if_missing {
                    return Err(CoreError::invalid_format(
                        "store has no registry and create_if_missing is false",
                    ));
                }
                let registry = Registry::new();
                dir.save_registry(&writer, &registry)?;
                RegistryState::Loaded(registry)
            }
            Err(CoreError::CorruptRegistry { path, message }) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %message,
                    "registry is corrupt; opening in degraded mode"
                );
                RegistryState::Corrupt(message)
            }
            Err(e) => return Err(e),
        };

        tracing::info!(path = %path.display(), "store opened");

        Ok(Self {
            inner: Arc::new(StoreInner {
                config,
                dir,
                writer,
                registry: RwLock::new(registry),
                registry_write: Mutex::new(()),
                sequence_locks: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Returns the store root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.dir.path()
    }

    /// Returns the configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns a byte-level handle for `name`.
    ///
    /// This does not touch the filesystem or check registration; problems
    /// surface on the first operation.
    #[must_use]
    pub fn raw_collection(&self, name: &str) -> RawCollection {
        RawCollection::new(Arc::clone(&self.inner), name.to_string())
    }

    /// Returns a typed handle for `name`.
    #[must_use]
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Serialize + DeserializeOwned,
    {
        Collection::new(self.raw_collection(name))
    }

    /// Registers a collection.
    ///
    /// The collection directory (and a zero counter for sequential
    /// algorithms) is created before the registry is published, so no
    /// reader ever sees a registered collection without its directory. If
    /// publishing fails the registration is reported as failed and the
    /// in-memory registry is unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidCollectionName` for names that are not alphanumeric
    /// - `CollectionExists` if the name is already registered
    /// - `CorruptRegistry` while the store is degraded
    pub fn add_collection(&self, name: &str, algorithm: IdAlgorithm) -> CoreResult<()> {
        self.inner.ensure_open()?;
        validate_collection_name(name)?;

        let _guard = self.inner.lock_registry();
        let mut registry = self.inner.registry_snapshot()?;
        if registry.contains(name) {
            return Err(CoreError::CollectionExists {
                name: name.to_string(),
            });
        }

        self.inner.materialize_collection(name, algorithm)?;

        registry.insert(name, CollectionMetadata::new(algorithm));
        self.inner.dir.save_registry(&self.inner.writer, &registry)?;
        self.inner.publish_registry(registry);

        tracing::info!(collection = name, algorithm = %algorithm, "collection added");
        Ok(())
    }

    /// Returns the names of all registered collections.
    pub fn collections(&self) -> CoreResult<Vec<String>> {
        self.inner.ensure_open()?;
        Ok(self.inner.registry_snapshot()?.names())
    }

    /// Returns the registry entry of `name`.
    pub fn collection_metadata(&self, name: &str) -> CoreResult<CollectionMetadata> {
        self.inner.ensure_open()?;
        validate_collection_name(name)?;
        self.inner
            .registry_snapshot()?
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::collection_not_found(name))
    }

    /// Runs a shallow, store-wide consistency check.
    pub fn check(&self) -> CoreResult<CheckReport> {
        self.check_with(&CheckOptions::default())
    }

    /// Runs a consistency check with the given depth and scope.
    pub fn check_with(&self, options: &CheckOptions) -> CoreResult<CheckReport> {
        self.inner.ensure_open()?;
        let problems = Checker::new(&self.inner, options, false).run()?;
        Ok(CheckReport { problems })
    }

    /// Runs a shallow, store-wide check and repairs what it finds.
    pub fn fix(&self) -> CoreResult<FixReport> {
        self.fix_with(&CheckOptions::default())
    }

    /// Runs a check with the given depth and scope and repairs what it finds.
    ///
    /// Each repair is attempted independently; the report reflects what was
    /// actually fixed.
    pub fn fix_with(&self, options: &CheckOptions) -> CoreResult<FixReport> {
        self.inner.ensure_open()?;
        let problems = Checker::new(&self.inner, options, true).run()?;
        let fixed = problems.iter().filter(|p| p.fixed).count();
        tracing::info!(found = problems.len(), fixed, "fix completed");
        Ok(FixReport { problems, fixed })
    }

    /// Returns true until [`close`](Self::close) is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.inner.closed.load(Ordering::Acquire)
    }

    /// Closes the store and releases the directory lock.
    ///
    /// Idempotent and infallible. Every later operation on the store or on
    /// any handle derived from it returns `Closed`.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.dir.release_lock();
        tracing::info!(path = %self.inner.dir.path().display(), "store closed");
    }
}
