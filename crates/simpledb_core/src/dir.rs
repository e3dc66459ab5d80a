//! Store directory management.
//!
//! This module handles the file system layout for SimpleDB:
//!
//! ```text
//! <root>/
//! ├─ LOCK               # Advisory lock for single-process access
//! ├─ _registry.json     # Collections and their id algorithms
//! ├─ _quarantine/       # Records moved aside by Fix
//! └─ <collection>/
//!    ├─ _seq            # Counter (sequential algorithms only)
//!    └─ <id>.json       # One file per record
//! ```
//!
//! Collection names are alphanumeric, so store-owned entries at the root are
//! prefixed with `_` (or are plain files) and can never clash with them.

use crate::error::{CoreError, CoreResult};
use crate::id::SEQUENCE_FILE;
use crate::record::record_file_name;
use crate::registry::{Registry, REGISTRY_FILE};
#[cfg(feature = "std")]
use fs2::FileExt;
use parking_lot::Mutex;
use simpledb_storage::{read_file, AtomicWriter};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// File names within the store directory.
const LOCK_FILE: &str = "LOCK";
/// Directory receiving quarantined records.
pub const QUARANTINE_DIR: &str = "_quarantine";

/// Manages the store directory structure and file locking.
///
/// # Thread Safety
///
/// When locking is enabled, `StoreDir` holds an exclusive advisory lock on
/// the directory until [`release_lock`](Self::release_lock) is called or it
/// is dropped. A second `StoreDir` on the same path fails with
/// `DatabaseLocked`.
#[derive(Debug)]
pub struct StoreDir {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    lock_file: Mutex<Option<File>>,
}

impl StoreDir {
    /// Opens or creates a store directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the store directory
    /// * `create_if_missing` - If true, creates the directory if it doesn't exist
    /// * `lock` - If true, takes the advisory directory lock
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `DatabaseLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool, lock: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = if lock {
            Some(Self::acquire_lock(path)?)
        } else {
            None
        };

        Ok(Self {
            path: path.to_path_buf(),
            lock_file: Mutex::new(lock_file),
        })
    }

    #[cfg(feature = "std")]
    fn acquire_lock(path: &Path) -> CoreResult<File> {
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        // Non-blocking: a held lock means another process owns the store
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }
        Ok(lock_file)
    }

    #[cfg(not(feature = "std"))]
    fn acquire_lock(path: &Path) -> CoreResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?)
    }

    /// Releases the directory lock, if held. Idempotent.
    pub fn release_lock(&self) {
        // Closing the handle drops the advisory lock
        self.lock_file.lock().take();
    }

    /// Returns the path to the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the registry document.
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.path.join(REGISTRY_FILE)
    }

    /// Returns the directory of a collection.
    #[must_use]
    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.path.join(collection)
    }

    /// Returns the file of a record.
    #[must_use]
    pub fn record_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_path(collection).join(record_file_name(id))
    }

    /// Returns the counter file of a sequential collection.
    #[must_use]
    pub fn sequence_path(&self, collection: &str) -> PathBuf {
        self.collection_path(collection).join(SEQUENCE_FILE)
    }

    /// Returns where Fix moves an unusable file of `collection`.
    ///
    /// A random suffix keeps repeated quarantines of the same name apart.
    #[must_use]
    pub fn quarantine_path(&self, collection: &str, file_name: &str) -> PathBuf {
        self.path
            .join(QUARANTINE_DIR)
            .join(collection)
            .join(format!("{file_name}.{}", uuid::Uuid::new_v4().simple()))
    }

    /// Loads the registry from disk.
    ///
    /// Returns `None` if the registry file doesn't exist.
    ///
    /// # Errors
    ///
    /// `CorruptRegistry` if the file exists but does not parse.
    pub fn load_registry(&self) -> CoreResult<Option<Registry>> {
        let registry_path = self.registry_path();

        let data = match read_file(&registry_path) {
            Ok(data) => data,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Registry::decode(&data)
            .map(Some)
            .map_err(|e| CoreError::corrupt_registry(&registry_path, e.to_string()))
    }

    /// Saves the registry to disk atomically.
    pub fn save_registry(&self, writer: &AtomicWriter, registry: &Registry) -> CoreResult<()> {
        let data = registry.encode()?;
        writer.write(&self.registry_path(), &data)?;
        tracing::debug!(
            path = %self.registry_path().display(),
            collections = registry.collections.len(),
            "registry saved"
        );
        Ok(())
    }
}
