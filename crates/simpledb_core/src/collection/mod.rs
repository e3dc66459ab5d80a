//! Collection API.
//!
//! [`RawCollection`] works on JSON bytes; [`Collection<T>`] layers serde on
//! top of it. Both are cheap handles over the store's shared state.

mod cursor;
mod typed;

pub use cursor::{Ids, Items, TypedItems};
pub use typed::Collection;

use crate::error::{CoreError, CoreResult};
use crate::id::{validate_id, IdAlgorithm, IdGenerator};
use crate::record::{decode_payload, encode_payload, id_from_file_name};
use crate::store::StoreInner;
use parking_lot::Mutex;
use simpledb_storage::{file_exists, list_dir, read_file, remove_file, EntryKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lists the valid record ids in `dir` that sort at or after `start`, in
/// ascending byte order.
///
/// A missing directory lists as empty. Files whose names are not valid ids
/// are ignored here; Check reports them.
pub(crate) fn list_record_ids(dir: &Path, start: &str) -> CoreResult<Vec<String>> {
    let entries = match list_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.is_not_found() => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut ids: Vec<String> = entries
        .into_iter()
        .filter(|entry| entry.kind == EntryKind::File)
        .filter_map(|entry| {
            id_from_file_name(&entry.name)
                .filter(|id| validate_id(id).is_ok() && *id >= start)
                .map(str::to_string)
        })
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

/// A byte-level handle to one collection.
///
/// Payloads are JSON objects. The record id lives in the file name: an `id`
/// field in written data is stripped, and [`read`](Self::read) puts it back
/// as the first field.
///
/// Obtaining a handle does no I/O; every operation checks that the store is
/// open and that the collection is registered.
#[derive(Debug, Clone)]
pub struct RawCollection {
    inner: Arc<StoreInner>,
    name: String,
}

impl RawCollection {
    pub(crate) fn new(inner: Arc<StoreInner>, name: String) -> Self {
        Self { inner, name }
    }

    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self) -> CoreResult<IdAlgorithm> {
        self.inner.ensure_open()?;
        self.inner.resolve(&self.name)
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.inner.dir.record_path(&self.name, id)
    }

    fn generator(&self, algorithm: IdAlgorithm) -> IdGenerator {
        let lock = if algorithm.requires_state() {
            self.inner.sequence_lock(&self.name)
        } else {
            Arc::new(Mutex::new(()))
        };
        IdGenerator::new(algorithm, self.inner.dir.sequence_path(&self.name), lock)
    }

    /// Stores `data` under a newly generated id and returns the id.
    ///
    /// The record is published with an exclusive create. When a generated
    /// id is already taken a fresh one is tried, up to
    /// `Config::max_create_attempts` times.
    ///
    /// # Errors
    ///
    /// - `GenerationUnsupported` for collections using custom ids
    /// - `InvalidData` if `data` is not a JSON object
    /// - `IdSpaceExhausted` if every attempt collided
    pub fn create(&self, data: &[u8]) -> CoreResult<String> {
        let algorithm = self.resolve()?;
        let payload = encode_payload(None, data)?;
        let generator = self.generator(algorithm);

        let config = &self.inner.config;
        let attempts = config.max_create_attempts.max(1);
        for attempt in 1..=attempts {
            let id = generator.generate(&self.inner.writer, &self.name)?;
            match self.inner.writer.create(&self.record_path(&id), &payload) {
                Ok(()) => {
                    tracing::debug!(collection = %self.name, id = %id, "record created");
                    return Ok(id);
                }
                Err(e) if e.is_already_exists() => {
                    tracing::debug!(
                        collection = %self.name,
                        id = %id,
                        attempt,
                        "generated id already taken"
                    );
                    if attempt < attempts && !config.create_retry_delay.is_zero() {
                        std::thread::sleep(config.create_retry_delay);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(collection = %self.name, attempts, "id generation kept colliding");
        Err(CoreError::IdSpaceExhausted {
            collection: self.name.clone(),
            attempts,
        })
    }

    /// Stores `data` under a caller-chosen id.
    ///
    /// Works for every algorithm and never advances a sequence counter.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a record with `id` exists, `InvalidId` if `id`
    /// breaks the id rule.
    pub fn create_with_id(&self, id: &str, data: &[u8]) -> CoreResult<()> {
        self.resolve()?;
        validate_id(id)?;
        let payload = encode_payload(Some(id), data)?;

        match self.inner.writer.create(&self.record_path(id), &payload) {
            Ok(()) => {
                tracing::debug!(collection = %self.name, id, "record created");
                Ok(())
            }
            Err(e) if e.is_already_exists() => Err(CoreError::already_exists(&self.name, id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a record, with `id` injected as its first field.
    pub fn read(&self, id: &str) -> CoreResult<Vec<u8>> {
        self.resolve()?;
        validate_id(id)?;
        self.read_unchecked(id)
            .and_then(|found| found.ok_or_else(|| CoreError::record_not_found(&self.name, id)))
    }

    /// Reads a record whose id is already validated. Absence is `None`.
    fn read_unchecked(&self, id: &str) -> CoreResult<Option<Vec<u8>>> {
        let path = self.record_path(id);
        let stored = match read_file(&path) {
            Ok(stored) => stored,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode_payload(&path, id, &stored).map(Some)
    }

    /// Replaces an existing record.
    ///
    /// The replacement is atomic. A delete racing with the update may let
    /// the update recreate the record; last completed write wins.
    ///
    /// # Errors
    ///
    /// `RecordNotFound` if no record has `id`.
    pub fn update(&self, id: &str, data: &[u8]) -> CoreResult<()> {
        self.resolve()?;
        validate_id(id)?;
        let payload = encode_payload(Some(id), data)?;

        let path = self.record_path(id);
        if !file_exists(&path)? {
            return Err(CoreError::record_not_found(&self.name, id));
        }
        self.inner.writer.write(&path, &payload)?;
        tracing::debug!(collection = %self.name, id, "record updated");
        Ok(())
    }

    /// Deletes a record. Sequence counters are not rolled back.
    ///
    /// # Errors
    ///
    /// `RecordNotFound` if no record has `id`.
    pub fn delete(&self, id: &str) -> CoreResult<()> {
        self.resolve()?;
        validate_id(id)?;

        match remove_file(&self.record_path(id), self.inner.writer.syncs()) {
            Ok(()) => {
                tracing::debug!(collection = %self.name, id, "record deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => Err(CoreError::record_not_found(&self.name, id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns true if a record with `id` exists.
    pub fn exists(&self, id: &str) -> CoreResult<bool> {
        self.resolve()?;
        validate_id(id)?;
        Ok(file_exists(&self.record_path(id))?)
    }

    /// Returns the number of records in the collection.
    pub fn count(&self) -> CoreResult<usize> {
        self.resolve()?;
        Ok(list_record_ids(&self.inner.dir.collection_path(&self.name), "")?.len())
    }

    /// Returns a cursor over record ids `>= start` in ascending byte order.
    ///
    /// An empty `start` yields every id. The directory is listed on the
    /// first call to `next`.
    pub fn ids(&self, start: &str) -> CoreResult<Ids> {
        self.resolve()?;
        Ok(Ids::new(
            Arc::clone(&self.inner),
            self.inner.dir.collection_path(&self.name),
            start.to_string(),
        ))
    }

    /// Returns a cursor over `(id, payload)` pairs with ids `>= start`.
    ///
    /// Payloads are read one at a time as the cursor advances. Records
    /// deleted after the listing are skipped.
    pub fn items(&self, start: &str) -> CoreResult<Items> {
        Ok(Items::new(self.ids(start)?, self.clone()))
    }
}
