//! The check/fix walk.

use super::{CheckOptions, Problem, ProblemKind};
use crate::error::{CoreError, CoreResult};
use crate::id::{
    validate_collection_name, validate_id, IdAlgorithm, SequenceFile, SequenceFormat,
    SEQUENCE_FILE,
};
use crate::record::{
    id_from_file_name, inspect_payload, record_file_name, strip_embedded_id, EmbeddedId,
};
use crate::registry::{CollectionMetadata, Registry, REGISTRY_FILE};
use crate::store::StoreInner;
use simpledb_storage::{
    is_temp_file, list_dir, modified_age, move_file, read_file, remove_file, AtomicWriter,
    EntryKind,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// One check or fix pass.
///
/// Problems are detected in a fixed order: registry, algorithms, root
/// directories, then each collection. In repair mode every problem is
/// repaired as soon as it is found, so later phases see the repaired state.
pub(crate) struct Checker<'a> {
    inner: &'a StoreInner,
    options: &'a CheckOptions,
    repair: bool,
    problems: Vec<Problem>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(inner: &'a StoreInner, options: &'a CheckOptions, repair: bool) -> Self {
        Self {
            inner,
            options,
            repair,
            problems: Vec::new(),
        }
    }

    pub(crate) fn run(mut self) -> CoreResult<Vec<Problem>> {
        let options = self.options;
        if let Some(name) = &options.collection {
            validate_collection_name(name)?;
        }

        let Some(registry) = self.check_registry()? else {
            return Ok(self.problems);
        };
        let algorithms = self.check_algorithms(&registry);
        let directories = self.scan_root()?;

        if let Some(name) = &options.collection {
            if !algorithms.contains_key(name) && !directories.contains(name) {
                return Err(CoreError::collection_not_found(name));
            }
        }

        for (name, &algorithm) in &algorithms {
            if directories.contains(name) {
                self.check_collection(name, algorithm)?;
            } else {
                // Nothing below a missing directory to inspect.
                self.missing_directory(name, algorithm);
            }
        }

        for name in directories.iter().filter(|n| !algorithms.contains_key(*n)) {
            let algorithm = self.orphan_directory(name);
            self.check_collection(name, algorithm)?;
        }

        if self.repair {
            self.refresh_registry();
        }

        Ok(self.problems)
    }

    fn in_scope(&self, name: &str) -> bool {
        self.options
            .collection
            .as_deref()
            .map_or(true, |scope| scope == name)
    }

    /// Records `problem`, running `repair` first in repair mode.
    ///
    /// A failed repair is logged and leaves the problem unfixed.
    fn report<T>(
        &mut self,
        mut problem: Problem,
        repair: impl FnOnce(&StoreInner) -> CoreResult<T>,
    ) -> Option<T> {
        let mut outcome = None;
        if self.repair && problem.kind.is_repairable() {
            match repair(self.inner) {
                Ok(value) => {
                    problem.fixed = true;
                    outcome = Some(value);
                    tracing::info!(
                        kind = %problem.kind,
                        path = %problem.path.display(),
                        "repaired"
                    );
                }
                Err(e) => tracing::warn!(
                    kind = %problem.kind,
                    path = %problem.path.display(),
                    error = %e,
                    "repair failed"
                ),
            }
        }
        self.problems.push(problem);
        outcome
    }

    /// Loads the registry from disk. Returns `None` when it is unusable and
    /// was not rebuilt, which ends the pass.
    fn check_registry(&mut self) -> CoreResult<Option<Registry>> {
        let path = self.inner.dir.registry_path();
        let (kind, description) = match self.inner.dir.load_registry() {
            Ok(Some(registry)) => return Ok(Some(registry)),
            Ok(None) => (
                ProblemKind::RegistryMissing,
                "registry file is missing".to_string(),
            ),
            Err(CoreError::CorruptRegistry { message, .. }) => (
                ProblemKind::RegistryCorrupt,
                format!("registry does not parse: {message}"),
            ),
            Err(e) => return Err(e),
        };
        let problem = Problem::new(kind, path, description);

        if self.options.collection.is_some() {
            self.problems.push(problem);
            return Ok(None);
        }

        let corrupt = kind == ProblemKind::RegistryCorrupt;
        Ok(self.report(problem, |inner| rebuild_registry(inner, corrupt)))
    }

    /// Resolves the algorithm of every in-scope registered collection,
    /// normalizing unknown ones to the configured default.
    fn check_algorithms(&mut self, registry: &Registry) -> BTreeMap<String, IdAlgorithm> {
        let default = self.inner.config.default_algorithm;
        let mut resolved = BTreeMap::new();

        for (name, metadata) in &registry.collections {
            if !self.in_scope(name) {
                continue;
            }
            let algorithm = match metadata.algorithm() {
                Ok(algorithm) => algorithm,
                Err(_) => {
                    let problem = Problem::new(
                        ProblemKind::UnknownAlgorithm,
                        self.inner.dir.registry_path(),
                        format!(
                            "collection {name} uses unknown id algorithm {:?}; default is {default}",
                            metadata.id_algorithm
                        ),
                    );
                    let unknown = metadata.id_algorithm.as_str();
                    let normalized = self.report(problem, |inner| {
                        normalize_algorithm(inner, name, unknown, default)
                    });
                    if normalized == Some(false) {
                        self.problems.pop();
                    }
                    default
                }
            };
            resolved.insert(name.clone(), algorithm);
        }

        resolved
    }

    /// Lists candidate collection directories at the root.
    fn scan_root(&mut self) -> CoreResult<BTreeSet<String>> {
        let root = self.inner.dir.path().to_path_buf();
        let scoped = self.options.collection.is_some();
        let mut directories = BTreeSet::new();

        for entry in list_dir(&root)? {
            match entry.kind {
                EntryKind::Dir => {}
                EntryKind::File if !scoped && is_temp_file(&entry.name) => {
                    self.check_temp_file(root.join(&entry.name));
                    continue;
                }
                _ => continue,
            }

            // Store-owned and hidden directories.
            if entry.name.starts_with('_') || entry.name.starts_with('.') {
                continue;
            }

            if validate_collection_name(&entry.name).is_err() {
                if !scoped {
                    let problem = Problem::new(
                        ProblemKind::InvalidDirectory,
                        root.join(&entry.name),
                        "directory name is not a valid collection name",
                    );
                    self.report(problem, |_| Ok(()));
                }
                continue;
            }

            if self.in_scope(&entry.name) {
                directories.insert(entry.name);
            }
        }

        Ok(directories)
    }

    fn missing_directory(&mut self, name: &str, algorithm: IdAlgorithm) {
        let problem = Problem::new(
            ProblemKind::MissingDirectory,
            self.inner.dir.collection_path(name),
            format!("registered collection {name} has no directory"),
        );
        self.report(problem, |inner| inner.materialize_collection(name, algorithm));
    }

    /// Reports an unregistered directory and returns the algorithm it is
    /// (or would be) registered with.
    fn orphan_directory(&mut self, name: &str) -> IdAlgorithm {
        let algorithm = infer_algorithm(&self.inner.dir.sequence_path(name))
            .unwrap_or(self.inner.config.default_algorithm);
        let problem = Problem::new(
            ProblemKind::OrphanDirectory,
            self.inner.dir.collection_path(name),
            format!("directory {name} is not registered (algorithm {algorithm})"),
        );
        match self.report(problem, |inner| register_unclaimed(inner, name, algorithm)) {
            Some(Some(registered)) => {
                // Registered concurrently after the registry was read.
                self.problems.pop();
                tracing::debug!(collection = name, "directory registered during the pass");
                registered.algorithm().unwrap_or(algorithm)
            }
            _ => algorithm,
        }
    }

    fn check_collection(&mut self, name: &str, algorithm: IdAlgorithm) -> CoreResult<()> {
        let dir = self.inner.dir.collection_path(name);
        let entries = match list_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let format = algorithm.sequence_format();
        let mut highest = 0;

        for entry in entries {
            if entry.kind != EntryKind::File || entry.name == SEQUENCE_FILE {
                continue;
            }
            let path = dir.join(&entry.name);

            if is_temp_file(&entry.name) {
                self.check_temp_file(path);
                continue;
            }

            let Some(id) = id_from_file_name(&entry.name).filter(|id| validate_id(id).is_ok())
            else {
                self.quarantine(
                    name,
                    path,
                    ProblemKind::InvalidRecordId,
                    format!("{:?} is not a valid record file name", entry.name),
                );
                continue;
            };

            if self.options.deep && !self.check_record(name, id, &path)? {
                continue;
            }

            if let Some(value) = format.and_then(|f| f.parse(id)) {
                highest = highest.max(value);
            }
        }

        if let Some(format) = format {
            self.check_sequence(name, format, highest)?;
        }
        Ok(())
    }

    /// Inspects one payload. Returns false if the record was set aside or
    /// has disappeared.
    fn check_record(&mut self, collection: &str, id: &str, path: &Path) -> CoreResult<bool> {
        let stored = match read_file(path) {
            Ok(stored) => stored,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        match inspect_payload(id, &stored) {
            Ok(EmbeddedId::Absent | EmbeddedId::Matches) => Ok(true),
            Ok(EmbeddedId::Conflicts(other)) => {
                let problem = Problem::new(
                    ProblemKind::IdMismatch,
                    path.to_path_buf(),
                    format!("embedded id {other} does not match file name"),
                );
                if let Some(false) =
                    self.report(problem, |inner| strip_if_unchanged(&inner.writer, path, &stored))
                {
                    tracing::debug!(path = %path.display(), "record rewritten during the pass");
                    if let Some(problem) = self.problems.last_mut() {
                        problem.fixed = false;
                    }
                }
                Ok(true)
            }
            Err(message) => {
                self.quarantine(
                    collection,
                    path.to_path_buf(),
                    ProblemKind::CorruptRecord,
                    format!("payload is not a JSON object: {message}"),
                );
                Ok(false)
            }
        }
    }

    fn quarantine(
        &mut self,
        collection: &str,
        path: PathBuf,
        kind: ProblemKind,
        description: String,
    ) {
        let problem = Problem::new(kind, path.clone(), description);
        self.report(problem, |inner| {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| record_file_name("unnamed"));
            let target = inner.dir.quarantine_path(collection, &file_name);
            move_file(&path, &target, inner.writer.syncs())?;
            tracing::info!(
                from = %path.display(),
                to = %target.display(),
                "file quarantined"
            );
            Ok(())
        });
    }

    fn check_temp_file(&mut self, path: PathBuf) {
        let age = match modified_age(&path) {
            Ok(age) => age,
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!(path = %path.display(), error = %e, "cannot stat temp file");
                }
                return;
            }
        };
        if age < self.inner.config.stale_temp_age {
            return;
        }

        let problem = Problem::new(
            ProblemKind::StaleTempFile,
            path.clone(),
            format!("temp file left behind {}s ago", age.as_secs()),
        );
        self.report(problem, |inner| match remove_file(&path, inner.writer.syncs()) {
            Err(e) if !e.is_not_found() => Err(e.into()),
            _ => Ok(()),
        });
    }

    /// Checks a sequential collection's counter against the highest id
    /// present, under the collection's sequence lock.
    fn check_sequence(
        &mut self,
        name: &str,
        format: SequenceFormat,
        highest: u64,
    ) -> CoreResult<()> {
        let counter = SequenceFile::new(self.inner.dir.sequence_path(name), format);
        let lock = self.inner.sequence_lock(name);
        let _guard = lock.lock();

        let path = counter.path().to_path_buf();
        let problem = match counter.read() {
            Ok(Some(current)) if self.options.deep && current < highest => Problem::new(
                ProblemKind::SequenceBehind,
                path,
                format!(
                    "counter {} is below highest id {}",
                    format.format(current),
                    format.format(highest)
                ),
            ),
            Ok(Some(_)) => return Ok(()),
            Ok(None) => Problem::new(
                ProblemKind::MissingSequence,
                path,
                format!(
                    "counter file is missing; highest id is {}",
                    format.format(highest)
                ),
            ),
            Err(CoreError::CorruptSequence { message, .. }) => {
                Problem::new(ProblemKind::InvalidSequence, path, message)
            }
            Err(e) => return Err(e),
        };

        self.report(problem, |inner| counter.store(&inner.writer, highest));
        Ok(())
    }

    /// Publishes the on-disk registry so a store opened in degraded mode
    /// becomes usable.
    fn refresh_registry(&self) {
        let _guard = self.inner.lock_registry();
        match self.inner.dir.load_registry() {
            Ok(Some(registry)) => self.inner.publish_registry(registry),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "registry unreadable after fix"),
        }
    }
}

/// Rewrites the registry document. A corrupt document is moved aside
/// first. Collections known to a cleanly opened store are kept.
fn rebuild_registry(inner: &StoreInner, corrupt: bool) -> CoreResult<Registry> {
    let _guard = inner.lock_registry();
    let path = inner.dir.registry_path();

    if corrupt {
        let aside = path.with_file_name(format!(
            "{REGISTRY_FILE}.corrupt-{}",
            uuid::Uuid::new_v4().simple()
        ));
        move_file(&path, &aside, inner.writer.syncs())?;
        tracing::warn!(path = %aside.display(), "corrupt registry moved aside");
    }

    let registry = inner.registry_snapshot().unwrap_or_default();
    inner.dir.save_registry(&inner.writer, &registry)?;
    inner.publish_registry(registry.clone());
    Ok(registry)
}

/// Registers an orphan directory. The document is reloaded from disk under
/// the registry lock; if `name` was registered in the meantime the existing
/// entry is kept and returned.
pub(super) fn register_unclaimed(
    inner: &StoreInner,
    name: &str,
    algorithm: IdAlgorithm,
) -> CoreResult<Option<CollectionMetadata>> {
    let _guard = inner.lock_registry();
    let mut registry = inner.dir.load_registry()?.unwrap_or_default();
    if let Some(existing) = registry.get(name) {
        return Ok(Some(existing.clone()));
    }
    registry.insert(name, CollectionMetadata::new(algorithm));
    inner.dir.save_registry(&inner.writer, &registry)?;
    inner.publish_registry(registry);
    Ok(None)
}

/// Replaces an unrecognized algorithm name with `algorithm`. Returns false,
/// without writing, if the entry on disk no longer holds `unknown`.
pub(super) fn normalize_algorithm(
    inner: &StoreInner,
    name: &str,
    unknown: &str,
    algorithm: IdAlgorithm,
) -> CoreResult<bool> {
    let _guard = inner.lock_registry();
    let mut registry = inner.dir.load_registry()?.unwrap_or_default();
    match registry.get(name) {
        Some(entry) if entry.id_algorithm == unknown => {}
        _ => {
            tracing::debug!(collection = name, "registry entry changed during the pass");
            return Ok(false);
        }
    }
    registry.insert(name, CollectionMetadata::new(algorithm));
    inner.dir.save_registry(&inner.writer, &registry)?;
    inner.publish_registry(registry);
    Ok(true)
}

/// Rewrites `path` without its embedded id if it still holds `seen`.
///
/// Returns false, without writing, when the file changed or disappeared
/// since it was inspected.
pub(super) fn strip_if_unchanged(
    writer: &AtomicWriter,
    path: &Path,
    seen: &[u8],
) -> CoreResult<bool> {
    let current = match read_file(path) {
        Ok(current) => current,
        Err(e) if e.is_not_found() => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if current != seen {
        return Ok(false);
    }
    let stripped =
        strip_embedded_id(seen).map_err(|message| CoreError::corrupt_record(path, message))?;
    writer.write(path, &stripped)?;
    Ok(true)
}

/// Guesses a directory's algorithm from the width of its counter file.
fn infer_algorithm(counter: &Path) -> Option<IdAlgorithm> {
    let bytes = read_file(counter).ok()?;
    let text = std::str::from_utf8(&bytes).ok()?;
    SequenceFormat::infer(text).map(IdAlgorithm::from_sequence_format)
}
