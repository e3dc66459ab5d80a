//! Crash-safe whole-file writes.

use crate::error::{StorageError, StorageResult};
use crate::file::sync_parent;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Filename prefix of in-flight temporary files.
///
/// Temp files are created next to their target so the final rename never
/// crosses a filesystem boundary.
pub const TEMP_PREFIX: &str = ".tmp-";

/// Returns true if `name` looks like a temp file left by [`AtomicWriter`].
#[must_use]
pub fn is_temp_file(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

/// Writes whole files so that readers observe either the old or the new
/// content, never a partial write.
///
/// Both operations follow the same pattern:
/// 1. Write the payload to a uniquely named sibling temp file
/// 2. Sync the temp file to disk
/// 3. Move it into place (`rename` for [`write`](Self::write),
///    no-clobber link for [`create`](Self::create))
/// 4. Fsync the parent directory so the new entry is durable
///
/// If any step fails the temp file is removed when it is dropped.
///
/// # Example
///
/// ```no_run
/// use simpledb_storage::AtomicWriter;
/// use std::path::Path;
///
/// let writer = AtomicWriter::new(true);
/// writer.create(Path::new("users/alice.json"), b"{}").unwrap();
/// writer.write(Path::new("users/alice.json"), b"{\"age\":31}").unwrap();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AtomicWriter {
    sync: bool,
}

impl Default for AtomicWriter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AtomicWriter {
    /// Creates a writer. With `sync` false, fsyncs are skipped; atomicity
    /// against concurrent readers is kept, crash durability is not.
    #[must_use]
    pub const fn new(sync: bool) -> Self {
        Self { sync }
    }

    /// Returns whether this writer fsyncs.
    #[must_use]
    pub const fn syncs(&self) -> bool {
        self.sync
    }

    /// Atomically replaces (or creates) the file at `path` with `data`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent directory does not exist, or `Io`
    /// for any other failure.
    pub fn write(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let temp = self.prepare(path, data)?;
        temp.persist(path)
            .map_err(|e| StorageError::from_io("rename", path, e.error))?;
        if self.sync {
            sync_parent(path)?;
        }
        tracing::trace!(path = %path.display(), len = data.len(), "atomic write");
        Ok(())
    }

    /// Atomically creates the file at `path` with `data`, failing if it
    /// already exists.
    ///
    /// The existence check and the publish are one filesystem operation, so
    /// two concurrent creators of the same path yield exactly one success.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if `path` exists, `NotFound` if the parent
    /// directory does not exist, or `Io` for any other failure.
    pub fn create(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let temp = self.prepare(path, data)?;
        temp.persist_noclobber(path)
            .map_err(|e| StorageError::from_io("link", path, e.error))?;
        if self.sync {
            sync_parent(path)?;
        }
        tracing::trace!(path = %path.display(), len = data.len(), "exclusive create");
        Ok(())
    }

    fn prepare(&self, path: &Path, data: &[u8]) -> StorageResult<NamedTempFile> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)
            .map_err(|e| StorageError::from_io("create temp", parent, e))?;

        temp.write_all(data)
            .map_err(|e| StorageError::from_io("write", temp.path(), e))?;
        if self.sync {
            temp.as_file()
                .sync_all()
                .map_err(|e| StorageError::from_io("sync", temp.path(), e))?;
        }

        Ok(temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn write_creates_and_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let writer = AtomicWriter::default();

        writer.write(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        writer.write(&path, b"second, longer").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second, longer");
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let writer = AtomicWriter::default();

        writer.create(&path, b"original").unwrap();
        let err = writer.create(&path, b"clobber").unwrap_err();

        assert!(err.is_already_exists());
        assert_eq!(fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn missing_parent_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent").join("doc.json");

        let err = AtomicWriter::default().write(&path, b"x").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let writer = AtomicWriter::new(false);

        writer.create(&path, b"a").unwrap();
        let _ = writer.create(&path, b"b");
        writer.write(&path, b"c").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["doc.json".to_string()]);
    }

    #[test]
    fn concurrent_creates_have_one_winner() {
        let dir = tempdir().unwrap();
        let path = Arc::new(dir.path().join("race.json"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = Arc::clone(&path);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    AtomicWriter::new(false)
                        .create(&path, format!("writer {i}").as_bytes())
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn temp_file_names_are_recognized() {
        assert!(is_temp_file(".tmp-a8Fk2x"));
        assert!(!is_temp_file("record.json"));
        assert!(!is_temp_file("_seq"));
    }
}
