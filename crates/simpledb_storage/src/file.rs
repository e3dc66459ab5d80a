//! Plain filesystem helpers with path-carrying errors.

use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Kind of a directory entry, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Dir,
    /// Symlink, socket, or anything else.
    Other,
}

/// A directory entry returned by [`list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (lossily converted if not valid UTF-8).
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
}

/// Reads the whole file at `path`.
pub fn read_file(path: &Path) -> StorageResult<Vec<u8>> {
    fs::read(path).map_err(|e| StorageError::from_io("read", path, e))
}

/// Returns whether `path` exists.
///
/// Absence is `Ok(false)`; any other failure (e.g. permission denied on a
/// parent) is an error.
pub fn file_exists(path: &Path) -> StorageResult<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::from_io("stat", path, e)),
    }
}

/// Removes the file at `path`, optionally syncing its directory.
pub fn remove_file(path: &Path, sync: bool) -> StorageResult<()> {
    fs::remove_file(path).map_err(|e| StorageError::from_io("remove", path, e))?;
    if sync {
        sync_parent(path)?;
    }
    Ok(())
}

/// Moves `from` to `to` with a single rename, creating `to`'s parent if
/// needed.
pub fn move_file(from: &Path, to: &Path, sync: bool) -> StorageResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::from_io("mkdir", parent, e))?;
    }
    fs::rename(from, to).map_err(|e| StorageError::from_io("rename", from, e))?;
    if sync {
        sync_parent(from)?;
        sync_parent(to)?;
    }
    Ok(())
}

/// Ensures the directory at `path` exists.
///
/// Returns `true` if it was created by this call.
pub fn ensure_dir(path: &Path, sync: bool) -> StorageResult<bool> {
    match fs::create_dir(path) {
        Ok(()) => {
            if sync {
                sync_parent(path)?;
            }
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(false),
        Err(e) => Err(StorageError::from_io("mkdir", path, e)),
    }
}

/// Lists the entries of the directory at `path`, in no particular order.
pub fn list_dir(path: &Path) -> StorageResult<Vec<DirEntry>> {
    let reader = fs::read_dir(path).map_err(|e| StorageError::from_io("list", path, e))?;

    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| StorageError::from_io("list", path, e))?;
        let kind = match entry.file_type() {
            Ok(t) if t.is_file() => EntryKind::File,
            Ok(t) if t.is_dir() => EntryKind::Dir,
            Ok(_) => EntryKind::Other,
            Err(e) => return Err(StorageError::from_io("stat", &entry.path(), e)),
        };
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        });
    }
    Ok(entries)
}

/// Returns how long ago the file at `path` was last modified.
///
/// Clock skew (mtime in the future) yields zero.
pub fn modified_age(path: &Path) -> StorageResult<Duration> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| StorageError::from_io("stat", path, e))?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO))
}

/// Syncs the directory containing `path`.
pub fn sync_parent(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => sync_dir(parent),
        _ => sync_dir(Path::new(".")),
    }
}

/// Syncs a directory so that entry creations, renames and removals in it are
/// durable.
///
/// On Windows, directory fsync is not supported in the same way as Unix;
/// NTFS journaling covers metadata durability, so this is a no-op there.
#[cfg(unix)]
pub fn sync_dir(path: &Path) -> StorageResult<()> {
    let dir = File::open(path).map_err(|e| StorageError::from_io("open dir", path, e))?;
    dir.sync_all()
        .map_err(|e| StorageError::from_io("sync dir", path, e))
}

/// Syncs a directory so that entry creations, renames and removals in it are
/// durable.
#[cfg(not(unix))]
pub fn sync_dir(_path: &Path) -> StorageResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn exists_distinguishes_absence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.json");

        assert!(!file_exists(&path).unwrap());
        fs::write(&path, b"{}").unwrap();
        assert!(file_exists(&path).unwrap());
    }

    #[test]
    fn read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let err = read_file(&dir.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn remove_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let err = remove_file(&dir.path().join("nope"), true).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn ensure_dir_reports_creation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users");

        assert!(ensure_dir(&path, true).unwrap());
        assert!(!ensure_dir(&path, true).unwrap());
        assert!(path.is_dir());
    }

    #[test]
    fn ensure_dir_over_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users");
        fs::write(&path, b"").unwrap();

        assert!(ensure_dir(&path, false).is_err());
    }

    #[test]
    fn list_dir_reports_kinds() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("file.json"), b"{}").unwrap();

        let mut entries = list_dir(dir.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                DirEntry {
                    name: "file.json".into(),
                    kind: EntryKind::File
                },
                DirEntry {
                    name: "sub".into(),
                    kind: EntryKind::Dir
                },
            ]
        );
    }

    #[test]
    fn list_missing_dir_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(list_dir(&dir.path().join("absent"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn move_file_creates_destination_parent() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("bad.json");
        let to = dir.path().join("q").join("users").join("bad.json");
        fs::write(&from, b"garbage").unwrap();

        move_file(&from, &to, true).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"garbage");
    }

    #[test]
    fn fresh_file_has_small_age() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a");
        fs::write(&path, b"").unwrap();

        assert!(modified_age(&path).unwrap() < Duration::from_secs(60));
    }
}
