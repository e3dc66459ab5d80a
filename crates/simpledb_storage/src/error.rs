//! Error types for storage operations.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Every variant carries the path it concerns so callers can report
/// actionable failures without wrapping.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The target path does not exist.
    #[error("not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The target path already exists and the operation must not overwrite it.
    #[error("already exists: {}", path.display())]
    AlreadyExists {
        /// The existing path.
        path: PathBuf,
    },

    /// Any other I/O failure.
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        /// The operation that failed (e.g. `"read"`, `"rename"`).
        op: &'static str,
        /// The path the operation was addressed to.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Classifies an `io::Error` raised by `op` on `path`.
    ///
    /// `NotFound` and `AlreadyExists` kinds map to their dedicated variants;
    /// everything else becomes [`StorageError::Io`].
    pub fn from_io(op: &'static str, path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                path: path.to_path_buf(),
            },
            _ => Self::Io {
                op,
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Returns true if this is a [`StorageError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a [`StorageError::AlreadyExists`].
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns the path the error concerns.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path } | Self::AlreadyExists { path } | Self::Io { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_io_kinds() {
        let path = Path::new("/tmp/x");

        let err = StorageError::from_io("read", path, io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = StorageError::from_io(
            "link",
            path,
            io::Error::from(io::ErrorKind::AlreadyExists),
        );
        assert!(err.is_already_exists());

        let err = StorageError::from_io(
            "write",
            path,
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, StorageError::Io { op: "write", .. }));
        assert_eq!(err.path(), path);
    }

    #[test]
    fn display_includes_operation_and_path() {
        let err = StorageError::from_io(
            "rename",
            Path::new("/data/users/a.json"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        let msg = err.to_string();
        assert!(msg.contains("rename"));
        assert!(msg.contains("/data/users/a.json"));
    }
}
