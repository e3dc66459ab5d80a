//! Error types for SimpleDB core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification of a [`CoreError`].
///
/// Callers that only need to branch on the failure category (retry, report
/// "not found", etc.) should match on this instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A record or collection is absent where presence was required.
    NotFound,
    /// The target id or collection is already present, or id generation
    /// exhausted its collision-retry budget.
    AlreadyExists,
    /// An id or collection name violates the character-set rule.
    InvalidId,
    /// The caller supplied a payload or argument the store cannot accept.
    InvalidInput,
    /// The store has been closed.
    Closed,
    /// Filesystem failure or unparsable on-disk content.
    Io,
}

/// Errors that can occur in SimpleDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage primitive error.
    #[error("storage error: {0}")]
    Storage(#[from] simpledb_storage::StorageError),

    /// JSON encoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Record not found.
    #[error("record not found: {id} in collection {collection}")]
    RecordNotFound {
        /// The collection searched.
        collection: String,
        /// The record id that was not found.
        id: String,
    },

    /// Collection not registered.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Name of the collection.
        name: String,
    },

    /// Record already exists.
    #[error("record already exists: {id} in collection {collection}")]
    AlreadyExists {
        /// The collection written to.
        collection: String,
        /// The conflicting record id.
        id: String,
    },

    /// Collection already registered.
    #[error("collection already exists: {name}")]
    CollectionExists {
        /// Name of the collection.
        name: String,
    },

    /// Auto-generated ids kept colliding.
    #[error("could not allocate an unused id in collection {collection} after {attempts} attempts")]
    IdSpaceExhausted {
        /// The collection written to.
        collection: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Record id violates the id character-set rule.
    #[error("invalid id {id:?}: {reason}")]
    InvalidId {
        /// The rejected id.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Collection name violates the naming rule.
    #[error("invalid collection name {name:?}: {reason}")]
    InvalidCollectionName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Caller-supplied payload is unusable.
    #[error("invalid data: {message}")]
    InvalidData {
        /// Description of the problem.
        message: String,
    },

    /// Unrecognized id algorithm name.
    #[error("unknown id algorithm: {name}")]
    UnknownAlgorithm {
        /// The unrecognized name.
        name: String,
    },

    /// The collection's id algorithm cannot generate ids.
    #[error("collection {collection} uses caller-supplied ids; use create_with_id")]
    GenerationUnsupported {
        /// The collection written to.
        collection: String,
    },

    /// A sequential counter reached the largest representable value.
    #[error("sequence exhausted in collection {collection}")]
    SequenceExhausted {
        /// The collection whose counter overflowed.
        collection: String,
    },

    /// A sequence counter file is unreadable.
    #[error("corrupt sequence file {}: {message}", path.display())]
    CorruptSequence {
        /// Path of the counter file.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    /// A record file exists but its content is unusable.
    #[error("corrupt record {}: {message}", path.display())]
    CorruptRecord {
        /// Path of the record file.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    /// The registry document exists but cannot be parsed.
    #[error("corrupt registry {}: {message}; run fix", path.display())]
    CorruptRegistry {
        /// Path of the registry document.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid store layout or format version.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Another process holds the store directory lock.
    #[error("store locked: another process has exclusive access")]
    DatabaseLocked,

    /// Store is closed.
    #[error("store is closed")]
    Closed,
}

impl CoreError {
    /// Returns the coarse category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        use simpledb_storage::StorageError;

        match self {
            Self::RecordNotFound { .. } | Self::CollectionNotFound { .. } => ErrorKind::NotFound,
            Self::Storage(StorageError::NotFound { .. }) => ErrorKind::NotFound,
            Self::AlreadyExists { .. }
            | Self::CollectionExists { .. }
            | Self::IdSpaceExhausted { .. } => ErrorKind::AlreadyExists,
            Self::Storage(StorageError::AlreadyExists { .. }) => ErrorKind::AlreadyExists,
            Self::InvalidId { .. } | Self::InvalidCollectionName { .. } => ErrorKind::InvalidId,
            Self::InvalidData { .. }
            | Self::UnknownAlgorithm { .. }
            | Self::GenerationUnsupported { .. } => ErrorKind::InvalidInput,
            Self::Closed => ErrorKind::Closed,
            Self::Storage(StorageError::Io { .. })
            | Self::Json(_)
            | Self::Io(_)
            | Self::SequenceExhausted { .. }
            | Self::CorruptSequence { .. }
            | Self::CorruptRecord { .. }
            | Self::CorruptRegistry { .. }
            | Self::InvalidFormat { .. }
            | Self::DatabaseLocked => ErrorKind::Io,
        }
    }

    /// Returns true if this error means "absent".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true if this error means "already present".
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    /// Creates a record not found error.
    pub fn record_not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates a collection not found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    /// Creates a record already exists error.
    pub fn already_exists(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates an invalid id error.
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid collection name error.
    pub fn invalid_collection_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCollectionName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Creates a corrupt record error.
    pub fn corrupt_record(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptRecord {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a corrupt sequence error.
    pub fn corrupt_sequence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptSequence {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a corrupt registry error.
    pub fn corrupt_registry(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptRegistry {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simpledb_storage::StorageError;

    #[test]
    fn kinds_collapse_variants() {
        assert_eq!(
            CoreError::record_not_found("users", "a").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::collection_not_found("users").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::IdSpaceExhausted {
                collection: "users".into(),
                attempts: 5
            }
            .kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            CoreError::invalid_collection_name("a-b", "not alphanumeric").kind(),
            ErrorKind::InvalidId
        );
        assert_eq!(CoreError::Closed.kind(), ErrorKind::Closed);
        assert_eq!(
            CoreError::corrupt_record("/x/a.json", "eof").kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn storage_errors_keep_their_category() {
        let err: CoreError = StorageError::NotFound {
            path: "/x".into(),
        }
        .into();
        assert!(err.is_not_found());

        let err: CoreError = StorageError::AlreadyExists {
            path: "/x".into(),
        }
        .into();
        assert!(err.is_already_exists());
    }
}
