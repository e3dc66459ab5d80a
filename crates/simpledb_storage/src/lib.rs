//! # SimpleDB Storage
//!
//! Atomic file primitives for SimpleDB.
//!
//! This crate is the lowest layer of SimpleDB. It knows nothing about
//! records, collections or ids - it only moves whole files in and out of
//! place safely.
//!
//! ## Design Principles
//!
//! - Every write goes through a sibling temp file, is synced, then moved
//!   into place; readers never see a partial file
//! - Replacing content (`rename`) and creating content (no-clobber link)
//!   are distinct operations
//! - Errors carry the operation and path that failed
//!
//! ## Example
//!
//! ```rust
//! use simpledb_storage::{read_file, AtomicWriter};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("doc.json");
//!
//! let writer = AtomicWriter::new(true);
//! writer.create(&path, b"{}").unwrap();
//! assert!(writer.create(&path, b"{}").unwrap_err().is_already_exists());
//!
//! writer.write(&path, b"{\"n\":1}").unwrap();
//! assert_eq!(read_file(&path).unwrap(), b"{\"n\":1}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod atomic;
mod error;
mod file;

pub use atomic::{is_temp_file, AtomicWriter, TEMP_PREFIX};
pub use error::{StorageError, StorageResult};
pub use file::{
    ensure_dir, file_exists, list_dir, modified_age, move_file, read_file, remove_file,
    sync_dir, sync_parent, DirEntry, EntryKind,
};
