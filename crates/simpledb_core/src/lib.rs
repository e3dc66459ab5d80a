//! # SimpleDB Core
//!
//! Core engine for SimpleDB, an embedded document store that keeps one JSON
//! file per record.
//!
//! This crate provides:
//! - A registry of collections and their id algorithms
//! - Id generation (`cuid2`, `tid62`, `seq10`, `seq36`, `custom`)
//! - Record CRUD and ordered iteration over collections
//! - Consistency check and repair
//!
//! ## Example
//!
//! ```rust
//! use simpledb_core::{IdAlgorithm, Store};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = Store::open(dir.path()).unwrap();
//! store.add_collection("users", IdAlgorithm::Tid62).unwrap();
//!
//! let users = store.raw_collection("users");
//! let id = users.create(br#"{"name":"Ann"}"#).unwrap();
//! assert!(users.exists(&id).unwrap());
//!
//! let ids: Vec<String> = users.ids("").unwrap().collect::<Result<_, _>>().unwrap();
//! assert_eq!(ids, vec![id]);
//!
//! assert!(store.check().unwrap().is_clean());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod check;
mod collection;
mod config;
mod dir;
mod error;
pub mod id;
pub mod record;
pub mod registry;
mod store;

pub use check::{CheckOptions, CheckReport, FixReport, Problem, ProblemKind};
pub use collection::{Collection, Ids, Items, RawCollection, TypedItems};
pub use config::Config;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use id::{
    new_cuid, new_tid62, tid62_at, tid62_timestamp, tid62_with_prefix, validate_collection_name,
    validate_id, IdAlgorithm, SequenceFormat, CUID_LEN, MAX_COLLECTION_NAME_LEN, MAX_ID_LEN,
    TID62_LEN,
};
pub use record::ID_FIELD;
pub use registry::{CollectionMetadata, Registry, REGISTRY_VERSION};
pub use store::Store;
