//! # SimpleDB Testkit
//!
//! Test utilities for SimpleDB.
//!
//! This crate provides:
//! - Test fixtures and store helpers
//! - Property-based test generators using proptest
//! - A model harness that checks a collection against an in-memory map
//! - Fuzz testing harnesses
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use simpledb_core::IdAlgorithm;
//! use simpledb_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     store.add_collection("test", IdAlgorithm::Cuid2).unwrap();
//!     let id = store.raw_collection("test").create(b"{}").unwrap();
//!     assert_eq!(id.len(), 24);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
