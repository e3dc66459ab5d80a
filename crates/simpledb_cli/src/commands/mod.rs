//! CLI command implementations.

pub mod check;
pub mod collections;

use simpledb_core::{Config, CoreResult, Store};
use std::path::Path;

/// Opens an existing store for maintenance.
fn open_existing(path: &Path) -> CoreResult<Store> {
    Store::open_with_config(path, Config::default().create_if_missing(false))
}
