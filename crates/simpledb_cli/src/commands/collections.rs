//! Collection listing and registration.

use super::open_existing;
use crate::Format;
use serde::Serialize;
use simpledb_core::{IdAlgorithm, Store};
use std::path::Path;

/// One row of the collection listing.
#[derive(Debug, Serialize)]
pub struct CollectionSummary {
    /// Collection name.
    pub name: String,
    /// Registered id algorithm.
    #[serde(rename = "idAlgorithm")]
    pub id_algorithm: String,
    /// Number of records, if the directory could be listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
}

/// Collects the listing for an open store.
pub fn summarize(store: &Store) -> simpledb_core::CoreResult<Vec<CollectionSummary>> {
    store
        .collections()?
        .into_iter()
        .map(|name| {
            let metadata = store.collection_metadata(&name)?;
            let records = match store.raw_collection(&name).count() {
                Ok(count) => Some(count),
                Err(e) => {
                    tracing::warn!(collection = %name, error = %e, "cannot count records");
                    None
                }
            };
            Ok(CollectionSummary {
                name,
                id_algorithm: metadata.id_algorithm,
                records,
            })
        })
        .collect()
}

/// Runs the `collections` command.
pub fn list(path: &Path, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let summaries = summarize(&store)?;
    store.close();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        Format::Text => {
            if summaries.is_empty() {
                println!("No collections in {}", path.display());
            }
            for summary in &summaries {
                let records = summary
                    .records
                    .map_or_else(|| "?".to_string(), |n| n.to_string());
                println!(
                    "{:<24} {:<8} {:>10} records",
                    summary.name, summary.id_algorithm, records
                );
            }
        }
    }
    Ok(())
}

/// Runs the `add-collection` command.
pub fn add(
    path: &Path,
    name: &str,
    algorithm: IdAlgorithm,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(path)?;
    store.add_collection(name, algorithm)?;
    store.close();
    println!("Added collection {name} ({algorithm})");
    Ok(())
}
