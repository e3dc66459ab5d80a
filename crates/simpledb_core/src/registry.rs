//! Store registry: which collections exist and how they generate ids.
//!
//! Persisted as a small JSON document at the store root:
//!
//! ```json
//! {
//!   "version": "1",
//!   "collections": {
//!     "users": { "idAlgorithm": "tid62" },
//!     "invoices": { "idAlgorithm": "seq10" }
//!   }
//! }
//! ```

use crate::error::{CoreError, CoreResult};
use crate::id::IdAlgorithm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File name of the registry document.
pub const REGISTRY_FILE: &str = "_registry.json";

/// Current registry format version.
pub const REGISTRY_VERSION: &str = "1";

/// Configuration of one registered collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Registry name of the id algorithm.
    ///
    /// Kept as text so that a registry naming an unknown algorithm still
    /// loads and can be reported by Check.
    #[serde(rename = "idAlgorithm")]
    pub id_algorithm: String,
}

impl CollectionMetadata {
    /// Creates metadata for `algorithm`.
    #[must_use]
    pub fn new(algorithm: IdAlgorithm) -> Self {
        Self {
            id_algorithm: algorithm.name().to_string(),
        }
    }

    /// Resolves the algorithm name.
    ///
    /// # Errors
    ///
    /// `UnknownAlgorithm` if the name is not recognized.
    pub fn algorithm(&self) -> CoreResult<IdAlgorithm> {
        self.id_algorithm.parse()
    }
}

/// The registry document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Format version.
    pub version: String,
    /// Collection name to configuration.
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionMetadata>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry at the current version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: REGISTRY_VERSION.to_string(),
            collections: BTreeMap::new(),
        }
    }

    /// Gets a collection's metadata by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CollectionMetadata> {
        self.collections.get(name)
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Registers or replaces a collection.
    pub fn insert(&mut self, name: impl Into<String>, metadata: CollectionMetadata) {
        self.collections.insert(name.into(), metadata);
    }

    /// Returns registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    /// Verifies the document's major version is supported.
    pub fn check_version(&self) -> CoreResult<()> {
        let major = self.version.split('.').next().unwrap_or_default();
        if major != REGISTRY_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported registry version {:?}, expected {REGISTRY_VERSION}",
                self.version
            )));
        }
        Ok(())
    }

    /// Encodes the registry as pretty-printed JSON.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Decodes a registry document.
    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
