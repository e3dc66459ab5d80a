//! Consistency checking and repair.
//!
//! [`Store::check`](crate::Store::check) walks the registry and the store
//! directory and reports every inconsistency it finds as a [`Problem`].
//! [`Store::fix`](crate::Store::fix) runs the same walk and applies the
//! default repair for each problem as it goes.

mod checker;

pub(crate) use checker::Checker;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Category of a detected inconsistency.
///
/// Serializes to a stable snake_case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// The registry file is absent.
    ///
    /// Fix writes the registry this store holds in memory, not an empty
    /// one. Collections registered while the store is open survive the
    /// deletion of the file; the rewritten registry is empty only when the
    /// store was opened without a readable registry.
    RegistryMissing,
    /// The registry file does not parse.
    RegistryCorrupt,
    /// A registry entry names an unrecognized id algorithm.
    UnknownAlgorithm,
    /// A registered collection has no directory.
    MissingDirectory,
    /// A directory with a valid collection name is not registered.
    OrphanDirectory,
    /// A directory name is not a valid collection name. Not repaired.
    InvalidDirectory,
    /// A sequential collection has no counter file.
    MissingSequence,
    /// A counter file does not parse.
    InvalidSequence,
    /// A counter is below the highest sequential id present.
    SequenceBehind,
    /// A file name in a collection is not a valid record file name.
    InvalidRecordId,
    /// A record payload is not a JSON object.
    CorruptRecord,
    /// A record embeds an id different from its file name.
    IdMismatch,
    /// An abandoned atomic-write temp file.
    StaleTempFile,
}

impl ProblemKind {
    /// Returns the stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RegistryMissing => "registry_missing",
            Self::RegistryCorrupt => "registry_corrupt",
            Self::UnknownAlgorithm => "unknown_algorithm",
            Self::MissingDirectory => "missing_directory",
            Self::OrphanDirectory => "orphan_directory",
            Self::InvalidDirectory => "invalid_directory",
            Self::MissingSequence => "missing_sequence",
            Self::InvalidSequence => "invalid_sequence",
            Self::SequenceBehind => "sequence_behind",
            Self::InvalidRecordId => "invalid_record_id",
            Self::CorruptRecord => "corrupt_record",
            Self::IdMismatch => "id_mismatch",
            Self::StaleTempFile => "stale_temp_file",
        }
    }

    /// Returns true if Fix has a repair for this kind.
    #[must_use]
    pub const fn is_repairable(self) -> bool {
        !matches!(self, Self::InvalidDirectory)
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// What is wrong.
    pub kind: ProblemKind,
    /// Human-readable detail.
    pub description: String,
    /// The file or directory concerned.
    pub path: PathBuf,
    /// Whether Fix repaired it. Always false for Check.
    pub fixed: bool,
}

impl Problem {
    pub(crate) fn new(kind: ProblemKind, path: PathBuf, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            path,
            fixed: false,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.kind,
            self.description,
            self.path.display()
        )?;
        if self.fixed {
            f.write_str(" [fixed]")?;
        }
        Ok(())
    }
}

/// Depth and scope of a check or fix pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Also read every record payload and compare counters against the
    /// highest id present.
    pub deep: bool,
    /// Restrict the pass to one collection. Registry-level problems are
    /// then reported but not repaired.
    pub collection: Option<String>,
}

impl CheckOptions {
    /// Shallow, store-wide options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets deep checking.
    #[must_use]
    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    /// Restricts the pass to `name`.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }
}

/// Result of [`Store::check`](crate::Store::check).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Problems found, in detection order.
    pub problems: Vec<Problem>,
}

impl CheckReport {
    /// Returns true if nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    /// Returns the problems of one kind.
    pub fn of_kind(&self, kind: ProblemKind) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(move |p| p.kind == kind)
    }
}

/// Result of [`Store::fix`](crate::Store::fix).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixReport {
    /// Problems found, with `fixed` set on those repaired.
    pub problems: Vec<Problem>,
    /// Number of problems repaired.
    pub fixed: usize,
}

impl FixReport {
    /// Returns the problems that remain after the pass.
    pub fn unresolved(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| !p.fixed)
    }

    /// Returns the problems of one kind.
    pub fn of_kind(&self, kind: ProblemKind) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(move |p| p.kind == kind)
    }
}
