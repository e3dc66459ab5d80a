//! Record identifiers: validation rules and generation strategies.
//!
//! Every collection is registered with one [`IdAlgorithm`]. The algorithm
//! decides how [`RawCollection::create`](crate::RawCollection::create)
//! picks an id:
//!
//! | name    | kind        | example               |
//! |---------|-------------|-----------------------|
//! | `cuid2` | random      | `k3n0q8y2c1vz9w4m7a5e6b0t` |
//! | `tid62` | time-sorted | `0E3hFq9kT1mX2bYcA`   |
//! | `seq10` | sequential  | `0000000042`          |
//! | `seq36` | sequential  | `000001a`             |
//! | `custom`| caller      | whatever the caller passes to `create_with_id` |
//!
//! All generated ids satisfy [`validate_id`], and for `tid62`, `seq10` and
//! `seq36` the lexicographic order of ids matches creation order.

mod cuid;
mod generator;
mod sequence;
mod tid62;

pub use cuid::{new_cuid, CUID_LEN};
pub use generator::IdGenerator;
pub use sequence::{SequenceFile, SequenceFormat, SEQUENCE_FILE};
pub use tid62::{
    encode_tid62, new_tid62, tid62_at, tid62_timestamp, tid62_with_prefix, TID62_ALPHABET,
    TID62_EPOCH, TID62_LEN,
};

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;

/// Longest accepted record id.
pub const MAX_ID_LEN: usize = 200;

/// Longest accepted collection name.
pub const MAX_COLLECTION_NAME_LEN: usize = 64;

/// Non-alphanumeric characters allowed in record ids, reserved for
/// caller-defined prefix grouping (e.g. `invoice-2024_0001`).
pub const ID_SEPARATORS: [char; 2] = ['-', '_'];

/// Id generation strategy of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdAlgorithm {
    /// Stateless collision-resistant random ids, 24 characters.
    Cuid2,
    /// Time-sortable base62 ids, 17 characters.
    Tid62,
    /// Sequential decimal ids, zero-padded to 10 digits.
    Seq10,
    /// Sequential base-36 ids, zero-padded to 7 digits.
    Seq36,
    /// Ids are always supplied by the caller.
    Custom,
}

impl IdAlgorithm {
    /// All algorithms, in registry-name order.
    pub const ALL: [IdAlgorithm; 5] = [
        IdAlgorithm::Cuid2,
        IdAlgorithm::Tid62,
        IdAlgorithm::Seq10,
        IdAlgorithm::Seq36,
        IdAlgorithm::Custom,
    ];

    /// Returns the name stored in the registry.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cuid2 => "cuid2",
            Self::Tid62 => "tid62",
            Self::Seq10 => "seq10",
            Self::Seq36 => "seq36",
            Self::Custom => "custom",
        }
    }

    /// Returns true if the algorithm keeps a persisted counter.
    #[must_use]
    pub const fn requires_state(self) -> bool {
        matches!(self, Self::Seq10 | Self::Seq36)
    }

    /// Returns the counter format for sequential algorithms.
    #[must_use]
    pub const fn sequence_format(self) -> Option<SequenceFormat> {
        match self {
            Self::Seq10 => Some(SequenceFormat::DECIMAL),
            Self::Seq36 => Some(SequenceFormat::BASE36),
            _ => None,
        }
    }

    /// Returns the sequential algorithm using `format`.
    #[must_use]
    pub fn from_sequence_format(format: SequenceFormat) -> Self {
        if format == SequenceFormat::BASE36 {
            Self::Seq36
        } else {
            Self::Seq10
        }
    }
}

impl fmt::Display for IdAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IdAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| CoreError::UnknownAlgorithm { name: s.to_string() })
    }
}

/// Checks a record id against the id character-set rule.
///
/// Ids are 1 to [`MAX_ID_LEN`] ASCII alphanumerics or [`ID_SEPARATORS`].
pub fn validate_id(id: &str) -> CoreResult<()> {
    if id.is_empty() {
        return Err(CoreError::invalid_id(id, "empty"));
    }
    if id.len() > MAX_ID_LEN {
        return Err(CoreError::invalid_id(
            id,
            format!("longer than {MAX_ID_LEN} characters"),
        ));
    }
    if let Some(c) = id
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !ID_SEPARATORS.contains(c))
    {
        return Err(CoreError::invalid_id(id, format!("character {c:?} not allowed")));
    }
    Ok(())
}

/// Checks a collection name: 1 to [`MAX_COLLECTION_NAME_LEN`] ASCII
/// alphanumerics.
pub fn validate_collection_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::invalid_collection_name(name, "empty"));
    }
    if name.len() > MAX_COLLECTION_NAME_LEN {
        return Err(CoreError::invalid_collection_name(
            name,
            format!("longer than {MAX_COLLECTION_NAME_LEN} characters"),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::invalid_collection_name(
            name,
            "only ASCII letters and digits are allowed",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn algorithm_names_round_trip() {
        for alg in IdAlgorithm::ALL {
            assert_eq!(alg.name().parse::<IdAlgorithm>().unwrap(), alg);
        }
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = "uuid".parse::<IdAlgorithm>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownAlgorithm { ref name } if name == "uuid"));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn only_sequential_algorithms_need_state() {
        assert!(IdAlgorithm::Seq10.requires_state());
        assert!(IdAlgorithm::Seq36.requires_state());
        assert!(!IdAlgorithm::Cuid2.requires_state());
        assert!(!IdAlgorithm::Tid62.requires_state());
        assert!(!IdAlgorithm::Custom.requires_state());
    }

    #[test]
    fn id_rules() {
        assert!(validate_id("abc").is_ok());
        assert!(validate_id("user-42_b").is_ok());
        assert!(validate_id("0000000001").is_ok());

        assert!(validate_id("").is_err());
        assert!(validate_id("a.json").is_err());
        assert!(validate_id("../etc").is_err());
        assert!(validate_id("a b").is_err());
        assert!(validate_id("caf\u{e9}").is_err());
        assert!(validate_id(&"x".repeat(MAX_ID_LEN + 1)).is_err());
        assert!(validate_id(&"x".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn collection_name_rules() {
        assert!(validate_collection_name("users").is_ok());
        assert!(validate_collection_name("Users2024").is_ok());

        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("user-data").is_err());
        assert!(validate_collection_name("_registry").is_err());
        assert!(validate_collection_name(&"a".repeat(65)).is_err());
    }

    proptest! {
        #[test]
        fn ids_from_allowed_alphabet_validate(id in "[A-Za-z0-9_-]{1,200}") {
            prop_assert!(validate_id(&id).is_ok());
        }

        #[test]
        fn ids_with_path_characters_fail(prefix in "[a-z]{0,5}", bad in "[./\\\\ ]", suffix in "[a-z]{0,5}") {
            let id = format!("{prefix}{bad}{suffix}");
            prop_assert_eq!(validate_id(&id).unwrap_err().kind(), ErrorKind::InvalidId);
        }
    }
}
