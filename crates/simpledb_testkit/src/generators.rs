//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that respects the store's naming and payload rules.

use proptest::prelude::*;
use serde_json::{Map, Value};
use simpledb_core::IdAlgorithm;

/// Strategy for generating valid record ids.
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9][A-Za-z0-9_-]{0,39}").expect("Invalid regex")
}

/// Strategy for generating strings that are not valid record ids.
pub fn invalid_record_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("x".repeat(201)),
        prop::string::string_regex("[a-z]{0,5}[./ ~:][a-z]{0,5}").expect("Invalid regex"),
    ]
}

/// Strategy for generating valid collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9]{0,31}").expect("Invalid regex")
}

/// Strategy for picking an id algorithm that can generate ids.
pub fn generating_algorithm_strategy() -> impl Strategy<Value = IdAlgorithm> {
    prop_oneof![
        Just(IdAlgorithm::Cuid2),
        Just(IdAlgorithm::Tid62),
        Just(IdAlgorithm::Seq10),
        Just(IdAlgorithm::Seq36),
    ]
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for generating JSON objects without an `id` field.
pub fn json_object_strategy() -> impl Strategy<Value = Map<String, Value>> {
    let value = scalar_strategy().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    });

    prop::collection::btree_map("[a-z]{1,10}", value, 0..6).prop_map(|fields| {
        fields
            .into_iter()
            .filter(|(key, _)| key != "id")
            .collect()
    })
}

/// Strategy for generating record payload bytes.
pub fn record_data_strategy() -> impl Strategy<Value = Vec<u8>> {
    json_object_strategy()
        .prop_map(|map| serde_json::to_vec(&Value::Object(map)).expect("Failed to encode JSON"))
}

/// An operation against one collection.
#[derive(Debug, Clone)]
pub enum RecordOperation {
    /// Create with a generated id
    Create {
        /// Payload
        data: Vec<u8>,
    },
    /// Create under a chosen id
    CreateWithId {
        /// Record id
        id: String,
        /// Payload
        data: Vec<u8>,
    },
    /// Replace a record
    Update {
        /// Record id
        id: String,
        /// Payload
        data: Vec<u8>,
    },
    /// Delete a record
    Delete {
        /// Record id
        id: String,
    },
    /// Read a record
    Read {
        /// Record id
        id: String,
    },
}

/// Strategy for record operations over a small id space, so that
/// operations collide often.
pub fn record_operation_strategy() -> impl Strategy<Value = RecordOperation> {
    let id = prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(str::to_string);
    prop_oneof![
        2 => record_data_strategy().prop_map(|data| RecordOperation::Create { data }),
        3 => (id.clone(), record_data_strategy())
            .prop_map(|(id, data)| RecordOperation::CreateWithId { id, data }),
        2 => (id.clone(), record_data_strategy())
            .prop_map(|(id, data)| RecordOperation::Update { id, data }),
        1 => id.clone().prop_map(|id| RecordOperation::Delete { id }),
        2 => id.prop_map(|id| RecordOperation::Read { id }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<RecordOperation>> {
    prop::collection::vec(record_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simpledb_core::{validate_collection_name, validate_id};

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn record_ids_are_valid(id in record_id_strategy()) {
            prop_assert!(validate_id(&id).is_ok());
        }

        #[test]
        fn invalid_ids_are_rejected(id in invalid_record_id_strategy()) {
            prop_assert!(validate_id(&id).is_err());
        }

        #[test]
        fn collection_names_are_valid(name in collection_name_strategy()) {
            prop_assert!(validate_collection_name(&name).is_ok());
        }

        #[test]
        fn record_data_is_an_object_without_id(data in record_data_strategy()) {
            let value: Value = serde_json::from_slice(&data).unwrap();
            let object = value.as_object().unwrap();
            prop_assert!(!object.contains_key("id"));
        }
    }
}
