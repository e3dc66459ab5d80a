//! Fuzz testing harnesses for SimpleDB.
//!
//! This module provides fuzz targets that can be used with cargo-fuzz
//! or other fuzzing frameworks. Every target must return normally for
//! any input; an error result is fine, a panic is a bug.

use crate::fixtures::test_config;
use simpledb_core::record::{decode_payload, encode_payload, inspect_payload};
use simpledb_core::{
    validate_collection_name, validate_id, CheckOptions, IdAlgorithm, Registry, SequenceFormat,
    Store,
};
use std::path::Path;

/// Fuzz target for payload encoding and decoding.
///
/// Anything `encode_payload` accepts must decode again with the id put
/// back as the first field.
pub fn fuzz_payload(data: &[u8]) {
    let _ = inspect_payload("x", data);
    let _ = decode_payload(Path::new("x.json"), "x", data);

    if let Ok(stored) = encode_payload(Some("x"), data) {
        let decoded = decode_payload(Path::new("x.json"), "x", &stored)
            .expect("encoded payload failed to decode");
        assert!(decoded.starts_with(br#"{"id":"x""#), "id is not the first field");
    }
}

/// Fuzz target for id and collection name validation.
pub fn fuzz_names(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    if validate_id(&text).is_ok() {
        assert!(!text.is_empty());
        assert!(!text.contains(['/', '\\', '.']));
    }
    let _ = validate_collection_name(&text);
}

/// Fuzz target for sequence counter parsing.
pub fn fuzz_sequence(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    for format in [SequenceFormat::DECIMAL, SequenceFormat::BASE36] {
        if let Some(value) = format.parse(&text) {
            assert_eq!(format.parse(&format.format(value)), Some(value));
        }
    }
    let _ = SequenceFormat::infer(&text);
}

/// Fuzz target for registry decoding.
pub fn fuzz_registry(data: &[u8]) {
    if let Ok(registry) = Registry::decode(data) {
        let _ = registry.check_version();
        for name in registry.names() {
            if let Some(metadata) = registry.get(&name) {
                let _ = metadata.algorithm();
            }
        }
    }
}

/// Structured fuzzing input for collection operations.
#[derive(Debug, Clone)]
pub enum FuzzOp {
    /// Create with a generated id.
    Create {
        /// Payload bytes.
        data: Vec<u8>,
    },
    /// Create under an id derived from one input byte.
    CreateWithId {
        /// Id selector.
        id: u8,
        /// Payload bytes.
        data: Vec<u8>,
    },
    /// Read a record.
    Read {
        /// Id selector.
        id: u8,
    },
    /// Delete a record.
    Delete {
        /// Id selector.
        id: u8,
    },
    /// List every record.
    List,
}

/// Maps an id selector to a small id space, including a few invalid ids.
fn selected_id(id: u8) -> String {
    match id % 8 {
        0 => String::new(),
        1 => "../escape".to_string(),
        n => format!("k{n}"),
    }
}

impl FuzzOp {
    /// Parses operations from fuzzer input.
    pub fn parse_sequence(data: &[u8]) -> Vec<FuzzOp> {
        let mut ops = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let op_type = data[offset];
            offset += 1;

            let op = match op_type % 5 {
                0 | 1 => {
                    let Some(&id) = data.get(offset) else { break };
                    let Some(&len) = data.get(offset + 1) else { break };
                    offset += 2;
                    let end = (offset + len as usize).min(data.len());
                    let payload = data[offset..end].to_vec();
                    offset = end;

                    if op_type % 5 == 0 {
                        FuzzOp::Create { data: payload }
                    } else {
                        FuzzOp::CreateWithId { id, data: payload }
                    }
                }
                2 | 3 => {
                    let Some(&id) = data.get(offset) else { break };
                    offset += 1;
                    if op_type % 5 == 2 {
                        FuzzOp::Read { id }
                    } else {
                        FuzzOp::Delete { id }
                    }
                }
                _ => FuzzOp::List,
            };

            ops.push(op);
        }

        ops
    }

    /// Executes operations against `collection` in `store`.
    pub fn execute_sequence(ops: &[FuzzOp], store: &Store, collection: &str) {
        let collection = store.raw_collection(collection);
        for op in ops {
            match op {
                FuzzOp::Create { data } => {
                    let _ = collection.create(data);
                }
                FuzzOp::CreateWithId { id, data } => {
                    let _ = collection.create_with_id(&selected_id(*id), data);
                }
                FuzzOp::Read { id } => {
                    let _ = collection.read(&selected_id(*id));
                }
                FuzzOp::Delete { id } => {
                    let _ = collection.delete(&selected_id(*id));
                }
                FuzzOp::List => {
                    if let Ok(items) = collection.items("") {
                        for item in items {
                            let _ = item;
                        }
                    }
                }
            }
        }
    }
}

/// Fuzz target for collection operations.
///
/// Runs the parsed operations against a fresh store and then checks that
/// the store reports itself consistent.
pub fn fuzz_store_operations(data: &[u8]) {
    let Ok(dir) = tempfile::tempdir() else { return };
    let Ok(store) = Store::open_with_config(dir.path(), test_config()) else {
        return;
    };
    if store.add_collection("fuzz", IdAlgorithm::Seq36).is_err() {
        return;
    }

    FuzzOp::execute_sequence(&FuzzOp::parse_sequence(data), &store, "fuzz");

    let report = store
        .check_with(&CheckOptions::new().deep(true))
        .expect("check failed");
    assert!(
        report.is_clean(),
        "operations left the store inconsistent: {:?}",
        report.problems
    );
    store.close();
}
