//! Model-based integration test helpers.
//!
//! [`ModelHarness`] applies operations to a real collection and to an
//! in-memory model side by side, and checks they agree.

use crate::fixtures::TestStore;
use crate::generators::RecordOperation;
use serde_json::{Map, Value};
use simpledb_core::{ErrorKind, IdAlgorithm, RawCollection};
use std::collections::BTreeMap;

/// Name of the collection driven by the harness.
pub const MODEL_COLLECTION: &str = "model";

/// A store plus the records it is expected to hold.
pub struct ModelHarness {
    /// The store under test.
    pub store: TestStore,
    collection: RawCollection,
    /// Expected payloads (without `id`) by record id.
    model: BTreeMap<String, Value>,
}

impl ModelHarness {
    /// Creates a harness over a fresh collection using `algorithm`.
    pub fn new(algorithm: IdAlgorithm) -> Self {
        let store = TestStore::new();
        store
            .add_collection(MODEL_COLLECTION, algorithm)
            .expect("Failed to add collection");
        let collection = store.raw_collection(MODEL_COLLECTION);
        Self {
            store,
            collection,
            model: BTreeMap::new(),
        }
    }

    /// Returns the collection under test.
    pub fn collection(&self) -> &RawCollection {
        &self.collection
    }

    /// Applies one operation to both sides and checks the outcome.
    pub fn apply(&mut self, op: &RecordOperation) {
        match op {
            RecordOperation::Create { data } => {
                let id = self.collection.create(data).expect("create failed");
                let previous = self.model.insert(id.clone(), parse(data));
                assert!(previous.is_none(), "generated id {id} was already in use");
            }
            RecordOperation::CreateWithId { id, data } => {
                let result = self.collection.create_with_id(id, data);
                if self.model.contains_key(id) {
                    assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::AlreadyExists));
                } else {
                    result.expect("create_with_id failed");
                    self.model.insert(id.clone(), parse(data));
                }
            }
            RecordOperation::Update { id, data } => {
                let result = self.collection.update(id, data);
                if self.model.contains_key(id) {
                    result.expect("update failed");
                    self.model.insert(id.clone(), parse(data));
                } else {
                    assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::NotFound));
                }
            }
            RecordOperation::Delete { id } => {
                let result = self.collection.delete(id);
                if self.model.remove(id).is_some() {
                    result.expect("delete failed");
                } else {
                    assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::NotFound));
                }
            }
            RecordOperation::Read { id } => {
                let result = self.collection.read(id);
                match self.model.get(id) {
                    Some(expected) => {
                        let actual = result.expect("read failed");
                        assert_eq!(parse(&actual), with_id(id, expected));
                    }
                    None => {
                        assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::NotFound));
                    }
                }
            }
        }
    }

    /// Verifies every modeled record and the id listing.
    pub fn verify_all(&self) {
        let listed: Vec<String> = self
            .collection
            .ids("")
            .expect("ids failed")
            .collect::<Result<_, _>>()
            .expect("listing failed");
        let expected: Vec<String> = self.model.keys().cloned().collect();
        assert_eq!(listed, expected, "id listing differs from model");

        for item in self.collection.items("").expect("items failed") {
            let (id, payload) = item.expect("item failed");
            assert_eq!(parse(&payload), with_id(&id, &self.model[&id]));
        }
    }

    /// Returns the count of tracked records.
    pub fn tracked_count(&self) -> usize {
        self.model.len()
    }
}

fn parse(data: &[u8]) -> Value {
    serde_json::from_slice(data).expect("payload is not JSON")
}

/// Returns `payload` with `id` as its first field, the shape `read` returns.
fn with_id(id: &str, payload: &Value) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(id.to_string()));
    if let Value::Object(fields) = payload {
        object.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_tracks_simple_sequence() {
        let mut harness = ModelHarness::new(IdAlgorithm::Seq10);
        let data = br#"{"n":1}"#.to_vec();

        harness.apply(&RecordOperation::Create { data: data.clone() });
        harness.apply(&RecordOperation::CreateWithId {
            id: "a".to_string(),
            data: data.clone(),
        });
        harness.apply(&RecordOperation::CreateWithId {
            id: "a".to_string(),
            data,
        });
        harness.apply(&RecordOperation::Delete {
            id: "0000000001".to_string(),
        });
        harness.apply(&RecordOperation::Read {
            id: "0000000001".to_string(),
        });

        assert_eq!(harness.tracked_count(), 1);
        harness.verify_all();
    }
}
