//! Record payload handling.
//!
//! A record is a JSON object stored in `<id>.json`. The filename is the only
//! source of identity: the `id` field is stripped before writing and put
//! back as the first field when reading.

use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};
use std::path::Path;

/// Name of the identity field injected on read.
pub const ID_FIELD: &str = "id";

/// Extension of record files.
pub const RECORD_EXT: &str = ".json";

/// Returns the file name of record `id`.
#[must_use]
pub fn record_file_name(id: &str) -> String {
    format!("{id}{RECORD_EXT}")
}

/// Returns the id encoded in a record file name, if it has the record
/// extension. The id itself is not validated.
#[must_use]
pub fn id_from_file_name(name: &str) -> Option<&str> {
    name.strip_suffix(RECORD_EXT).filter(|id| !id.is_empty())
}

/// What a stored payload says about its own identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedId {
    /// No `id` field (the normal case).
    Absent,
    /// A legacy `id` field equal to the filename.
    Matches,
    /// A legacy `id` field naming a different record.
    Conflicts(Value),
}

/// Parses caller data into a JSON object.
fn parse_object(data: &[u8]) -> Result<Map<String, Value>, String> {
    match serde_json::from_slice::<Value>(data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", type_name(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn classify(map: &Map<String, Value>, id: &str) -> EmbeddedId {
    match map.get(ID_FIELD) {
        None => EmbeddedId::Absent,
        Some(Value::String(s)) if s == id => EmbeddedId::Matches,
        Some(other) => EmbeddedId::Conflicts(other.clone()),
    }
}

/// Validates caller data and returns the bytes to persist.
///
/// The data must be a JSON object. An `id` field that is `null`, empty, or
/// equal to `id` is removed. When `id` is `None` (the id is generated
/// later) only `null` and empty values are accepted.
///
/// # Errors
///
/// `InvalidData` if the payload is not a JSON object; `InvalidId` if it
/// carries an `id` naming a different record.
pub fn encode_payload(id: Option<&str>, data: &[u8]) -> CoreResult<Vec<u8>> {
    let mut map = parse_object(data).map_err(CoreError::invalid_data)?;

    if let Some(embedded) = map.remove(ID_FIELD) {
        let accepted = match (&embedded, id) {
            (Value::Null, _) => true,
            (Value::String(s), _) if s.is_empty() => true,
            (Value::String(s), Some(id)) => s == id,
            _ => false,
        };
        if !accepted {
            return Err(CoreError::invalid_id(
                embedded.to_string(),
                match id {
                    Some(id) => format!("payload id conflicts with record id {id:?}"),
                    None => "payload carries an id; use create_with_id".to_string(),
                },
            ));
        }
    }

    Ok(serde_json::to_vec(&map)?)
}

/// Returns the stored payload with `id` injected as the first field.
///
/// # Errors
///
/// `CorruptRecord` if the stored content is not a JSON object or carries a
/// conflicting legacy `id`.
pub fn decode_payload(path: &Path, id: &str, stored: &[u8]) -> CoreResult<Vec<u8>> {
    let map = parse_object(stored).map_err(|m| CoreError::corrupt_record(path, m))?;

    if let EmbeddedId::Conflicts(other) = classify(&map, id) {
        return Err(CoreError::corrupt_record(
            path,
            format!("embedded id {other} does not match file name"),
        ));
    }

    let mut out = Map::with_capacity(map.len() + 1);
    out.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    out.extend(map.into_iter().filter(|(k, _)| k != ID_FIELD));

    Ok(serde_json::to_vec(&out)?)
}

/// Inspects stored content for Check.
///
/// Returns the parse error message if the content is not a JSON object.
pub fn inspect_payload(id: &str, stored: &[u8]) -> Result<EmbeddedId, String> {
    parse_object(stored).map(|map| classify(&map, id))
}

/// Rewrites stored content without its `id` field.
pub fn strip_embedded_id(stored: &[u8]) -> Result<Vec<u8>, String> {
    let mut map = parse_object(stored)?;
    map.remove(ID_FIELD);
    serde_json::to_vec(&map).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn value(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn file_names() {
        assert_eq!(record_file_name("abc"), "abc.json");
        assert_eq!(id_from_file_name("abc.json"), Some("abc"));
        assert_eq!(id_from_file_name(".json"), None);
        assert_eq!(id_from_file_name("_seq"), None);
    }

    #[test]
    fn encode_strips_matching_id() {
        let bytes = encode_payload(Some("a1"), br#"{"id":"a1","name":"Ann"}"#).unwrap();
        assert_eq!(value(&bytes), json!({"name": "Ann"}));
    }

    #[test]
    fn encode_strips_blank_ids_before_generation() {
        let bytes = encode_payload(None, br#"{"id":"","n":1}"#).unwrap();
        assert_eq!(value(&bytes), json!({"n": 1}));

        let bytes = encode_payload(None, br#"{"id":null,"n":1}"#).unwrap();
        assert_eq!(value(&bytes), json!({"n": 1}));
    }

    #[test]
    fn encode_rejects_conflicting_id() {
        let err = encode_payload(Some("a1"), br#"{"id":"b2"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidId);

        let err = encode_payload(None, br#"{"id":"b2"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidId);

        let err = encode_payload(Some("7"), br#"{"id":7}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidId);
    }

    #[test]
    fn encode_rejects_non_objects() {
        for bad in [&b"[1,2]"[..], b"42", b"\"s\"", b"{oops"] {
            let err = encode_payload(Some("a"), bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn decode_injects_id_first() {
        let path = Path::new("/s/users/a1.json");
        let bytes = decode_payload(path, "a1", br#"{"name":"Ann","age":3}"#).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"id":"a1","name":"Ann","age":3}"#
        );
    }

    #[test]
    fn decode_tolerates_matching_legacy_id() {
        let path = Path::new("/s/users/a1.json");
        let bytes = decode_payload(path, "a1", br#"{"name":"Ann","id":"a1"}"#).unwrap();
        assert_eq!(value(&bytes), json!({"id": "a1", "name": "Ann"}));
    }

    #[test]
    fn decode_rejects_conflicting_legacy_id() {
        let path = Path::new("/s/users/a1.json");
        let err = decode_payload(path, "a1", br#"{"id":"zz"}"#).unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn decode_rejects_garbage() {
        let path = Path::new("/s/users/a1.json");
        assert!(matches!(
            decode_payload(path, "a1", b"\x00\x01"),
            Err(CoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn inspect_and_strip() {
        assert_eq!(inspect_payload("a", b"{}"), Ok(EmbeddedId::Absent));
        assert_eq!(
            inspect_payload("a", br#"{"id":"a"}"#),
            Ok(EmbeddedId::Matches)
        );
        assert_eq!(
            inspect_payload("a", br#"{"id":"b"}"#),
            Ok(EmbeddedId::Conflicts(json!("b")))
        );
        assert!(inspect_payload("a", b"nope").is_err());

        let stripped = strip_embedded_id(br#"{"id":"b","x":1}"#).unwrap();
        assert_eq!(value(&stripped), json!({"x": 1}));
    }
}
