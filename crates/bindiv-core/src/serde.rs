//! JSON and YAML persistence for plans, reports and distance matrices.
//!
//! Every JSON document bindiv writes goes through [`to_canonical_json_bytes`]:
//! object keys are sorted recursively, so two runs over the same study produce
//! byte-identical reports and the plan hash is stable across serde versions.

use std::fs;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::errors::{BindivError, ErrorInfo};

fn serde_error(code: &str, err: impl ToString) -> BindivError {
    BindivError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn file_error(code: &str, path: &Path, err: impl ToString) -> BindivError {
    BindivError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn sort_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            for (key, mut nested) in entries {
                sort_keys(&mut nested);
                map.insert(key, nested);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sort_keys),
        _ => {}
    }
}

/// Pretty JSON with recursively sorted object keys.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, BindivError> {
    let mut value =
        serde_json::to_value(value).map_err(|err| serde_error("json_serialize", err))?;
    sort_keys(&mut value);
    let mut bytes = Vec::new();
    serde_json::to_writer_pretty(&mut bytes, &value)
        .map_err(|err| serde_error("json_write", err))?;
    Ok(bytes)
}

/// Decodes JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, BindivError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json_deserialize", err))
}

/// Writes `value` as canonical JSON to `path`.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), BindivError> {
    let bytes = to_canonical_json_bytes(value)?;
    fs::write(path, bytes).map_err(|err| file_error("json_file_write", path, err))
}

/// Reads and decodes a JSON document, keeping the path in the error context.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, BindivError> {
    let bytes = fs::read(path).map_err(|err| file_error("json_file_read", path, err))?;
    from_json_slice(&bytes).map_err(|err| match err {
        BindivError::Serde(info) => {
            BindivError::Serde(info.with_context("path", path.display().to_string()))
        }
        other => other,
    })
}

/// Encodes a plan or other document as YAML.
pub fn to_yaml_string<T: Serialize>(value: &T) -> Result<String, BindivError> {
    serde_yaml::to_string(value).map_err(|err| serde_error("yaml_serialize", err))
}

/// Decodes a YAML payload.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, BindivError> {
    serde_yaml::from_slice(data).map_err(|err| serde_error("yaml_deserialize", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_keys_are_sorted() {
        let value = json!({"zeta": {"b": 1, "a": [{"y": 0, "x": 1}]}, "alpha": null});
        let text = String::from_utf8(to_canonical_json_bytes(&value).expect("json")).expect("utf8");
        let alpha = text.find("\"alpha\"").expect("alpha");
        let zeta = text.find("\"zeta\"").expect("zeta");
        assert!(alpha < zeta);
        assert!(text.find("\"a\"").expect("a") < text.find("\"b\"").expect("b"));
        assert!(text.find("\"x\"").expect("x") < text.find("\"y\"").expect("y"));
    }

    #[test]
    fn malformed_json_file_reports_its_path() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").expect("write");
        let err = read_json_file::<Value>(&path).expect_err("malformed");
        assert_eq!(err.info().code, "json_deserialize");
        assert!(err.info().context.contains_key("path"));
    }
}
