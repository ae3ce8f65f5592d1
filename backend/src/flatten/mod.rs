//! Flatten nested JSON payloads into a [`Table`].
//!
//! Shape hints come from the source config:
//!
//! - `root_key`: pick the data list out of an enveloping object (`{"carts": [...]}`)
//! - `record_path`: a field, or a path of fields, naming the nested list whose
//!   elements become rows
//! - `meta_fields`: fields of each top-level element copied onto every row it produces
//!
//! ```text
//! {"carts": [{"userId": 7, "products": [{"title": "A"}, {"title": "B"}]}]}
//!
//!   root_key = "carts", record_path = "products", meta_fields = ["userId"]
//!
//! ┌───────┬────────┐
//! │ title │ userId │
//! ├───────┼────────┤
//! │ A     │ 7      │
//! │ B     │ 7      │
//! └───────┴────────┘
//! ```
//!
//! Nested objects become `parent__child` columns; an empty nested object adds no
//! column. Arrays stay as single array-valued cells unless `record_path` targets them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::table::{Record, Table};

/// Joins nested object keys into a column name.
pub const SEPARATOR: &str = "__";

/// Column used for non-object elements of a record list.
pub const VALUE_COLUMN: &str = "value";

/// One field name or a path of nested field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordPath {
    Field(String),
    Path(Vec<String>),
}

impl RecordPath {
    pub fn segments(&self) -> &[String] {
        match self {
            RecordPath::Field(f) => std::slice::from_ref(f),
            RecordPath::Path(p) => p,
        }
    }

    fn is_empty(&self) -> bool {
        self.segments().iter().all(|s| s.is_empty())
    }
}

impl From<&str> for RecordPath {
    fn from(field: &str) -> Self {
        RecordPath::Field(field.to_string())
    }
}

/// Extraction and flattening hints. Unknown config keys are ignored, so the
/// hints can be read straight off a full source config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeHints {
    #[serde(default)]
    pub root_key: Option<String>,
    #[serde(default)]
    pub record_path: Option<RecordPath>,
    #[serde(default)]
    pub meta_fields: Option<Vec<String>>,
}

impl ShapeHints {
    /// Read the hints out of a source config object.
    pub fn from_config(config: &Value) -> Result<Self, ConfigError> {
        match config {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => serde_json::from_value(config.clone())
                .map_err(|e| ConfigError::invalid("source shape hints", e.to_string())),
            _ => Err(ConfigError::invalid(
                "source config",
                "expected a JSON object",
            )),
        }
    }

    pub fn with_root_key(mut self, key: impl Into<String>) -> Self {
        self.root_key = Some(key.into());
        self
    }

    pub fn with_record_path(mut self, path: impl Into<RecordPath>) -> Self {
        self.record_path = Some(path.into());
        self
    }

    pub fn with_meta_fields(mut self, fields: Vec<String>) -> Self {
        self.meta_fields = Some(fields);
        self
    }
}

impl From<Vec<String>> for RecordPath {
    fn from(path: Vec<String>) -> Self {
        RecordPath::Path(path)
    }
}

/// Flatten `payload` into a table.
///
/// A missing `root_key` yields an empty list. A payload that is neither an
/// object nor an array yields an empty table.
pub fn flatten(payload: &Value, hints: &ShapeHints) -> Result<Table, ConfigError> {
    let empty = Value::Array(Vec::new());
    let data = match (&hints.root_key, payload) {
        (Some(key), Value::Object(map)) if !key.is_empty() => map.get(key).unwrap_or(&empty),
        _ => payload,
    };

    let records = match hints.record_path.as_ref().filter(|p| !p.is_empty()) {
        Some(path) => {
            let meta = hints.meta_fields.as_deref().unwrap_or_default();
            records_along_path(data, path.segments(), meta)?
        }
        None => match data {
            Value::Array(items) => items.iter().map(record_for).collect(),
            Value::Object(map) => vec![flatten_object(map)],
            _ => return Ok(Table::new()),
        },
    };

    Ok(Table::from_records(records))
}

/// One row per leaf of `path`, with the top-level element's meta fields appended.
fn records_along_path(
    data: &Value,
    path: &[String],
    meta_fields: &[String],
) -> Result<Vec<Record>, ConfigError> {
    let tops: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![data],
        _ => return Ok(Vec::new()),
    };

    let mut records = Vec::new();
    for top in tops {
        let mut leaves = Vec::new();
        descend(top, path, &mut leaves)?;
        if leaves.is_empty() {
            continue;
        }

        let meta: Vec<(&String, Value)> = meta_fields
            .iter()
            .map(|field| {
                let value = top.get(field.as_str()).cloned().unwrap_or(Value::Null);
                (field, value)
            })
            .collect();

        for leaf in leaves {
            let mut record = record_for(leaf);
            for (name, value) in &meta {
                if record.contains_key(name.as_str()) {
                    return Err(ConfigError::invalid(
                        "meta_fields",
                        format!("conflicting metadata name '{}' already exists as a record column", name),
                    ));
                }
                record.insert((*name).clone(), value.clone());
            }
            records.push(record);
        }
    }

    Ok(records)
}

/// Walk `path` from `node`, collecting every element reached at its end.
/// Missing or null segments contribute no rows.
fn descend<'a>(node: &'a Value, path: &[String], out: &mut Vec<&'a Value>) -> Result<(), ConfigError> {
    let Some((head, rest)) = path.split_first() else {
        out.push(node);
        return Ok(());
    };

    match node.get(head.as_str()) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(items)) => {
            for item in items {
                descend(item, rest, out)?;
            }
            Ok(())
        }
        Some(child @ Value::Object(_)) => descend(child, rest, out),
        Some(other) => Err(ConfigError::invalid(
            "record_path",
            format!("field '{}' holds {} instead of a list", head, kind_of(other)),
        )),
    }
}

fn record_for(value: &Value) -> Record {
    match value {
        Value::Object(map) => flatten_object(map),
        other => {
            let mut record = Map::new();
            record.insert(VALUE_COLUMN.to_string(), other.clone());
            record
        }
    }
}

fn flatten_object(map: &Map<String, Value>) -> Record {
    let mut out = Map::new();
    flatten_into(map, None, &mut out);
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: Option<&str>, out: &mut Record) {
    for (key, value) in map {
        let name = match prefix {
            Some(p) => format!("{}{}{}", p, SEPARATOR, key),
            None => key.clone(),
        };
        match value {
            Value::Object(child) => flatten_into(child, Some(&name), out),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_carts_example() {
        let payload = json!({"carts": [{"products": [{"title": "A"}], "userId": 7}]});
        let hints = ShapeHints::default()
            .with_root_key("carts")
            .with_record_path("products")
            .with_meta_fields(vec!["userId".into()]);

        let table = flatten(&payload, &hints).unwrap();
        assert_eq!(table.into_records(), vec![
            json!({"title": "A", "userId": 7}).as_object().cloned().unwrap()
        ]);
    }

    #[test]
    fn test_meta_copied_to_every_row() {
        let payload = json!([
            {"id": 1, "products": [{"title": "A"}, {"title": "B"}]},
            {"id": 2, "products": [{"title": "C"}]}
        ]);
        let hints = ShapeHints::default()
            .with_record_path("products")
            .with_meta_fields(vec!["id".into()]);

        let table = flatten(&payload, &hints).unwrap();
        assert_eq!(table.columns(), &["title", "id"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1, "id"), Some(&json!(1)));
        assert_eq!(table.get(2, "id"), Some(&json!(2)));
    }

    #[test]
    fn test_nested_record_path() {
        let payload = json!([
            {"team": "x", "groups": [{"members": [{"n": 1}, {"n": 2}]}, {"members": [{"n": 3}]}]}
        ]);
        let hints = ShapeHints::default()
            .with_record_path(vec!["groups".to_string(), "members".to_string()])
            .with_meta_fields(vec!["team".into()]);

        let table = flatten(&payload, &hints).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(2, "n"), Some(&json!(3)));
        assert_eq!(table.get(2, "team"), Some(&json!("x")));
    }

    #[test]
    fn test_nested_objects_use_double_underscore() {
        let payload = json!([{"name": "a", "address": {"city": "Oslo", "geo": {"lat": 1}}}]);
        let table = flatten(&payload, &ShapeHints::default()).unwrap();
        assert_eq!(table.columns(), &["name", "address__city", "address__geo__lat"]);
    }

    #[test]
    fn test_empty_nested_object_adds_no_column() {
        let payload = json!([{"a": 1, "meta": {}}, {"a": 2, "meta": {"x": 3}}]);
        let table = flatten(&payload, &ShapeHints::default()).unwrap();
        assert_eq!(table.columns(), &["a", "meta__x"]);
        assert_eq!(table.get(0, "meta__x"), Some(&Value::Null));

        let table = flatten(&json!([{"a": 1, "meta": {"inner": {}}}]), &ShapeHints::default()).unwrap();
        assert_eq!(table.columns(), &["a"]);
    }

    #[test]
    fn test_scalar_arrays_stay_single_column() {
        let payload = json!([{"tags": ["x", "y"]}]);
        let table = flatten(&payload, &ShapeHints::default()).unwrap();
        assert_eq!(table.columns(), &["tags"]);
        assert_eq!(table.get(0, "tags"), Some(&json!(["x", "y"])));
    }

    #[test]
    fn test_missing_root_key_is_empty() {
        let payload = json!({"items": [{"a": 1}]});
        let hints = ShapeHints::default().with_root_key("carts");
        let table = flatten(&payload, &hints).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.width(), 0);
    }

    #[test]
    fn test_scalar_payload_is_empty_table() {
        for payload in [json!(42), json!("text"), json!(null)] {
            let table = flatten(&payload, &ShapeHints::default()).unwrap();
            assert_eq!(table, Table::new());
        }
    }

    #[test]
    fn test_single_object_becomes_one_row() {
        let table = flatten(&json!({"a": 1, "b": {"c": 2}}), &ShapeHints::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns(), &["a", "b__c"]);
    }

    #[test]
    fn test_meta_name_conflict() {
        let payload = json!([{"id": 1, "items": [{"id": 9}]}]);
        let hints = ShapeHints::default()
            .with_record_path("items")
            .with_meta_fields(vec!["id".into()]);
        let err = flatten(&payload, &hints).unwrap_err();
        assert!(err.to_string().contains("conflicting metadata name 'id'"));
    }

    #[test]
    fn test_record_path_on_scalar_fails() {
        let payload = json!([{"items": 5}]);
        let hints = ShapeHints::default().with_record_path("items");
        let err = flatten(&payload, &hints).unwrap_err();
        assert!(err.to_string().contains("'items' holds a number"));
    }

    #[test]
    fn test_missing_record_path_segment_yields_no_rows() {
        let payload = json!([{"other": []}, {"items": [{"a": 1}]}]);
        let hints = ShapeHints::default().with_record_path("items");
        let table = flatten(&payload, &hints).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_hints_from_source_config() {
        let config = json!({
            "url": "https://dummyjson.com/carts",
            "root_key": "carts",
            "record_path": ["products"],
            "meta_fields": ["userId"]
        });
        let hints = ShapeHints::from_config(&config).unwrap();
        assert_eq!(hints.root_key.as_deref(), Some("carts"));
        assert_eq!(hints.record_path.unwrap().segments(), &["products".to_string()]);

        let bad = json!({"record_path": 3});
        assert!(ShapeHints::from_config(&bad).is_err());
    }
}
