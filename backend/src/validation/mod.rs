//! JSON Schema validation for step and source configurations.
//!
//! Each step type and source type has a Draft 7 schema embedded at compile
//! time from the `schemas/` directory:
//!
//! - `schemas/steps/<step_type>.json`
//! - `schemas/sources/<source_type>.json`
//!
//! A config is checked in two passes. The schema's `required` list is walked
//! first so a missing field is reported by name; the full schema runs after
//! that and reports every remaining shape problem at once.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{ConfigError, StepError};
use crate::models::{SourceType, StepType};

static STEP_SCHEMAS: Lazy<HashMap<StepType, Value>> = Lazy::new(|| {
    StepType::ALL
        .into_iter()
        .map(|t| (t, embedded(step_schema_source(t))))
        .collect()
});

static SOURCE_SCHEMAS: Lazy<HashMap<SourceType, Value>> = Lazy::new(|| {
    [
        (SourceType::Api, include_str!("../../schemas/sources/api.json")),
        (SourceType::File, include_str!("../../schemas/sources/file.json")),
    ]
    .into_iter()
    .map(|(t, src)| (t, embedded(src)))
    .collect()
});

fn step_schema_source(step_type: StepType) -> &'static str {
    match step_type {
        StepType::RenameColumns => include_str!("../../schemas/steps/rename_columns.json"),
        StepType::DropColumns => include_str!("../../schemas/steps/drop_columns.json"),
        StepType::ReorderColumns => include_str!("../../schemas/steps/reorder_columns.json"),
        StepType::FilterRows => include_str!("../../schemas/steps/filter_rows.json"),
        StepType::RemoveDuplicates => include_str!("../../schemas/steps/remove_duplicates.json"),
        StepType::ExplodeColumn => include_str!("../../schemas/steps/explode_column.json"),
        StepType::AddColumns => include_str!("../../schemas/steps/add_columns.json"),
    }
}

fn embedded(source: &str) -> Value {
    serde_json::from_str(source).expect("Invalid embedded schema")
}

/// Validate a JSON value against a schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every violation otherwise
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use dataprep::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["column"],
///     "properties": { "column": { "type": "string" } }
/// });
///
/// assert!(validate(&schema, &json!({ "column": "tags" })).is_ok());
/// assert!(validate(&schema, &json!({ "column": 3 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Embedded schema for a step type.
pub fn step_schema(step_type: StepType) -> &'static Value {
    &STEP_SCHEMAS[&step_type]
}

/// Embedded schema for a source type.
pub fn source_schema(source_type: SourceType) -> &'static Value {
    &SOURCE_SCHEMAS[&source_type]
}

/// First field listed in the schema's `required` array that `config` lacks.
pub fn first_missing_required<'s>(schema: &'s Value, config: &Map<String, Value>) -> Option<&'s str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|field| !config.contains_key(*field))
}

/// Check a step config. An absent (`null`) config counts as an empty object.
pub fn check_step_config(step_type: StepType, config: &Value) -> Result<(), StepError> {
    let empty = Value::Object(Map::new());
    let config = if config.is_null() { &empty } else { config };

    let Some(fields) = config.as_object() else {
        return Err(StepError::validation(step_type, "config must be a JSON object"));
    };

    let schema = step_schema(step_type);
    if let Some(field) = first_missing_required(schema, fields) {
        return Err(StepError::MissingField {
            step: step_type,
            field: field.to_string(),
        });
    }

    validate(schema, config).map_err(|errors| StepError::validation(step_type, errors.join("; ")))
}

/// Check a source config against its source type's schema.
pub fn check_source_config(source_type: SourceType, config: &Value) -> Result<(), ConfigError> {
    let context = format!("{} source config", source_type);

    let Some(fields) = config.as_object() else {
        return Err(ConfigError::invalid(context, "expected a JSON object"));
    };

    let schema = source_schema(source_type);
    if let Some(field) = first_missing_required(schema, fields) {
        return Err(ConfigError::missing(context, field));
    }

    validate(schema, config).map_err(|errors| ConfigError::invalid(context, errors.join("; ")))
}
