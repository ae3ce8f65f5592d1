//! Typed step configurations.
//!
//! Step records carry a type tag and an untyped JSON config. [`Step::parse`]
//! turns the pair into one closed enum variant after schema validation, so the
//! executor dispatches with an exhaustive `match`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::StepError;
use crate::models::StepType;
use crate::validation::check_step_config;

/// `{"mapping": {"old": "new"}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameColumns {
    pub mapping: HashMap<String, String>,
}

/// `{"columns": ["a", "b"]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropColumns {
    pub columns: Vec<String>,
}

/// `{"order": ["b", "a"]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderColumns {
    pub order: Vec<String>,
}

/// `{"column": "status", "condition": "==", "value": "active"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRows {
    pub column: String,
    pub condition: Condition,
    pub value: Value,
}

/// `{"subset": ["email"], "keep": "first"}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoveDuplicates {
    #[serde(default)]
    pub subset: Option<Vec<String>>,
    #[serde(default)]
    pub keep: Keep,
}

/// `{"column": "tags"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplodeColumn {
    pub column: String,
}

/// `{"new_column": "total", "formula": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddColumns {
    pub new_column: String,
    pub formula: String,
}

/// Comparison operator of a row filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl Condition {
    /// Whether `cell.cmp(value) == ordering` satisfies the operator.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Condition::Eq => ordering == Ordering::Equal,
            Condition::Ne => ordering != Ordering::Equal,
            Condition::Gt => ordering == Ordering::Greater,
            Condition::Lt => ordering == Ordering::Less,
            Condition::Ge => ordering != Ordering::Less,
            Condition::Le => ordering != Ordering::Greater,
        }
    }
}

/// Which duplicate survives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keep {
    #[default]
    First,
    Last,
}

/// A validated step, one variant per [`StepType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    RenameColumns(RenameColumns),
    DropColumns(DropColumns),
    ReorderColumns(ReorderColumns),
    FilterRows(FilterRows),
    RemoveDuplicates(RemoveDuplicates),
    ExplodeColumn(ExplodeColumn),
    AddColumns(AddColumns),
}

impl Step {
    /// Parse a raw type tag and config.
    pub fn parse(step_type: &str, config: &Value) -> Result<Self, StepError> {
        let step_type: StepType = step_type.parse().map_err(|tag| StepError::Unsupported {
            step_type: tag,
            reason: "unknown step type".to_string(),
        })?;
        Self::from_config(step_type, config)
    }

    /// Validate `config` against the step type's schema, then deserialize it.
    pub fn from_config(step_type: StepType, config: &Value) -> Result<Self, StepError> {
        check_step_config(step_type, config)?;

        let config = if config.is_null() { json!({}) } else { config.clone() };
        let typed = |e: serde_json::Error| StepError::validation(step_type, e.to_string());

        Ok(match step_type {
            StepType::RenameColumns => Step::RenameColumns(serde_json::from_value(config).map_err(typed)?),
            StepType::DropColumns => Step::DropColumns(serde_json::from_value(config).map_err(typed)?),
            StepType::ReorderColumns => Step::ReorderColumns(serde_json::from_value(config).map_err(typed)?),
            StepType::FilterRows => Step::FilterRows(serde_json::from_value(config).map_err(typed)?),
            StepType::RemoveDuplicates => Step::RemoveDuplicates(serde_json::from_value(config).map_err(typed)?),
            StepType::ExplodeColumn => Step::ExplodeColumn(serde_json::from_value(config).map_err(typed)?),
            StepType::AddColumns => Step::AddColumns(serde_json::from_value(config).map_err(typed)?),
        })
    }

    pub fn step_type(&self) -> StepType {
        match self {
            Step::RenameColumns(_) => StepType::RenameColumns,
            Step::DropColumns(_) => StepType::DropColumns,
            Step::ReorderColumns(_) => StepType::ReorderColumns,
            Step::FilterRows(_) => StepType::FilterRows,
            Step::RemoveDuplicates(_) => StepType::RemoveDuplicates,
            Step::ExplodeColumn(_) => StepType::ExplodeColumn,
            Step::AddColumns(_) => StepType::AddColumns,
        }
    }
}

/// Example config for a step type, as shown to preset authors.
pub fn example_config(step_type: StepType) -> Value {
    match step_type {
        StepType::RenameColumns => json!({"mapping": {"old_column": "new_column"}}),
        StepType::DropColumns => json!({"columns": ["col1", "col2"]}),
        StepType::ReorderColumns => json!({"order": ["id", "name"]}),
        StepType::FilterRows => json!({"column": "status", "condition": "==", "value": "active"}),
        StepType::RemoveDuplicates => json!({"subset": ["email"], "keep": "first"}),
        StepType::ExplodeColumn => json!({"column": "tags"}),
        StepType::AddColumns => json!({"new_column": "total", "formula": "price * quantity"}),
    }
}

/// Human-readable reference of every step type.
pub fn steps_description() -> String {
    let mut out = String::from(
        r#"Available transformation steps:

| Step | Config | Behavior |
|------|--------|----------|
| rename_columns | mapping: {old: new} | Rename listed columns; unknown names ignored |
| drop_columns | columns: [name] | Remove listed columns; unknown names ignored |
| reorder_columns | order: [name] | Listed columns first, the rest after in original order |
| filter_rows | column, condition (== != > < >= <=), value | Keep rows matching; missing or mismatched cells are dropped |
| remove_duplicates | subset: [name]?, keep: first/last | Drop duplicate rows judged over subset (default: all columns) |
| explode_column | column | One row per element of an array cell; empty arrays drop the row |
| add_columns | new_column, formula | Not supported: formulas are rejected |

Examples:
"#,
    );

    for t in StepType::ALL {
        out.push_str(&format!("\n{} ({}):\n{}\n", t.label(), t, example_config(t)));
    }
    out
}
