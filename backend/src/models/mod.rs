//! Domain models for presets, sources and steps.
//!
//! Two layers live here:
//!
//! - Run-time descriptors ([`Preset`], [`SourceDescriptor`], [`StepDescriptor`]),
//!   borrowed read-only by the engine for the duration of one run.
//! - Persistence records ([`PresetRecord`], [`SourceRecord`], [`StepRecord`]),
//!   the catalog schema owned by whoever edits presets.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Step Types
// =============================================================================

/// Every transformation the step executor knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    RenameColumns,
    DropColumns,
    ReorderColumns,
    FilterRows,
    RemoveDuplicates,
    ExplodeColumn,
    AddColumns,
}

impl StepType {
    pub const ALL: [StepType; 7] = [
        StepType::RenameColumns,
        StepType::DropColumns,
        StepType::ReorderColumns,
        StepType::FilterRows,
        StepType::RemoveDuplicates,
        StepType::ExplodeColumn,
        StepType::AddColumns,
    ];

    /// Tag stored in step records.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::RenameColumns => "rename_columns",
            StepType::DropColumns => "drop_columns",
            StepType::ReorderColumns => "reorder_columns",
            StepType::FilterRows => "filter_rows",
            StepType::RemoveDuplicates => "remove_duplicates",
            StepType::ExplodeColumn => "explode_column",
            StepType::AddColumns => "add_columns",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            StepType::RenameColumns => "Rename Columns",
            StepType::DropColumns => "Drop Columns",
            StepType::ReorderColumns => "Reorder Columns",
            StepType::FilterRows => "Filter Rows",
            StepType::RemoveDuplicates => "Remove Duplicates",
            StepType::ExplodeColumn => "Explode Column",
            StepType::AddColumns => "Add Columns",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

// =============================================================================
// Source Types
// =============================================================================

/// Where a source payload comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Api,
    File,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Api => "api",
            SourceType::File => "file",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(SourceType::Api),
            "file" => Ok(SourceType::File),
            other => Err(other.to_string()),
        }
    }
}

// =============================================================================
// Run-time Descriptors
// =============================================================================

/// A configured data origin plus its flattening hints.
///
/// `source_type` stays a raw tag so unknown types surface as an
/// unsupported-source failure at run time instead of a load error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub source_type: String,
    #[serde(default)]
    pub config: Value,
}

impl SourceDescriptor {
    pub fn new(source_type: impl Into<String>, config: Value) -> Self {
        Self {
            source_type: source_type.into(),
            config,
        }
    }
}

/// One declarative transformation: type tag, JSON config and execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub step_type: String,
    #[serde(default)]
    pub config: Value,
    pub order: u32,
}

impl StepDescriptor {
    pub fn new(step_type: impl Into<String>, config: Value, order: u32) -> Self {
        Self {
            step_type: step_type.into(),
            config,
            order,
        }
    }
}

/// A named pipeline bound to (at most) one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub source: Option<SourceDescriptor>,
    #[serde(default)]
    pub steps: Vec<StepDescriptor>,
}

/// `steps` in ascending `order`. The sort is stable, so ties keep storage order.
pub fn ordered_steps(steps: &[StepDescriptor]) -> Vec<&StepDescriptor> {
    let mut ordered: Vec<&StepDescriptor> = steps.iter().collect();
    ordered.sort_by_key(|s| s.order);
    ordered
}

impl Preset {
    /// Explicit slug, or one derived from the name.
    pub fn slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| slugify(&self.name))
    }
}

// =============================================================================
// Persistence Records
// =============================================================================

/// Stored source definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: u64,
    pub name: String,
    pub source_type: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub owner: Option<String>,
}

impl SourceRecord {
    pub fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(self.source_type.clone(), self.config.clone())
    }
}

/// Stored step definition, owned by a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub id: Option<u64>,
    pub step_type: String,
    #[serde(default)]
    pub config: Value,
    pub order: u32,
}

/// Stored preset definition with its steps inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub source_id: Option<u64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
}

impl PresetRecord {
    /// Stored slug, or one derived from the name when blank.
    pub fn effective_slug(&self) -> String {
        match self.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => slugify(&self.name),
        }
    }

    /// The owner, falling back to the injected fallback owner.
    pub fn effective_owner<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        self.owner.as_deref().or(fallback)
    }

    /// Build the run-time preset, joining the (optional) source.
    pub fn to_preset(&self, source: Option<&SourceRecord>) -> Preset {
        Preset {
            name: self.name.clone(),
            slug: Some(self.effective_slug()),
            source: source.map(SourceRecord::descriptor),
            steps: self
                .steps
                .iter()
                .map(|s| StepDescriptor::new(s.step_type.clone(), s.config.clone(), s.order))
                .collect(),
        }
    }
}

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Derive a URL slug: lower-case, non-alphanumeric runs collapsed to `-`.
pub fn slugify(name: &str) -> String {
    NON_SLUG_RE
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_type_round_trips_tag() {
        for t in StepType::ALL {
            assert_eq!(t.as_str().parse::<StepType>(), Ok(t));
        }
        assert_eq!("pivot".parse::<StepType>(), Err("pivot".to_string()));
    }

    #[test]
    fn test_ordered_steps_sorts_by_order_and_keeps_ties_stable() {
        let steps = vec![
            StepDescriptor::new("drop_columns", json!({"columns": ["b"]}), 3),
            StepDescriptor::new("rename_columns", json!({"mapping": {}}), 1),
            StepDescriptor::new("explode_column", json!({"column": "x"}), 3),
        ];
        let types: Vec<&str> = ordered_steps(&steps)
            .iter()
            .map(|s| s.step_type.as_str())
            .collect();
        assert_eq!(types, vec!["rename_columns", "drop_columns", "explode_column"]);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Daily Carts Export"), "daily-carts-export");
        assert_eq!(slugify("  Users / Active (v2) "), "users-active-v2");
        assert_eq!(slugify("Ünïcode"), "n-code");
    }

    #[test]
    fn test_effective_slug_and_owner() {
        let record: PresetRecord = serde_json::from_value(json!({
            "id": 1,
            "name": "Active Users",
            "slug": "  ",
            "steps": []
        }))
        .unwrap();
        assert_eq!(record.effective_slug(), "active-users");
        assert_eq!(record.effective_owner(Some("system")), Some("system"));
        assert_eq!(record.effective_owner(None), None);
    }

    #[test]
    fn test_to_preset_joins_source() {
        let source = SourceRecord {
            id: 7,
            name: "carts".into(),
            source_type: "api".into(),
            config: json!({"url": "https://dummyjson.com/carts"}),
            owner: None,
        };
        let record: PresetRecord = serde_json::from_value(json!({
            "id": 1,
            "name": "Carts",
            "source_id": 7,
            "steps": [{"step_type": "drop_columns", "config": {"columns": ["id"]}, "order": 0}]
        }))
        .unwrap();

        let preset = record.to_preset(Some(&source));
        assert_eq!(preset.slug.as_deref(), Some("carts"));
        assert_eq!(preset.source.unwrap().source_type, "api");
        assert_eq!(preset.steps.len(), 1);
    }
}
