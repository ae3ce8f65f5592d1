//! Preset Catalog - read-only view of stored presets and sources
//!
//! ```text
//! <root>/
//!   sources/<any>.json   one SourceRecord per file
//!   presets/<any>.json   one PresetRecord per file, steps inline
//! ```
//!
//! The catalog is loaded once and never written; editing presets is done by
//! whoever owns the files.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Preset, PresetRecord, SourceRecord};

/// Catalog root used when none is configured (relative to current dir)
pub const DEFAULT_CATALOG_DIR: &str = ".dataprep";

/// Listing entry for a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetSummary {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub owner: Option<String>,
    /// Name of the bound source, if it exists
    pub source: Option<String>,
    pub step_count: usize,
}

/// Loaded presets and sources.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    root: PathBuf,
    fallback_owner: Option<String>,
    /// slug -> preset
    presets: HashMap<String, PresetRecord>,
    /// id -> source
    sources: HashMap<u64, SourceRecord>,
}

impl PresetCatalog {
    /// Load every record under `root`. A missing root is an empty catalog.
    pub fn open(root: impl AsRef<Path>) -> CatalogResult<Self> {
        let root = root.as_ref().to_path_buf();

        let mut sources = HashMap::new();
        for source in load_dir::<SourceRecord>(&root.join("sources"))? {
            if let Some(prev) = sources.insert(source.id, source) {
                return Err(CatalogError::Invalid(format!("duplicate source id {}", prev.id)));
            }
        }

        let mut presets = HashMap::new();
        for preset in load_dir::<PresetRecord>(&root.join("presets"))? {
            check_step_orders(&preset)?;
            let slug = preset.effective_slug();
            if slug.is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "preset {} has no usable name or slug",
                    preset.id
                )));
            }
            if presets.insert(slug.clone(), preset).is_some() {
                return Err(CatalogError::Invalid(format!("duplicate preset slug '{}'", slug)));
            }
        }

        Ok(Self {
            root,
            fallback_owner: None,
            presets,
            sources,
        })
    }

    /// Owner reported for records that have none.
    pub fn with_fallback_owner(mut self, owner: Option<String>) -> Self {
        self.fallback_owner = owner;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Summaries of all presets, sorted by name.
    pub fn list(&self) -> Vec<PresetSummary> {
        let mut presets: Vec<&PresetRecord> = self.presets.values().collect();
        presets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        presets
            .into_iter()
            .map(|p| PresetSummary {
                slug: p.effective_slug(),
                name: p.name.clone(),
                description: p.description.clone(),
                owner: self.owner_of(p).map(str::to_string),
                source: self.source_of(p).map(|s| s.name.clone()),
                step_count: p.steps.len(),
            })
            .collect()
    }

    pub fn get(&self, slug: &str) -> Option<&PresetRecord> {
        self.presets.get(slug)
    }

    pub fn source(&self, id: u64) -> Option<&SourceRecord> {
        self.sources.get(&id)
    }

    /// Owner of a preset, or the fallback owner.
    pub fn owner_of<'a>(&'a self, preset: &'a PresetRecord) -> Option<&'a str> {
        preset.effective_owner(self.fallback_owner.as_deref())
    }

    /// Owner of a source, or the fallback owner.
    pub fn source_owner<'a>(&'a self, source: &'a SourceRecord) -> Option<&'a str> {
        source.owner.as_deref().or(self.fallback_owner.as_deref())
    }

    /// Run-time preset for `slug`. A dangling `source_id` yields a preset without source.
    pub fn resolve(&self, slug: &str) -> CatalogResult<Preset> {
        let record = self
            .get(slug)
            .ok_or_else(|| CatalogError::NotFound(slug.to_string()))?;
        Ok(record.to_preset(self.source_of(record)))
    }

    fn source_of(&self, preset: &PresetRecord) -> Option<&SourceRecord> {
        preset.source_id.and_then(|id| self.sources.get(&id))
    }
}

fn check_step_orders(preset: &PresetRecord) -> CatalogResult<()> {
    let mut seen = HashSet::new();
    for step in &preset.steps {
        if !seen.insert(step.order) {
            return Err(CatalogError::Invalid(format!(
                "preset '{}' has two steps with order {}",
                preset.name, step.order
            )));
        }
    }
    Ok(())
}

/// Parse every `*.json` file in `dir`, in file-name order.
fn load_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> CatalogResult<Vec<T>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let io_err = |path: &Path, source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|e| e == "json"))
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let value: Value = serde_json::from_str(&content).map_err(|source| CatalogError::Json {
            path: path.display().to_string(),
            source,
        })?;
        let record = serde_json::from_value(value).map_err(|source| CatalogError::Json {
            path: path.display().to_string(),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
