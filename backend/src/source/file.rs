//! `file` sources: a local JSON document or CSV file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::SourceFetcher;
use crate::api::logs::log_info;
use crate::error::{ConfigError, FetchError};
use crate::models::{SourceDescriptor, SourceType};
use crate::parser;
use crate::validation::check_source_config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub format: Option<FileFormat>,
    #[serde(default)]
    pub delimiter: Option<char>,
}

impl FileSourceConfig {
    pub fn from_config(config: &Value) -> Result<Self, ConfigError> {
        check_source_config(SourceType::File, config)?;
        serde_json::from_value(config.clone())
            .map_err(|e| ConfigError::invalid("file source config", e.to_string()))
    }

    /// Explicit format, else `.csv`/`.tsv` extensions mean CSV and anything else JSON.
    pub fn effective_format(&self) -> FileFormat {
        self.format.unwrap_or_else(|| {
            match self.path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
                Some("csv") | Some("tsv") => FileFormat::Csv,
                _ => FileFormat::Json,
            }
        })
    }
}

/// Reads file sources, resolving relative paths against `base_dir`.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base_dir: PathBuf,
}

impl FileFetcher {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[async_trait]
impl SourceFetcher for FileFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Value, FetchError> {
        let config = FileSourceConfig::from_config(&source.config)?;
        let path = self.resolve(&config.path);

        let bytes = tokio::fs::read(&path).await.map_err(|e| FetchError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        match config.effective_format() {
            FileFormat::Json => serde_json::from_slice(&bytes)
                .map_err(|e| FetchError::Parse(format!("{} is not valid JSON: {}", path.display(), e))),
            FileFormat::Csv => {
                let parsed = parser::parse_bytes(&bytes, config.delimiter)
                    .map_err(|e| FetchError::Parse(format!("{}: {}", path.display(), e)))?;
                log_info(format!(
                    "Read {} CSV rows ({}, delimiter {:?})",
                    parsed.records.len(),
                    parsed.encoding,
                    parsed.delimiter
                ));
                Ok(Value::Array(parsed.records))
            }
        }
    }
}
