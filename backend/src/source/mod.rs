//! Source Fetcher: turn a [`SourceDescriptor`] into a raw JSON payload.
//!
//! The fetcher is the only I/O boundary of a run. It is a trait so tests and
//! embedders can swap in their own retrieval.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::FetchError;
use crate::models::{SourceDescriptor, SourceType};

pub mod file;
pub mod http;

pub use file::{FileFetcher, FileFormat, FileSourceConfig};
pub use http::{ApiSourceConfig, HttpFetcher};

/// Retrieves the raw payload of a source. One call per run, no retries.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Value, FetchError>;
}

/// Dispatches on `source_type` to the HTTP or file fetcher.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl DefaultFetcher {
    pub fn new(http: HttpFetcher, file: FileFetcher) -> Self {
        Self { http, file }
    }

    /// HTTP calls bounded by `timeout`; relative file paths resolved against `base_dir`.
    pub fn with_settings(timeout: Duration, base_dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        Ok(Self::new(HttpFetcher::new(timeout)?, FileFetcher::new(base_dir)))
    }
}

#[async_trait]
impl SourceFetcher for DefaultFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Value, FetchError> {
        let source_type: SourceType = source
            .source_type
            .parse()
            .map_err(FetchError::UnsupportedSource)?;

        match source_type {
            SourceType::Api => self.http.fetch(source).await,
            SourceType::File => self.file.fetch(source).await,
        }
    }
}
