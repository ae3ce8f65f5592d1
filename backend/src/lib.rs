//! # Dataprep - declarative data-preparation pipelines
//!
//! A preset binds one data source to an ordered list of JSON-configured steps.
//! Running it fetches the source payload, flattens it into a table and folds
//! the steps over that table.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Source    │────▶│  Flattener  │────▶│    Steps    │────▶│   Records   │
//! │ (API/file)  │     │ (root_key…) │     │ (ordered)   │     │   (JSON)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dataprep::{DefaultFetcher, PipelineRunner, PresetCatalog};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = PresetCatalog::open(".dataprep")?;
//!     let runner = PipelineRunner::new(DefaultFetcher::with_settings(Duration::from_secs(30), catalog.root())?);
//!     let records = runner.run(&catalog.resolve("cart-products")?).await?;
//!     println!("{}", serde_json::to_string_pretty(&records)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Preset, source and step descriptors
//! - [`table`] - In-memory table
//! - [`flatten`] - Nested JSON to table
//! - [`parser`] - CSV decoding for file sources
//! - [`transform`] - Steps, executor and pipeline runner
//! - [`source`] - Source fetchers
//! - [`validation`] - JSON Schema checks for configs
//! - [`catalog`] - Read-only preset catalog
//! - [`config`] - Runtime configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod table;

// Ingestion
pub mod flatten;
pub mod parser;
pub mod source;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Presets
pub mod catalog;
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CatalogError, ConfigError, CsvError, ErrorKind, FetchError, PipelineError, ServerError,
    StepError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    slugify, Preset, PresetRecord, SourceDescriptor, SourceRecord, SourceType, StepDescriptor,
    StepRecord, StepType,
};
pub use table::{Record, Table};

// =============================================================================
// Re-exports - Engine
// =============================================================================

pub use flatten::{flatten, RecordPath, ShapeHints};
pub use source::{DefaultFetcher, FileFetcher, HttpFetcher, SourceFetcher};
pub use transform::{
    apply_step, apply_steps, steps_description, transform_payload, PipelineRunner, Step,
};
pub use validation::{check_source_config, check_step_config, validate};

// =============================================================================
// Re-exports - Catalog & Config
// =============================================================================

pub use catalog::{PresetCatalog, PresetSummary};
pub use config::AppConfig;

// Server
pub mod server {
    pub use crate::api::server::{router, serve, start_server, AppState};
}
