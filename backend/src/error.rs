//! Error types for the dataprep pipeline engine.
//!
//! This module defines one error type per concern:
//!
//! - [`ConfigError`] - Malformed or missing preset, source or step configuration
//! - [`StepError`] - Step executor failures (missing field, bad shape, unsupported type)
//! - [`FetchError`] - Source retrieval failures (transport, status, body parsing)
//! - [`CsvError`] - CSV decoding failures for file sources
//! - [`CatalogError`] - Preset catalog loading and lookup errors
//! - [`PipelineError`] - Top-level run errors, the only type a caller of a run sees
//! - [`ServerError`] - HTTP server start-up errors
//!
//! Lower-level errors convert into [`PipelineError`] via `From`, so `?` works
//! across the fetch → flatten → step boundaries.

use axum::http::StatusCode;
use thiserror::Error;

use crate::models::StepType;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Malformed or missing configuration. Never retryable: an operator must fix the data.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// The preset has no source attached.
    #[error("no source")]
    NoSource,

    /// A required field is absent.
    #[error("missing required field '{field}' in {context}")]
    MissingField { context: String, field: String },

    /// A field is present but unusable.
    #[error("invalid {context}: {message}")]
    Invalid { context: String, message: String },
}

impl ConfigError {
    pub fn missing(context: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            context: context.into(),
            field: field.into(),
        }
    }

    pub fn invalid(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            context: context.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Step Errors
// =============================================================================

/// Errors raised while validating or applying a single step.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StepError {
    /// The step type tag is unknown, or the step type is deliberately disabled.
    #[error("Unsupported step type '{step_type}': {reason}")]
    Unsupported { step_type: String, reason: String },

    /// A required config field is absent.
    #[error("Step '{step}' is missing required field '{field}'")]
    MissingField { step: StepType, field: String },

    /// The config does not match the step's expected shape.
    #[error("Invalid config for step '{step}': {message}")]
    Validation { step: StepType, message: String },
}

impl StepError {
    pub fn validation(step: StepType, message: impl Into<String>) -> Self {
        Self::Validation {
            step,
            message: message.into(),
        }
    }
}

// =============================================================================
// Fetch Errors
// =============================================================================

/// Errors from the source fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or transport failure. May be transient.
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The source answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// A file source could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The payload is not valid structured data.
    #[error("{0}")]
    Parse(String),

    /// The source config is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The source type tag is unknown.
    #[error("Unsupported source type '{0}'")]
    UnsupportedSource(String),
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while decoding a CSV file source.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The file has no content.
    #[error("CSV file is empty")]
    Empty,

    /// Delimiters must be a single ASCII character.
    #[error("Invalid CSV delimiter {0:?}")]
    InvalidDelimiter(char),

    /// A record could not be parsed.
    #[error("Invalid CSV at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

// =============================================================================
// Catalog Errors
// =============================================================================

/// Errors from the read-only preset catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No preset carries the slug.
    #[error("Preset not found: {0}")]
    NotFound(String),

    /// A catalog file could not be read.
    #[error("Catalog IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A catalog file is not valid JSON for its record type.
    #[error("Catalog file {path} is invalid: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Catalog contents break a data-model rule.
    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Error category of a failed run, mirroring the user-facing taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    UnsupportedStep,
    UnsupportedSource,
    Fetch,
    Parse,
    Validation,
}

/// Top-level run error.
///
/// Every failure inside fetch, flatten or step application ends up here; a run
/// is all-or-nothing, so no partial table travels with the error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Preset, source or shape-hint configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source type tag is unknown.
    #[error("Unsupported source type '{0}'")]
    UnsupportedSource(String),

    /// The source could not be reached or answered with an error status.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The source payload is not valid structured data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A step failed; `order` identifies it within the preset.
    #[error("Step {order} failed: {source}")]
    Step {
        order: u32,
        #[source]
        source: StepError,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Config(_) => ErrorKind::Config,
            PipelineError::UnsupportedSource(_) => ErrorKind::UnsupportedSource,
            PipelineError::Fetch(_) => ErrorKind::Fetch,
            PipelineError::Parse(_) => ErrorKind::Parse,
            PipelineError::Step { source, .. } => match source {
                StepError::Unsupported { .. } => ErrorKind::UnsupportedStep,
                StepError::MissingField { .. } => ErrorKind::Config,
                StepError::Validation { .. } => ErrorKind::Validation,
            },
        }
    }

    /// Only transport failures may succeed when retried by the caller.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Fetch
    }

    /// Every run failure is reported to HTTP callers as a bad request.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl From<FetchError> for PipelineError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Config(e) => PipelineError::Config(e),
            FetchError::UnsupportedSource(t) => PipelineError::UnsupportedSource(t),
            FetchError::Parse(msg) => PipelineError::Parse(msg),
            other => PipelineError::Fetch(other.to_string()),
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Catalog could not be loaded at start-up.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Fetcher could not be built.
    #[error("Fetcher error: {0}")]
    Fetcher(#[from] FetchError),

    /// Binding or serving failed.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
