//! REST API response types.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::PresetSummary;
use crate::error::{CatalogError, PipelineError};

/// Error tuple returned by handlers.
pub type ApiError = (StatusCode, Json<Value>);

/// `GET /api/presets` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetList {
    pub count: usize,
    pub presets: Vec<PresetSummary>,
}

impl From<Vec<PresetSummary>> for PresetList {
    fn from(presets: Vec<PresetSummary>) -> Self {
        Self {
            count: presets.len(),
            presets,
        }
    }
}

/// `{"error": message}`
pub fn error_response(error: &str) -> Value {
    json!({ "error": error })
}

pub fn catalog_error(err: &CatalogError) -> ApiError {
    (err.status_code(), Json(error_response(&err.to_string())))
}

pub fn pipeline_error(err: &PipelineError) -> ApiError {
    (err.status_code(), Json(error_response(&err.to_string())))
}
