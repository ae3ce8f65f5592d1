//! HTTP Server for the dataprep API.
//!
//! # API Endpoints
//!
//! | Method    | Path                  | Description                          |
//! |-----------|-----------------------|--------------------------------------|
//! | GET       | `/health`             | Health check                         |
//! | GET, POST | `/presets/{slug}/run` | Run a preset, return its records     |
//! | GET       | `/api/presets`        | List presets                         |
//! | GET       | `/api/logs`           | SSE stream for real-time logs        |

use axum::{
    extract::{Path, State},
    http::{header, Method},
    response::{sse::Event, Json, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::{Any, CorsLayer};

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{catalog_error, pipeline_error, ApiError, PresetList};
use crate::catalog::PresetCatalog;
use crate::config::AppConfig;
use crate::error::ServerResult;
use crate::source::DefaultFetcher;
use crate::table::Record;
use crate::transform::PipelineRunner;

/// Shared, read-only server state.
pub struct AppState {
    pub catalog: PresetCatalog,
    pub runner: PipelineRunner<DefaultFetcher>,
}

impl AppState {
    pub fn new(catalog: PresetCatalog, runner: PipelineRunner<DefaultFetcher>) -> Self {
        Self { catalog, runner }
    }

    /// Load the catalog and build the fetcher described by `config`.
    pub fn from_config(config: &AppConfig) -> ServerResult<Self> {
        let catalog = PresetCatalog::open(&config.catalog_dir)?
            .with_fallback_owner(config.fallback_owner.clone());
        let fetcher = DefaultFetcher::with_settings(config.fetch_timeout, catalog.root())?;
        Ok(Self::new(catalog, PipelineRunner::new(fetcher)))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/presets/{slug}/run", get(run_preset).post(run_preset))
        .route("/api/presets", get(list_presets))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Serve on an already-bound listener.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> ServerResult<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Start the HTTP server
pub async fn start_server(config: AppConfig) -> ServerResult<()> {
    let state = AppState::from_config(&config)?;
    let preset_count = state.catalog.len();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    println!("🚀 dataprep server running on http://localhost:{}", config.port);
    println!("   Catalog: {} ({} presets)", config.catalog_dir.display(), preset_count);
    println!("   GET|POST /presets/{{slug}}/run - Run a preset");
    println!("   GET      /api/presets         - List presets");
    println!("   GET      /api/logs            - SSE log stream");
    println!("   GET      /health              - Health check");
    println!();

    serve(listener, Arc::new(state)).await
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "dataprep",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_presets(State(state): State<Arc<AppState>>) -> Json<PresetList> {
    Json(PresetList::from(state.catalog.list()))
}

async fn run_preset(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError> {
    log_info(format!("Request: run preset '{}'", slug));

    let preset = state.catalog.resolve(&slug).map_err(|e| catalog_error(&e))?;
    let records = state.runner.run(&preset).await.map_err(|e| pipeline_error(&e))?;

    Ok(Json(records))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(LOG_BROADCASTER.subscribe()).filter_map(|result| {
        let entry = result.ok()?;
        let data = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(data)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
