//! HTTP API module.
//!
//! Server, response types and the run-log broadcaster.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::{log_error, log_info, log_success, log_warning, LogEntry, LogLevel, LOG_BROADCASTER};
pub use server::{router, serve, start_server, AppState};
pub use types::{error_response, PresetList};
