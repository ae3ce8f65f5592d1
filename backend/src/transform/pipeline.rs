//! Pipeline Runner: fetch → flatten → ordered steps → records.
//!
//! # Example
//!
//! ```rust,ignore
//! use dataprep::source::DefaultFetcher;
//! use dataprep::transform::PipelineRunner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = PipelineRunner::new(DefaultFetcher::with_settings(Duration::from_secs(30), ".")?);
//!     let preset = serde_json::from_str(&std::fs::read_to_string("carts.json")?)?;
//!     let records = runner.run(&preset).await?;
//!     println!("{} records", records.len());
//!     Ok(())
//! }
//! ```

use serde_json::Value;
use uuid::Uuid;

use super::executor;
use super::steps::Step;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::flatten::{flatten, ShapeHints};
use crate::models::{ordered_steps, Preset, StepDescriptor};
use crate::source::SourceFetcher;
use crate::table::{Record, Table};

/// Runs presets against a [`SourceFetcher`].
///
/// Each run owns its table; the runner holds no per-run state, so one runner
/// can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct PipelineRunner<F> {
    fetcher: F,
}

impl<F: SourceFetcher> PipelineRunner<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Run `preset` to completion. All-or-nothing: on error no records are returned.
    pub async fn run(&self, preset: &Preset) -> PipelineResult<Vec<Record>> {
        let run_id = Uuid::new_v4();
        log_info(format!("▶ Run {} of preset '{}'", run_id, preset.slug()));

        match self.execute(preset).await {
            Ok(records) => {
                log_success(format!("Run {} produced {} records", run_id, records.len()));
                Ok(records)
            }
            Err(e) => {
                log_error(format!("Run {} failed: {}", run_id, e));
                Err(e)
            }
        }
    }

    async fn execute(&self, preset: &Preset) -> PipelineResult<Vec<Record>> {
        let source = preset.source.as_ref().ok_or(ConfigError::NoSource)?;

        let payload = self.fetcher.fetch(source).await?;
        log_info(format!("Fetched {} payload", payload_kind(&payload)));

        let hints = ShapeHints::from_config(&source.config)?;
        let table = flatten(&payload, &hints)?;
        if table.is_empty() {
            log_warning("Flattened table is empty; check root_key and record_path");
        } else {
            log_info(format!("Flattened to {}", table.shape()));
        }

        let table = apply_steps(table, &preset.steps)?;
        Ok(table.into_records())
    }
}

/// Fold `steps` over `table` in ascending `order`. Ties keep their given order.
pub fn apply_steps(table: Table, steps: &[StepDescriptor]) -> PipelineResult<Table> {
    let mut table = table;
    for descriptor in ordered_steps(steps) {
        let fail = |source| PipelineError::Step {
            order: descriptor.order,
            source,
        };
        let step = Step::parse(&descriptor.step_type, &descriptor.config).map_err(fail)?;
        table = executor::apply(table, &step).map_err(fail)?;
        log_info_indent(
            format!("[{}] {} → {}", descriptor.order, step.step_type(), table.shape()),
            1,
        );
    }
    Ok(table)
}

/// Flatten `payload` and apply `steps` without any fetching.
pub fn transform_payload(
    payload: &Value,
    hints: &ShapeHints,
    steps: &[StepDescriptor],
) -> PipelineResult<Vec<Record>> {
    let table = flatten(payload, hints)?;
    Ok(apply_steps(table, steps)?.into_records())
}

fn payload_kind(payload: &Value) -> String {
    match payload {
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::Object(map) => format!("object with {} keys", map.len()),
        _ => "scalar".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, FetchError, StepError};
    use crate::models::{SourceDescriptor, StepType};
    use async_trait::async_trait;
    use serde_json::json;

    /// Returns a fixed payload, or a fixed error when `payload` is `None`.
    struct StaticFetcher {
        payload: Option<Value>,
    }

    #[async_trait]
    impl SourceFetcher for StaticFetcher {
        async fn fetch(&self, _source: &SourceDescriptor) -> Result<Value, FetchError> {
            self.payload.clone().ok_or_else(|| FetchError::Transport {
                url: "http://unreachable".into(),
                message: "connection refused".into(),
            })
        }
    }

    fn runner(payload: Value) -> PipelineRunner<StaticFetcher> {
        PipelineRunner::new(StaticFetcher { payload: Some(payload) })
    }

    fn preset(config: Value, steps: Vec<StepDescriptor>) -> Preset {
        Preset {
            name: "Test".into(),
            slug: None,
            source: Some(SourceDescriptor::new("api", config)),
            steps,
        }
    }

    fn records(rows: Value) -> Vec<Record> {
        rows.as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_carts_end_to_end() {
        let payload = json!({"carts": [{"products": [{"title": "A"}], "userId": 7}]});
        let preset = preset(
            json!({"url": "http://x", "root_key": "carts", "record_path": "products", "meta_fields": ["userId"]}),
            vec![],
        );
        let out = runner(payload).run(&preset).await.unwrap();
        assert_eq!(out, records(json!([{"title": "A", "userId": 7}])));
    }

    #[tokio::test]
    async fn test_no_source() {
        let mut p = preset(json!({}), vec![]);
        p.source = None;
        let err = runner(json!([])).run(&p).await.unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: no source");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_steps_run_in_order_not_storage_order() {
        let payload = json!([{"first_name": "Ada", "status": "active"}, {"first_name": "Bob", "status": "inactive"}]);
        let steps = vec![
            StepDescriptor::new("drop_columns", json!({"columns": ["status"]}), 2),
            StepDescriptor::new(
                "filter_rows",
                json!({"column": "status", "condition": "==", "value": "active"}),
                1,
            ),
            StepDescriptor::new("rename_columns", json!({"mapping": {"first_name": "name"}}), 0),
        ];
        let out = runner(payload).run(&preset(json!({"url": "http://x"}), steps)).await.unwrap();
        assert_eq!(out, records(json!([{"name": "Ada"}])));
    }

    #[tokio::test]
    async fn test_failing_step_aborts_run() {
        let steps = vec![
            StepDescriptor::new("rename_columns", json!({"mapping": {"a": "b"}}), 0),
            StepDescriptor::new("pivot", json!({}), 1),
        ];
        let err = runner(json!([{"a": 1}]))
            .run(&preset(json!({"url": "http://x"}), steps))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedStep);
        assert!(matches!(err, PipelineError::Step { order: 1, .. }));
    }

    #[tokio::test]
    async fn test_missing_step_field_is_config_error() {
        let steps = vec![StepDescriptor::new("explode_column", json!({}), 3)];
        let err = runner(json!([{"a": 1}]))
            .run(&preset(json!({"url": "http://x"}), steps))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(matches!(
            err,
            PipelineError::Step {
                order: 3,
                source: StepError::MissingField { step: StepType::ExplodeColumn, .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_retryable() {
        let runner = PipelineRunner::new(StaticFetcher { payload: None });
        let err = runner.run(&preset(json!({"url": "http://x"}), vec![])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_result_is_success() {
        let steps = vec![StepDescriptor::new(
            "filter_rows",
            json!({"column": "n", "condition": ">", "value": 100}),
            0,
        )];
        let out = runner(json!([{"n": 1}]))
            .run(&preset(json!({"url": "http://x"}), steps))
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_transform_payload_with_ties() {
        let steps = vec![
            StepDescriptor::new("rename_columns", json!({"mapping": {"a": "b"}}), 0),
            StepDescriptor::new("rename_columns", json!({"mapping": {"b": "c"}}), 0),
        ];
        let out = transform_payload(&json!([{"a": 1}]), &ShapeHints::default(), &steps).unwrap();
        assert_eq!(out, records(json!([{"c": 1}])));
    }
}
