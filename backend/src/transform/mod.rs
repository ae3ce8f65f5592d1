//! Transformation module.
//!
//! - Steps: typed step configurations
//! - Executor: applies one step to a table
//! - Pipeline: fetch, flatten and fold the ordered steps

pub mod executor;
pub mod pipeline;
pub mod steps;

pub use executor::{apply, apply_step};
pub use pipeline::{apply_steps, transform_payload, PipelineRunner};
pub use steps::{example_config, steps_description, Condition, Keep, Step};
