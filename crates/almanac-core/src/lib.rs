//! Almanac Core: Step trait, declared shapes, RunningState and the pipeline runner
//!
//! A pipeline is an ordered list of steps sharing one running state per run.
//! Every value crossing a step boundary is checked against the step's declared
//! input and output shapes before it is used or merged.

pub mod data_model;
pub mod error;
pub mod pipeline;
pub mod shape;
pub mod state;
pub mod step;

pub use data_model::{ErrorKind, RunOutput, RunResult, StepTrace};
pub use error::{ConfigError, RunError};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use shape::{Field, FieldType, Shape, Violation, Violations};
pub use state::RunningState;
pub use step::{FnStep, Step, StepInput, StepOutput};

/// Engine version reported by the API health endpoint
pub const ALMANAC_VERSION: &str = env!("CARGO_PKG_VERSION");
