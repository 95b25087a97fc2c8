//! Unified Error Model
use thiserror::Error;

use crate::shape::Violations;

/// Raised while assembling a pipeline. Never produced by `run` once a
/// pipeline has been sealed successfully.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CONFIG/STEP_ID: step id must not be empty")]
    EmptyStepId,

    #[error("CONFIG/DUPLICATE_STEP: step `{0}` is already part of the pipeline")]
    DuplicateStepId(String),

    #[error("CONFIG/DUPLICATE_KEY: step `{step_id}` outputs `{key}`, already produced by `{producer}`")]
    DuplicateOutputKey {
        step_id: String,
        key: String,
        producer: String,
    },

    #[error("CONFIG/UNPRODUCED: step `{step_id}` reads `{key}` which no earlier step produces")]
    UnproducedInput { step_id: String, key: String },

    #[error("CONFIG/SEALED: pipeline `{0}` is sealed")]
    Sealed(String),

    #[error("CONFIG/EMPTY: pipeline `{0}` has no steps")]
    EmptyPipeline(String),

    #[error("CONFIG/OUTPUT: pipeline `{pipeline_id}` promises `{key}` but last step `{step_id}` does not declare it")]
    UndeclaredPipelineOutput {
        pipeline_id: String,
        step_id: String,
        key: String,
    },

    #[error("CONFIG/SCHEMA: {schema}: {reason}")]
    InvalidSchema { schema: String, reason: String },
}

/// Terminal failure of a single pipeline run. Always names exactly one step.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("INPUT/{step_id}: {violations}")]
    InputValidation {
        step_id: String,
        violations: Violations,
    },

    #[error("OUTPUT/{step_id}: {violations}")]
    OutputValidation {
        step_id: String,
        violations: Violations,
    },

    #[error("EXEC/{step_id}: {cause}")]
    StepExecution {
        step_id: String,
        #[source]
        cause: anyhow::Error,
    },
}

impl RunError {
    pub fn step_id(&self) -> &str {
        match self {
            Self::InputValidation { step_id, .. }
            | Self::OutputValidation { step_id, .. }
            | Self::StepExecution { step_id, .. } => step_id,
        }
    }
}
