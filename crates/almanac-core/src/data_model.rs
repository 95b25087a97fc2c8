//! Data Model: step traces, run output and the wire-level RunResult
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RunError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTrace {
    pub id: String,
    pub in_hash: String,
    pub out_hash: String,
    pub deterministic: bool,
    pub latency_ms: u64,
}

/// Successful run: the last step's validated output plus per-step traces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub pipeline_id: String,
    pub trace_id: String,
    pub output: Map<String, Value>,
    pub steps: Vec<StepTrace>,
    /// False when any step declared itself non-deterministic
    pub deterministic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InputValidationError,
    OutputValidationError,
    StepExecutionError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::OutputValidationError => "OutputValidationError",
            Self::StepExecutionError => "StepExecutionError",
        }
    }
}

/// Serializable outcome of `Pipeline::run`, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunResult {
    Success {
        output: Map<String, Value>,
        pipeline_id: String,
        trace_id: String,
        deterministic: bool,
        steps: Vec<StepTrace>,
    },
    Failure {
        step_id: String,
        error_kind: ErrorKind,
        message: String,
        /// Offending field names for validation failures
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fields: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error_kind, .. } => Some(*error_kind),
        }
    }
}

impl From<RunOutput> for RunResult {
    fn from(out: RunOutput) -> Self {
        Self::Success {
            output: out.output,
            pipeline_id: out.pipeline_id,
            trace_id: out.trace_id,
            deterministic: out.deterministic,
            steps: out.steps,
        }
    }
}

impl From<RunError> for RunResult {
    fn from(err: RunError) -> Self {
        let message = err.to_string();
        match err {
            RunError::InputValidation { step_id, violations } => Self::Failure {
                step_id,
                error_kind: ErrorKind::InputValidationError,
                message,
                fields: violations.fields().into_iter().map(String::from).collect(),
                cause: None,
            },
            RunError::OutputValidation { step_id, violations } => Self::Failure {
                step_id,
                error_kind: ErrorKind::OutputValidationError,
                message,
                fields: violations.fields().into_iter().map(String::from).collect(),
                cause: None,
            },
            RunError::StepExecution { step_id, cause } => Self::Failure {
                step_id,
                error_kind: ErrorKind::StepExecutionError,
                message,
                fields: Vec::new(),
                cause: Some(format!("{:#}", cause)),
            },
        }
    }
}

impl From<Result<RunOutput, RunError>> for RunResult {
    fn from(result: Result<RunOutput, RunError>) -> Self {
        match result {
            Ok(out) => out.into(),
            Err(err) => err.into(),
        }
    }
}
