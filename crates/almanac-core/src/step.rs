//! Step Trait: one contract-bound transformation in a pipeline
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;

use crate::shape::Shape;
use crate::state::RunningState;

/// Fields extracted from the running state according to a step's input shape
pub type StepInput = Map<String, Value>;

/// Fields a step adds to the running state
pub type StepOutput = Map<String, Value>;

/// Contract of a single pipeline step.
///
/// The pipeline validates `input` against [`Step::input_shape`] before calling
/// [`Step::execute`], and the returned map against [`Step::output_shape`]
/// before merging it. Any `Err` halts the run at this step.
#[async_trait]
pub trait Step: Send + Sync {
    /// Unique id within a pipeline (ex: "fetch-history")
    fn id(&self) -> &str;

    fn input_shape(&self) -> &Shape;

    fn output_shape(&self) -> &Shape;

    /// Whether equal inputs always yield equal outputs (default: true)
    fn deterministic(&self) -> bool {
        true
    }

    async fn execute(&self, input: StepInput, state: &RunningState) -> anyhow::Result<StepOutput>;
}

/// A step assembled from a closure. The closure receives the validated input
/// and a snapshot of the running state.
pub struct FnStep<F> {
    id: String,
    input_shape: Shape,
    output_shape: Shape,
    deterministic: bool,
    executor: F,
}

impl<F, Fut> FnStep<F>
where
    F: Fn(StepInput, RunningState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send + 'static,
{
    pub fn new(id: impl Into<String>, input_shape: Shape, output_shape: Shape, executor: F) -> Self {
        Self {
            id: id.into(),
            input_shape,
            output_shape,
            deterministic: true,
            executor,
        }
    }

    pub fn non_deterministic(mut self) -> Self {
        self.deterministic = false;
        self
    }
}

#[async_trait]
impl<F, Fut> Step for FnStep<F>
where
    F: Fn(StepInput, RunningState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn input_shape(&self) -> &Shape {
        &self.input_shape
    }

    fn output_shape(&self) -> &Shape {
        &self.output_shape
    }

    fn deterministic(&self) -> bool {
        self.deterministic
    }

    async fn execute(&self, input: StepInput, state: &RunningState) -> anyhow::Result<StepOutput> {
        (self.executor)(input, state.clone()).await
    }
}
