//! Pipeline: builder with contract checks, and the sequential runner
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::data_model::{RunOutput, StepTrace};
use crate::error::{ConfigError, RunError};
use crate::shape::{json_kind, Shape, Violation, Violations};
use crate::state::RunningState;
use crate::step::Step;

/// Producer name recorded for keys supplied by the pipeline's initial input
const PIPELINE_INPUT: &str = "<input>";

/// Assembles a pipeline. Each `append` checks the new step against every
/// step before it; `seal` freezes the sequence.
pub struct PipelineBuilder {
    id: String,
    input_shape: Shape,
    output_shape: Shape,
    steps: Vec<Arc<dyn Step>>,
    producers: HashMap<String, String>,
    sealed: bool,
}

impl PipelineBuilder {
    pub fn append<S: Step + 'static>(&mut self, step: S) -> Result<&mut Self, ConfigError> {
        self.append_shared(Arc::new(step))
    }

    pub fn append_shared(&mut self, step: Arc<dyn Step>) -> Result<&mut Self, ConfigError> {
        if self.sealed {
            return Err(ConfigError::Sealed(self.id.clone()));
        }

        let step_id = step.id();
        if step_id.trim().is_empty() {
            return Err(ConfigError::EmptyStepId);
        }
        if self.steps.iter().any(|s| s.id() == step_id) {
            return Err(ConfigError::DuplicateStepId(step_id.to_string()));
        }

        // Producer before consumer: everything a step reads must already be
        // declared by the pipeline input or an earlier step's output.
        if let Some(field) = step
            .input_shape()
            .fields()
            .iter()
            .find(|f| !self.producers.contains_key(&f.name))
        {
            return Err(ConfigError::UnproducedInput {
                step_id: step_id.to_string(),
                key: field.name.clone(),
            });
        }

        for key in step.output_shape().field_names() {
            if let Some(producer) = self.producers.get(key) {
                return Err(ConfigError::DuplicateOutputKey {
                    step_id: step_id.to_string(),
                    key: key.to_string(),
                    producer: producer.clone(),
                });
            }
        }

        for key in step.output_shape().field_names() {
            self.producers.insert(key.to_string(), step_id.to_string());
        }
        tracing::debug!(pipeline = %self.id, step = step_id, position = self.steps.len(), "step appended");
        self.steps.push(step);
        Ok(self)
    }

    pub fn seal(&mut self) -> Result<Pipeline, ConfigError> {
        if self.sealed {
            return Err(ConfigError::Sealed(self.id.clone()));
        }
        let last = self
            .steps
            .last()
            .ok_or_else(|| ConfigError::EmptyPipeline(self.id.clone()))?;

        if let Some(key) = self
            .output_shape
            .field_names()
            .find(|k| !last.output_shape().declares(k))
        {
            return Err(ConfigError::UndeclaredPipelineOutput {
                pipeline_id: self.id.clone(),
                step_id: last.id().to_string(),
                key: key.to_string(),
            });
        }

        self.sealed = true;
        let pipeline = Pipeline {
            id: self.id.clone(),
            input_shape: self.input_shape.clone(),
            output_shape: self.output_shape.clone(),
            steps: self.steps.clone(),
        };
        tracing::info!(pipeline = %pipeline.id, route = %pipeline.route(), "pipeline sealed");
        Ok(pipeline)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

/// A sealed, immutable sequence of steps. Holds no per-run state, so one
/// instance can serve any number of concurrent runs behind an `Arc`.
pub struct Pipeline {
    id: String,
    input_shape: Shape,
    output_shape: Shape,
    steps: Vec<Arc<dyn Step>>,
}

impl Pipeline {
    pub fn define(id: impl Into<String>, input_shape: Shape, output_shape: Shape) -> PipelineBuilder {
        let producers = input_shape
            .field_names()
            .map(|name| (name.to_string(), PIPELINE_INPUT.to_string()))
            .collect();

        PipelineBuilder {
            id: id.into(),
            input_shape,
            output_shape,
            steps: Vec::new(),
            producers,
            sealed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn input_shape(&self) -> &Shape {
        &self.input_shape
    }

    pub fn output_shape(&self) -> &Shape {
        &self.output_shape
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step ids joined in execution order (ex: "fetch→summarize→finalize")
    pub fn route(&self) -> String {
        self.step_ids().join("→")
    }

    /// True only if every step declares itself deterministic
    pub fn deterministic(&self) -> bool {
        self.steps.iter().all(|s| s.deterministic())
    }

    /// Runs every step in declaration order against a fresh running state.
    ///
    /// The first failure ends the run; its partial state is dropped with it.
    pub async fn run(&self, initial: Map<String, Value>) -> Result<RunOutput, RunError> {
        let seed = self
            .input_shape
            .check_input(&initial)
            .map_err(|violations| RunError::InputValidation {
                step_id: self.first_step_id().to_string(),
                violations,
            })?;

        let state = RunningState::new(seed);
        let span = tracing::info_span!("pipeline_run", pipeline = %self.id, trace_id = %state.trace_id);
        self.run_steps(state).instrument(span).await
    }

    /// Runs with a raw JSON body as initial input. An empty body or `null`
    /// counts as an empty mapping; any other non-object fails input
    /// validation at the first step without running anything.
    pub async fn run_json(&self, body: &[u8]) -> Result<RunOutput, RunError> {
        match initial_mapping(body) {
            Ok(initial) => self.run(initial).await,
            Err(violation) => Err(RunError::InputValidation {
                step_id: self.first_step_id().to_string(),
                violations: Violations(vec![violation]),
            }),
        }
    }

    fn first_step_id(&self) -> &str {
        self.steps.first().map(|s| s.id()).unwrap_or(self.id.as_str())
    }

    async fn run_steps(&self, mut state: RunningState) -> Result<RunOutput, RunError> {
        let mut traces = Vec::with_capacity(self.steps.len());
        let mut last_output = Map::new();

        for step in &self.steps {
            let step_id = step.id();
            let input = step
                .input_shape()
                .extract(state.values())
                .map_err(|violations| {
                    tracing::warn!(step = step_id, %violations, "step input rejected");
                    RunError::InputValidation {
                        step_id: step_id.to_string(),
                        violations,
                    }
                })?;

            let in_hash = hash_map(&input);
            let start = Instant::now();
            tracing::info!(step = step_id, "running step");

            let output = step.execute(input, &state).await.map_err(|cause| {
                tracing::warn!(step = step_id, error = %cause, "step failed");
                RunError::StepExecution {
                    step_id: step_id.to_string(),
                    cause,
                }
            })?;

            step.output_shape().check_output(&output).map_err(|violations| {
                tracing::error!(step = step_id, %violations, "step broke its output contract");
                RunError::OutputValidation {
                    step_id: step_id.to_string(),
                    violations,
                }
            })?;

            let latency_ms = start.elapsed().as_millis() as u64;
            traces.push(StepTrace {
                id: step_id.to_string(),
                in_hash,
                out_hash: hash_map(&output),
                deterministic: step.deterministic(),
                latency_ms,
            });
            tracing::debug!(step = step_id, latency_ms, "step complete");

            state.merge(step_id, &output);
            last_output = output;
        }

        Ok(RunOutput {
            pipeline_id: self.id.clone(),
            trace_id: state.trace_id,
            output: last_output,
            steps: traces,
            deterministic: self.deterministic(),
        })
    }
}

fn hash_map(data: &Map<String, Value>) -> String {
    let bytes = serde_json::to_vec(data).unwrap_or_default();
    format!("blake3:{}", blake3::hash(&bytes))
}

fn initial_mapping(body: &[u8]) -> Result<Map<String, Value>, Violation> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(Violation::NotAMapping {
            found: json_kind(&other).to_string(),
        }),
        Err(e) => Err(Violation::NotAMapping {
            found: format!("malformed JSON ({})", e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::FieldType;
    use crate::step::{FnStep, StepInput, StepOutput};

    fn step(id: &str, input: Shape, output: Shape) -> impl Step {
        FnStep::new(id, input, output, |_input: StepInput, _state: RunningState| async {
            Ok::<_, anyhow::Error>(StepOutput::new())
        })
    }

    fn text(name: &str) -> Shape {
        Shape::new().required(name, FieldType::String)
    }

    #[test]
    fn test_empty_step_id_rejected() {
        let mut builder = Pipeline::define("p", Shape::empty(), Shape::empty());
        let err = builder.append(step("  ", Shape::empty(), Shape::empty())).err();
        assert_eq!(err, Some(ConfigError::EmptyStepId));
    }

    #[test]
    fn test_duplicate_step_id_rejected() {
        let mut builder = Pipeline::define("p", Shape::empty(), Shape::empty());
        builder.append(step("a", Shape::empty(), text("x"))).unwrap();
        let err = builder.append(step("a", Shape::empty(), text("y"))).err();
        assert_eq!(err, Some(ConfigError::DuplicateStepId("a".into())));
    }

    #[test]
    fn test_duplicate_output_key_rejected() {
        let mut builder = Pipeline::define("p", Shape::empty(), Shape::empty());
        builder.append(step("a", Shape::empty(), text("events"))).unwrap();
        let err = builder.append(step("b", Shape::empty(), text("events"))).err();
        assert_eq!(
            err,
            Some(ConfigError::DuplicateOutputKey {
                step_id: "b".into(),
                key: "events".into(),
                producer: "a".into(),
            })
        );
    }

    #[test]
    fn test_output_colliding_with_pipeline_input_rejected() {
        let mut builder = Pipeline::define("p", text("date"), Shape::empty());
        let err = builder.append(step("a", Shape::empty(), text("date"))).err().unwrap();
        assert!(matches!(err, ConfigError::DuplicateOutputKey { ref producer, .. } if producer == PIPELINE_INPUT));
    }

    #[test]
    fn test_reading_unproduced_key_rejected() {
        let mut builder = Pipeline::define("p", Shape::empty(), Shape::empty());
        builder.append(step("a", Shape::empty(), text("events"))).unwrap();
        let err = builder.append(step("b", text("summary"), text("output"))).err();
        assert_eq!(
            err,
            Some(ConfigError::UnproducedInput {
                step_id: "b".into(),
                key: "summary".into(),
            })
        );
        // A rejected append leaves the builder usable
        assert_eq!(builder.len(), 1);
        builder.append(step("b", text("events"), text("summary"))).unwrap();
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_seal_rejects_empty_pipeline() {
        let mut builder = Pipeline::define("p", Shape::empty(), Shape::empty());
        assert_eq!(builder.seal().err(), Some(ConfigError::EmptyPipeline("p".into())));
        assert!(!builder.is_sealed());
    }

    #[test]
    fn test_seal_checks_pipeline_output() {
        let mut builder = Pipeline::define("p", Shape::empty(), text("output"));
        builder.append(step("a", Shape::empty(), text("summary"))).unwrap();
        assert!(matches!(
            builder.seal(),
            Err(ConfigError::UndeclaredPipelineOutput { ref key, .. }) if key == "output"
        ));
    }

    #[test]
    fn test_append_and_reseal_after_seal_fail() {
        let mut builder = Pipeline::define("p", Shape::empty(), Shape::empty());
        builder.append(step("a", Shape::empty(), text("x"))).unwrap();
        let pipeline = builder.seal().unwrap();
        assert_eq!(pipeline.len(), 1);

        for _ in 0..2 {
            assert_eq!(
                builder.append(step("b", Shape::empty(), text("y"))).err(),
                Some(ConfigError::Sealed("p".into()))
            );
            assert_eq!(builder.seal().err(), Some(ConfigError::Sealed("p".into())));
        }
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_route_and_determinism() {
        let mut builder = Pipeline::define("p", Shape::empty(), Shape::empty());
        builder
            .append(step("fetch", Shape::empty(), text("events")))
            .unwrap()
            .append(step("finalize", text("events"), text("output")))
            .unwrap();
        let pipeline = builder.seal().unwrap();
        assert_eq!(pipeline.route(), "fetch→finalize");
        assert!(pipeline.deterministic());
    }

    #[test]
    fn test_blank_or_null_body_is_empty_mapping() {
        for body in [&b""[..], b"  \n", b"null"] {
            assert_eq!(initial_mapping(body), Ok(Map::new()));
        }
        let map = initial_mapping(br#"{"date":"11/11"}"#).unwrap();
        assert_eq!(map.get("date"), Some(&Value::from("11/11")));
    }

    #[test]
    fn test_non_object_body_is_not_a_mapping() {
        assert_eq!(
            initial_mapping(b"[]"),
            Err(Violation::NotAMapping { found: "array".into() })
        );
        let err = initial_mapping(b"{date").unwrap_err();
        assert!(err.to_string().contains("malformed JSON"));
        assert_eq!(err.field(), None);
    }
}
