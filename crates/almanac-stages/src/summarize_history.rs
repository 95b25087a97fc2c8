use almanac_adapters::TextGenerator;
use almanac_core::{ConfigError, RunningState, Shape, Step, StepInput, StepOutput};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const IN_SCHEMA: &[u8] = include_bytes!("../schemas/summarize.in.json");
const OUT_SCHEMA: &[u8] = include_bytes!("../schemas/summarize.out.json");

pub const SUMMARIZE_STEP_ID: &str = "summarize-history";

/// Voice of the summary writer, shared with the `summary-agent`
pub const SUMMARY_INSTRUCTIONS: &str = "You are a concise writer who takes a list of historical events and turns \
them into a short, engaging summary paragraph. Make it sound like a \"Did you know?\" post. Keep it under 2 \
sentences, friendly tone.";

pub fn summary_prompt(events: &str) -> String {
    format!(
        "{}\n\nSummarize these historical events into 2 sentences:\n\n{}",
        SUMMARY_INSTRUCTIONS, events
    )
}

pub struct SummarizeHistoryStep {
    generator: Arc<dyn TextGenerator>,
    input: Shape,
    output: Shape,
}

impl SummarizeHistoryStep {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self, ConfigError> {
        Ok(Self {
            generator,
            input: Shape::from_json_schema("summarize.in", IN_SCHEMA)?,
            output: Shape::from_json_schema("summarize.out", OUT_SCHEMA)?,
        })
    }
}

#[async_trait]
impl Step for SummarizeHistoryStep {
    fn id(&self) -> &str {
        SUMMARIZE_STEP_ID
    }

    fn input_shape(&self) -> &Shape {
        &self.input
    }

    fn output_shape(&self) -> &Shape {
        &self.output
    }

    fn deterministic(&self) -> bool {
        false
    }

    async fn execute(&self, input: StepInput, _state: &RunningState) -> anyhow::Result<StepOutput> {
        let events = input.get("events").and_then(Value::as_str).unwrap_or_default();
        let summary = self
            .generator
            .generate(&summary_prompt(events))
            .await
            .with_context(|| format!("summary generation via {}", self.generator.name()))?;

        let mut output = StepOutput::new();
        output.insert("summary".into(), json!(summary.trim()));
        Ok(output)
    }
}
