use almanac_core::{ConfigError, RunningState, Shape, Step, StepInput, StepOutput};
use async_trait::async_trait;
use serde_json::{json, Value};

const IN_SCHEMA: &[u8] = include_bytes!("../schemas/finalize.in.json");
const OUT_SCHEMA: &[u8] = include_bytes!("../schemas/finalize.out.json");

pub const FINALIZE_STEP_ID: &str = "finalize";

pub const HEADER: &str = "📜 TODAY IN HISTORY 📜";
pub const SUMMARY_HEADING: &str = "💡 Summary:";

pub fn compose(events: &str, summary: &str) -> String {
    format!("{}\n\n{}\n\n{}\n{}", HEADER, events, SUMMARY_HEADING, summary)
}

/// Composes events and summary into the final post
pub struct FinalizeStep {
    input: Shape,
    output: Shape,
}

impl FinalizeStep {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            input: Shape::from_json_schema("finalize.in", IN_SCHEMA)?,
            output: Shape::from_json_schema("finalize.out", OUT_SCHEMA)?,
        })
    }
}

#[async_trait]
impl Step for FinalizeStep {
    fn id(&self) -> &str {
        FINALIZE_STEP_ID
    }

    fn input_shape(&self) -> &Shape {
        &self.input
    }

    fn output_shape(&self) -> &Shape {
        &self.output
    }

    async fn execute(&self, input: StepInput, _state: &RunningState) -> anyhow::Result<StepOutput> {
        let events = input.get("events").and_then(Value::as_str).unwrap_or_default();
        let summary = input.get("summary").and_then(Value::as_str).unwrap_or_default();

        let mut output = StepOutput::new();
        output.insert("output".into(), json!(compose(events, summary)));
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_layout() {
        let text = compose("Historical events for 1/1:\n• 1801: Union", "Did you know?");
        assert_eq!(
            text,
            "📜 TODAY IN HISTORY 📜\n\nHistorical events for 1/1:\n• 1801: Union\n\n💡 Summary:\nDid you know?"
        );
    }
}
