use almanac_adapters::{DatedFact, FactSource};
use almanac_core::{ConfigError, RunningState, Shape, Step, StepInput, StepOutput};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::date::{parse_date_request, MonthDay, Today};

const IN_SCHEMA: &[u8] = include_bytes!("../schemas/fetch.in.json");
const OUT_SCHEMA: &[u8] = include_bytes!("../schemas/fetch.out.json");

pub const FETCH_STEP_ID: &str = "fetch-history";

/// Resolves the requested date and looks up its facts
pub struct FetchHistoryStep {
    source: Arc<dyn FactSource>,
    today: Today,
    input: Shape,
    output: Shape,
}

impl FetchHistoryStep {
    pub fn new(source: Arc<dyn FactSource>, today: Today) -> Result<Self, ConfigError> {
        Ok(Self {
            source,
            today,
            input: Shape::from_json_schema("fetch.in", IN_SCHEMA)?,
            output: Shape::from_json_schema("fetch.out", OUT_SCHEMA)?,
        })
    }
}

/// Bullet list of facts under a dated heading, or a "none found" line
pub fn render_events(when: MonthDay, facts: &[DatedFact]) -> String {
    if facts.is_empty() {
        return format!("No historical events found for {}.", when);
    }
    let lines: Vec<String> = facts.iter().map(|f| format!("• {}: {}", f.year, f.text)).collect();
    format!("Historical events for {}:\n{}", when, lines.join("\n"))
}

#[async_trait]
impl Step for FetchHistoryStep {
    fn id(&self) -> &str {
        FETCH_STEP_ID
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
        let when = parse_date_request(input.get("date").and_then(Value::as_str), &self.today)?;
        let facts = self
            .source
            .events_on(when.month, when.day)
            .await
            .with_context(|| format!("fact lookup for {} via {}", when, self.source.name()))?;
        tracing::info!(date = %when, count = facts.len(), "facts resolved");

        let mut output = StepOutput::new();
        output.insert("events".into(), json!(render_events(when, &facts)));
        output.insert("facts".into(), serde_json::to_value(&facts)?);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_events() {
        let when = MonthDay { month: 11, day: 11 };
        let facts = vec![DatedFact::new(1918, "Armistice signed"), DatedFact::new(-44, "Ides")];
        assert_eq!(
            render_events(when, &facts),
            "Historical events for 11/11:\n• 1918: Armistice signed\n• -44: Ides"
        );
        assert_eq!(render_events(when, &[]), "No historical events found for 11/11.");
    }

    #[test]
    fn test_bundled_schemas_load() {
        let step = FetchHistoryStep::new(Arc::new(almanac_adapters::StaticFactSource::new()), Today::default()).unwrap();
        assert!(step.input_shape().declares("date"));
        assert!(step.output_shape().field("events").unwrap().required);
        assert!(step.output_shape().is_strict());
    }
}
