//! Almanac Stages: the today-in-history steps and their canonical pipeline.
//!
//! # Pipeline Flow
//!
//! ```text
//! {date?} → fetch-history → summarize-history → finalize → {output}
//!              ↓                  ↓                 ↓
//!        events, facts         summary           output
//! ```
//!
//! `fetch-history` and `summarize-history` call external services, so two
//! runs over the same input may produce different text. The sealed pipeline
//! reports this through `Pipeline::deterministic()`.

pub mod date;
mod fetch_history;
mod finalize;
mod summarize_history;

pub use date::{parse_date_request, DateParseError, MonthDay, Today};
pub use fetch_history::{render_events, FetchHistoryStep, FETCH_STEP_ID};
pub use finalize::{compose, FinalizeStep, FINALIZE_STEP_ID, HEADER, SUMMARY_HEADING};
pub use summarize_history::{summary_prompt, SummarizeHistoryStep, SUMMARIZE_STEP_ID, SUMMARY_INSTRUCTIONS};

use almanac_adapters::{FactSource, TextGenerator};
use almanac_core::{ConfigError, Pipeline, Shape};
use std::sync::Arc;

pub const PIPELINE_ID: &str = "today-in-history-workflow";

const PIPELINE_IN_SCHEMA: &[u8] = include_bytes!("../schemas/pipeline.in.json");
const PIPELINE_OUT_SCHEMA: &[u8] = include_bytes!("../schemas/finalize.out.json");

/// Builds and seals the one canonical definition:
/// `fetch-history → summarize-history → finalize`.
pub fn history_pipeline(
    facts: Arc<dyn FactSource>,
    generator: Arc<dyn TextGenerator>,
    today: Today,
) -> Result<Pipeline, ConfigError> {
    let mut builder = Pipeline::define(
        PIPELINE_ID,
        Shape::from_json_schema("pipeline.in", PIPELINE_IN_SCHEMA)?,
        Shape::from_json_schema("pipeline.out", PIPELINE_OUT_SCHEMA)?,
    );
    builder
        .append(FetchHistoryStep::new(facts, today)?)?
        .append(SummarizeHistoryStep::new(generator)?)?
        .append(FinalizeStep::new()?)?;
    builder.seal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_adapters::{CannedGenerator, StaticFactSource};

    #[test]
    fn test_history_pipeline_layout() {
        let pipeline = history_pipeline(
            Arc::new(StaticFactSource::new()),
            Arc::new(CannedGenerator::new("x")),
            Today::default(),
        )
        .unwrap();

        assert_eq!(pipeline.id(), PIPELINE_ID);
        assert_eq!(pipeline.step_ids(), vec![FETCH_STEP_ID, SUMMARIZE_STEP_ID, FINALIZE_STEP_ID]);
        assert!(!pipeline.deterministic());
        assert!(pipeline.input_shape().is_strict());
    }
}
