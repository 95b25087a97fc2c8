//! End-to-end runs of the today-in-history pipeline with in-memory adapters.

use almanac_adapters::{
    CannedGenerator, DatedFact, FactError, FactSource, StaticFactSource, TextGenerator, UnavailableGenerator,
};
use almanac_core::{ErrorKind, RunError, RunResult};
use almanac_stages::{history_pipeline, Today, FETCH_STEP_ID, HEADER, SUMMARIZE_STEP_ID};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SUMMARY: &str = "Did you know? On this day in 1918 the guns fell silent.";

fn armistice_day() -> Today {
    Today::Fixed(NaiveDate::from_ymd_opt(2025, 11, 11).unwrap())
}

fn armistice_facts() -> StaticFactSource {
    StaticFactSource::new().with_facts(11, 11, vec![DatedFact::new(1918, "Armistice signed")])
}

fn input(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

/// Counts lookups before delegating
struct CountingSource {
    inner: StaticFactSource,
    calls: AtomicUsize,
}

#[async_trait]
impl FactSource for CountingSource {
    async fn events_on(&self, month: u32, day: u32) -> Result<Vec<DatedFact>, FactError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.events_on(month, day).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

// =============================================================================
// Scenario A: facts and summary both land in the final post
// =============================================================================

#[tokio::test]
async fn test_armistice_day_post() {
    let generator = Arc::new(CannedGenerator::new(SUMMARY));
    let pipeline = history_pipeline(Arc::new(armistice_facts()), generator.clone(), armistice_day()).unwrap();

    let out = pipeline.run(input(json!({ "date": "history 11 11" }))).await.unwrap();
    let post = out.output["output"].as_str().unwrap();

    assert_eq!(out.output.len(), 1);
    assert!(post.starts_with(HEADER));
    assert_eq!(post.matches("1918: Armistice signed").count(), 1);
    assert_eq!(post.matches(SUMMARY).count(), 1);

    // The summarizer saw the rendered events
    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("• 1918: Armistice signed"));
}

#[tokio::test]
async fn test_empty_seed_means_today() {
    let pipeline = history_pipeline(
        Arc::new(armistice_facts()),
        Arc::new(CannedGenerator::new(SUMMARY)),
        armistice_day(),
    )
    .unwrap();

    let out = pipeline.run(Map::new()).await.unwrap();
    let post = out.output["output"].as_str().unwrap();

    assert!(post.contains("Historical events for 11/11:"));
    assert!(post.contains(SUMMARY));
    assert!(!out.deterministic);
    assert_eq!(out.steps.len(), 3);
}

// =============================================================================
// Scenario B: no facts is still a valid fetch output
// =============================================================================

#[tokio::test]
async fn test_no_events_found() {
    let pipeline = history_pipeline(
        Arc::new(StaticFactSource::new()),
        Arc::new(CannedGenerator::new("Did you know? Quiet day.")),
        armistice_day(),
    )
    .unwrap();

    let out = pipeline.run(input(json!({ "date": "6/12" }))).await.unwrap();
    let post = out.output["output"].as_str().unwrap();
    assert!(post.contains("No historical events found for 6/12."));
    assert!(post.contains("Did you know? Quiet day."));
}

// =============================================================================
// Scenario C: generation failure surfaces on the summarize step
// =============================================================================

#[tokio::test]
async fn test_generation_failure_names_summarize_step() {
    let source = Arc::new(CountingSource {
        inner: armistice_facts(),
        calls: AtomicUsize::new(0),
    });
    let generator: Arc<dyn TextGenerator> = Arc::new(UnavailableGenerator::new("quota exhausted"));
    let pipeline = history_pipeline(source.clone(), generator, armistice_day()).unwrap();

    let result: RunResult = pipeline.run(input(json!({ "date": "11/11" }))).await.into();
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    match &result {
        RunResult::Failure {
            step_id,
            error_kind,
            cause,
            ..
        } => {
            assert_eq!(step_id, SUMMARIZE_STEP_ID);
            assert_eq!(*error_kind, ErrorKind::StepExecutionError);
            assert!(cause.as_deref().unwrap_or_default().contains("quota exhausted"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    // Nothing from the fetch step leaks into the failure
    let wire = serde_json::to_string(&result).unwrap();
    assert!(!wire.contains("Armistice"));
}

// =============================================================================
// Input handling
// =============================================================================

#[tokio::test]
async fn test_bad_date_shapes_are_input_errors() {
    let pipeline = history_pipeline(
        Arc::new(armistice_facts()),
        Arc::new(CannedGenerator::new(SUMMARY)),
        armistice_day(),
    )
    .unwrap();

    for bad in [json!({ "date": 1111 }), json!({ "when": "today" })] {
        let err = pipeline.run(input(bad)).await.unwrap_err();
        assert!(matches!(err, RunError::InputValidation { ref step_id, .. } if step_id == FETCH_STEP_ID));
    }
}

#[tokio::test]
async fn test_unparseable_date_fails_fetch_step() {
    let generator = Arc::new(CannedGenerator::new(SUMMARY));
    let pipeline = history_pipeline(Arc::new(armistice_facts()), generator.clone(), armistice_day()).unwrap();

    let err = pipeline.run(input(json!({ "date": "November 11" }))).await.unwrap_err();
    match err {
        RunError::StepExecution { step_id, cause } => {
            assert_eq!(step_id, FETCH_STEP_ID);
            assert!(cause.to_string().contains("november 11"));
        }
        other => panic!("expected StepExecution, got {other:?}"),
    }
    assert!(generator.prompts().is_empty());
}
