//! Daily trigger: runs the pipeline once a day at a fixed local time.
use almanac_core::RunResult;
use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeZone, Utc};
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;

use crate::state::AppState;

/// First instant strictly after `now` whose local time in `offset` is `at`
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let mut target = local.date_naive().and_time(at);
    if target <= local.naive_local() {
        target = target.checked_add_days(Days::new(1)).unwrap_or(target);
    }
    offset
        .from_local_datetime(&target)
        .single()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now + chrono::Duration::days(1))
}

/// One scheduled run with `{"date": "today"}`
pub async fn run_once(state: &AppState) -> RunResult {
    let mut input = Map::new();
    input.insert("date".to_string(), json!("today"));

    let result: RunResult = state.pipeline.run(input).await.into();
    state.metrics.record_run("schedule", &result);
    match &result {
        RunResult::Success { output, trace_id, .. } => {
            let post = output.get("output").and_then(Value::as_str).unwrap_or_default();
            tracing::info!(%trace_id, "daily run complete\n{}", post);
        }
        RunResult::Failure { step_id, message, .. } => {
            tracing::error!(step = %step_id, %message, "daily run failed");
        }
    }
    result
}

pub fn spawn_daily(state: AppState, at: NaiveTime, offset: FixedOffset) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, at, offset);
            tracing::info!(next_run = %next.with_timezone(&offset), "daily run scheduled");

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            run_once(&state).await;
        }
    })
}
