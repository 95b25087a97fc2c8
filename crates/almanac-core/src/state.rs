//! Running State: per-run accumulation threaded through the pipeline
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// State owned by one `run` invocation. Keys are only ever added; a key,
/// once present, keeps its first value for the rest of the run.
#[derive(Debug, Clone)]
pub struct RunningState {
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
    values: Map<String, Value>,
}

impl RunningState {
    pub fn new(seed: Map<String, Value>) -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            values: seed,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Adds a step's validated output. Collisions are ruled out when the
    /// pipeline is assembled, so an existing key here is left untouched.
    pub(crate) fn merge(&mut self, step_id: &str, output: &Map<String, Value>) {
        for (key, value) in output {
            if self.values.contains_key(key) {
                tracing::warn!(step = step_id, key = %key, "ignoring attempt to overwrite state key");
                continue;
            }
            self.values.insert(key.clone(), value.clone());
        }
    }
}
