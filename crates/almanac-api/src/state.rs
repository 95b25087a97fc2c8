//! Shared handles built once at startup and passed to every consumer.
use almanac_core::Pipeline;
use std::sync::Arc;

use crate::agents::AgentRegistry;
use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub agents: Arc<AgentRegistry>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, agents: AgentRegistry, metrics: Metrics) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            agents: Arc::new(agents),
            metrics: Arc::new(metrics),
        }
    }
}
