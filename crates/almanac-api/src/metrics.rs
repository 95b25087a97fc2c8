//! Prometheus counters for pipeline runs and agent requests.
use almanac_core::RunResult;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pipeline_runs: IntCounterVec,
    agent_requests: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let pipeline_runs = IntCounterVec::new(
            Opts::new("almanac_pipeline_runs_total", "Pipeline runs by trigger and outcome"),
            &["trigger", "outcome"],
        )?;
        let agent_requests = IntCounterVec::new(
            Opts::new("almanac_agent_requests_total", "Agent requests by agent and outcome"),
            &["agent", "outcome"],
        )?;
        registry.register(Box::new(pipeline_runs.clone()))?;
        registry.register(Box::new(agent_requests.clone()))?;

        Ok(Self {
            registry,
            pipeline_runs,
            agent_requests,
        })
    }

    /// `trigger` is where the run came from ("http", "schedule")
    pub fn record_run(&self, trigger: &str, result: &RunResult) {
        let outcome = result.error_kind().map(|k| k.as_str()).unwrap_or("success");
        self.pipeline_runs.with_label_values(&[trigger, outcome]).inc();
    }

    pub fn record_agent(&self, agent: &str, outcome: &str) {
        self.agent_requests.with_label_values(&[agent, outcome]).inc();
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
