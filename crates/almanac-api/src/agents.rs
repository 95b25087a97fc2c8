//! Agent registry: one free-text message in, one generation call out.
//!
//! This path never touches the pipeline.
use almanac_adapters::{GenerationError, TextGenerator};
use almanac_stages::SUMMARY_INSTRUCTIONS;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

pub const TODAY_IN_HISTORY_AGENT: &str = "today-in-history-agent";
pub const SUMMARY_AGENT: &str = "summary-agent";

pub const TODAY_IN_HISTORY_INSTRUCTIONS: &str = "You are a helpful assistant that provides notable historical \
events for today or a requested date. When possible, return them clearly as bullet points with the year and \
short description.";

/// Returned in place of generated text when generation fails
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error processing your request.";

/// Returned when the requested agent does not exist
pub const UNKNOWN_AGENT_REPLY: &str = "Sorry, I couldn't process that request.";

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("AGENT/UNKNOWN: no agent named `{0}`")]
    UnknownAgent(String),

    #[error("AGENT/GEN: {agent}: {source}")]
    Generation {
        agent: String,
        #[source]
        source: GenerationError,
    },
}

impl AgentError {
    pub fn fallback_reply(&self) -> &'static str {
        match self {
            Self::UnknownAgent(_) => UNKNOWN_AGENT_REPLY,
            Self::Generation { .. } => FALLBACK_REPLY,
        }
    }
}

pub struct Agent {
    pub id: String,
    pub name: String,
    pub instructions: String,
    generator: Arc<dyn TextGenerator>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        instructions: impl Into<String>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            instructions: instructions.into(),
            generator,
        }
    }

    pub fn prompt(&self, message: &str) -> String {
        format!("{}\n\nUser: {}", self.instructions, message)
    }
}

#[derive(Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two stock agents, both backed by `generator`
    pub fn with_defaults(generator: Arc<dyn TextGenerator>) -> Self {
        let mut registry = Self::new();
        registry.register(Agent::new(
            TODAY_IN_HISTORY_AGENT,
            "Today in History Agent",
            TODAY_IN_HISTORY_INSTRUCTIONS,
            generator.clone(),
        ));
        registry.register(Agent::new(SUMMARY_AGENT, "Summary Agent", SUMMARY_INSTRUCTIONS, generator));
        registry
    }

    pub fn register(&mut self, agent: Agent) {
        self.agents.insert(agent.id.clone(), agent);
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    /// Passes `message` to the agent's generator and returns its text verbatim
    pub async fn respond(&self, agent_id: &str, message: &str) -> Result<String, AgentError> {
        let agent = self
            .get(agent_id)
            .ok_or_else(|| AgentError::UnknownAgent(agent_id.to_string()))?;

        agent
            .generator
            .generate(&agent.prompt(message))
            .await
            .map_err(|source| AgentError::Generation {
                agent: agent_id.to_string(),
                source,
            })
    }
}
