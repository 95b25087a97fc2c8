//! Process configuration: flags, each also readable from the environment
use almanac_adapters::{
    FactSource, GeminiGenerator, TextGenerator, UnavailableFactSource, UnavailableGenerator, WikipediaFactSource,
    USER_AGENT,
};
use almanac_stages::Today;
use anyhow::Context;
use chrono::{FixedOffset, NaiveTime};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FactSourceKind {
    Wikipedia,
    /// Every lookup fails as unavailable
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorKind {
    Gemini,
    /// Every generation fails; agents answer with their fallback text
    Offline,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "almanac-api")]
#[command(about = "Today in History pipeline server")]
#[command(version)]
pub struct AppConfig {
    /// Listen address
    #[arg(long, env = "ALMANAC_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: String,

    #[arg(long, env = "FACT_SOURCE", value_enum, default_value = "wikipedia")]
    pub fact_source: FactSourceKind,

    #[arg(long, env = "FACTS_BASE_URL", default_value = "https://en.wikipedia.org/api/rest_v1")]
    pub facts_base_url: String,

    /// Maximum facts per lookup
    #[arg(long, env = "FACT_LIMIT", default_value_t = 5)]
    pub fact_limit: usize,

    #[arg(long, env = "TEXT_GENERATOR", value_enum, default_value = "gemini")]
    pub generator: GeneratorKind,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.0-flash")]
    pub gemini_model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = "https://generativelanguage.googleapis.com/v1beta")]
    pub gemini_base_url: String,

    /// Per-request timeout for upstream calls, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Run the pipeline once a day
    #[arg(long, env = "SCHEDULE_ENABLED", default_value = "false")]
    pub schedule: bool,

    /// Local time of the daily run, HH:MM
    #[arg(long, env = "SCHEDULE_AT", default_value = "08:00", value_parser = parse_hhmm)]
    pub schedule_at: NaiveTime,

    /// Offset used for "today" and the schedule (Africa/Lagos is +1)
    #[arg(long, env = "UTC_OFFSET_HOURS", default_value_t = 1, allow_hyphen_values = true)]
    pub utc_offset_hours: i32,
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| format!("expected HH:MM: {}", e))
}

impl AppConfig {
    pub fn offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .with_context(|| format!("UTC offset {}h is out of range", self.utc_offset_hours))
    }

    pub fn today(&self) -> anyhow::Result<Today> {
        Ok(Today::Offset(self.offset()?))
    }

    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .build()
            .context("building HTTP client")
    }

    pub fn fact_source(&self, client: reqwest::Client) -> Arc<dyn FactSource> {
        match self.fact_source {
            FactSourceKind::Wikipedia => Arc::new(
                WikipediaFactSource::new(client)
                    .with_base_url(&self.facts_base_url)
                    .with_limit(self.fact_limit),
            ),
            FactSourceKind::Offline => Arc::new(UnavailableFactSource),
        }
    }

    pub fn text_generator(&self, client: reqwest::Client) -> Arc<dyn TextGenerator> {
        match (self.generator, self.gemini_api_key.as_deref()) {
            (GeneratorKind::Gemini, Some(key)) if !key.trim().is_empty() => Arc::new(
                GeminiGenerator::new(client, key.trim())
                    .with_base_url(&self.gemini_base_url)
                    .with_model(&self.gemini_model),
            ),
            (GeneratorKind::Gemini, _) => {
                tracing::warn!("GEMINI_API_KEY is not set; text generation is unavailable");
                Arc::new(UnavailableGenerator::new("GEMINI_API_KEY is not set"))
            }
            (GeneratorKind::Offline, _) => Arc::new(UnavailableGenerator::default()),
        }
    }
}
