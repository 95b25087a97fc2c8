//! Fact lookup: dated facts for a month/day pair
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::FactError;

/// One historical fact. Negative years are BCE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedFact {
    pub year: i64,
    pub text: String,
}

impl DatedFact {
    pub fn new(year: i64, text: impl Into<String>) -> Self {
        Self {
            year,
            text: text.into(),
        }
    }
}

#[async_trait]
pub trait FactSource: Send + Sync {
    /// Facts for `month` (1..=12) and `day` (1..=31), in upstream order
    async fn events_on(&self, month: u32, day: u32) -> Result<Vec<DatedFact>, FactError>;

    fn name(&self) -> &str;
}

fn check_range(month: u32, day: u32) -> Result<(), FactError> {
    if (1..=12).contains(&month) && (1..=31).contains(&day) {
        Ok(())
    } else {
        Err(FactError::InvalidDate { month, day })
    }
}

/// Wikimedia "on this day" feed
pub struct WikipediaFactSource {
    client: Client,
    base_url: String,
    limit: usize,
}

#[derive(Deserialize)]
struct OnThisDay {
    #[serde(default)]
    events: Vec<DatedFact>,
}

impl WikipediaFactSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: "https://en.wikipedia.org/api/rest_v1".to_string(),
            limit: 5,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Maximum number of facts returned per lookup
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl FactSource for WikipediaFactSource {
    async fn events_on(&self, month: u32, day: u32) -> Result<Vec<DatedFact>, FactError> {
        check_range(month, day)?;
        let url = format!("{}/feed/onthisday/events/{}/{}", self.base_url, month, day);
        tracing::debug!(%url, "fetching facts");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FactError::Unavailable(format!("HTTP {} from {}", status.as_u16(), url)));
        }

        let mut feed: OnThisDay = response.json().await?;
        feed.events.truncate(self.limit);
        tracing::debug!(month, day, count = feed.events.len(), "facts fetched");
        Ok(feed.events)
    }

    fn name(&self) -> &str {
        "wikipedia"
    }
}

/// In-memory facts keyed by (month, day). Unknown dates yield no facts.
#[derive(Debug, Clone, Default)]
pub struct StaticFactSource {
    facts: HashMap<(u32, u32), Vec<DatedFact>>,
}

impl StaticFactSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_facts(mut self, month: u32, day: u32, facts: Vec<DatedFact>) -> Self {
        self.facts.insert((month, day), facts);
        self
    }
}

#[async_trait]
impl FactSource for StaticFactSource {
    async fn events_on(&self, month: u32, day: u32) -> Result<Vec<DatedFact>, FactError> {
        check_range(month, day)?;
        Ok(self.facts.get(&(month, day)).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Always unavailable; used when no fact source is configured
#[derive(Debug, Clone, Default)]
pub struct UnavailableFactSource;

#[async_trait]
impl FactSource for UnavailableFactSource {
    async fn events_on(&self, _month: u32, _day: u32) -> Result<Vec<DatedFact>, FactError> {
        Err(FactError::Unavailable("no fact source configured".to_string()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_lookup() {
        let source = StaticFactSource::new().with_facts(11, 11, vec![DatedFact::new(1918, "Armistice signed")]);

        let facts = source.events_on(11, 11).await.unwrap();
        assert_eq!(facts, vec![DatedFact::new(1918, "Armistice signed")]);
        assert!(source.events_on(6, 12).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_dates_rejected() {
        let source = StaticFactSource::new();
        assert!(matches!(
            source.events_on(13, 1).await,
            Err(FactError::InvalidDate { month: 13, day: 1 })
        ));
        assert!(source.events_on(1, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_unavailable_source() {
        assert!(matches!(
            UnavailableFactSource.events_on(1, 1).await,
            Err(FactError::Unavailable(_))
        ));
    }
}
