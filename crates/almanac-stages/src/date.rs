//! Date requests accepted by the fetch step.
//!
//! Accepted forms (case-insensitive, surrounding whitespace ignored):
//!
//! * absent, empty, or `today`: today's date in the configured offset
//! * numeric month then day, optionally prefixed by `history`, separated by
//!   whitespace, `/` or `-`: `history 11 11`, `11/11`, `11-11`
//!
//! Month names are not accepted.
use chrono::{Datelike, FixedOffset, NaiveDate, Offset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:history\s+)?(\d{1,2})(?:\s*[/-]\s*|\s+)(\d{1,2})$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    /// Rejects days the month never has; Feb 29 is allowed
    pub fn new(month: u32, day: u32) -> Result<Self, DateParseError> {
        NaiveDate::from_ymd_opt(2000, month, day)
            .map(|_| Self { month, day })
            .ok_or(DateParseError::NotACalendarDay { month, day })
    }
}

impl From<NaiveDate> for MonthDay {
    fn from(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.day)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("DATE/FORMAT: `{0}` is not 'today' or 'history <month> <day>'")]
    Unrecognized(String),

    #[error("DATE/RANGE: {month}/{day} is not a calendar day")]
    NotACalendarDay { month: u32, day: u32 },
}

/// Where "today" comes from
#[derive(Debug, Clone, Copy)]
pub enum Today {
    /// Current date at a fixed UTC offset
    Offset(FixedOffset),
    /// Pinned date
    Fixed(NaiveDate),
}

impl Today {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Offset(offset) => Utc::now().with_timezone(offset).date_naive(),
            Self::Fixed(date) => *date,
        }
    }
}

impl Default for Today {
    fn default() -> Self {
        Self::Offset(Utc.fix())
    }
}

pub fn parse_date_request(raw: Option<&str>, today: &Today) -> Result<MonthDay, DateParseError> {
    let text = raw.map(|r| r.trim().to_lowercase()).unwrap_or_default();
    if text.is_empty() || text == "today" {
        return Ok(today.date().into());
    }

    let caps = NUMERIC_DATE
        .captures(&text)
        .ok_or_else(|| DateParseError::Unrecognized(text.clone()))?;
    let month = caps[1].parse().map_err(|_| DateParseError::Unrecognized(text.clone()))?;
    let day = caps[2].parse().map_err(|_| DateParseError::Unrecognized(text.clone()))?;
    MonthDay::new(month, day)
}
