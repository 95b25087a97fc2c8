//! Adapter errors. Failures are reported uniformly; callers do not get a
//! transient/permanent distinction.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactError {
    #[error("FACTS/DATE: {month}/{day} is not a calendar date")]
    InvalidDate { month: u32, day: u32 },

    #[error("FACTS/UNAVAILABLE: {0}")]
    Unavailable(String),

    #[error("FACTS/HTTP: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("GEN/UNAVAILABLE: {0}")]
    Unavailable(String),

    #[error("GEN/API: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("GEN/EMPTY: model returned no text")]
    Empty,

    #[error("GEN/HTTP: {0}")]
    Http(#[from] reqwest::Error),
}
