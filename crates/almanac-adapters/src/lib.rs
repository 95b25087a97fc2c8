//! Almanac Adapters: the external capabilities steps call into
//!
//! * [`FactSource`]: dated facts for a month/day pair
//! * [`TextGenerator`]: prompt in, generated text out
//!
//! Each capability has an HTTP implementation and in-memory ones used for
//! offline configurations and tests. None of them retry.

pub mod error;
pub mod facts;
pub mod generation;

pub use error::{FactError, GenerationError};
pub use facts::{DatedFact, FactSource, StaticFactSource, UnavailableFactSource, WikipediaFactSource};
pub use generation::{CannedGenerator, GeminiGenerator, TextGenerator, UnavailableGenerator};

/// User agent sent to upstream services
pub const USER_AGENT: &str = concat!("almanac/", env!("CARGO_PKG_VERSION"));
