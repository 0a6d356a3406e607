//! Per-pair failure taxonomy applied at the orchestrator boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Classified failure for one target URL, or one (url, instant) pair.
///
/// None of these abort a run: the orchestrator logs the error and moves on
/// to the next instant or URL. "No snapshot available" is deliberately not
/// represented here; it is a valid empty resolution, not a failure.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The URL cannot be parsed as an absolute URL, so neither a slug nor an
    /// archive query can be derived. Fatal to that URL's entire iteration.
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("availability resolution failed for {url} at {instant}: {source:#}")]
    Resolution {
        url: String,
        instant: DateTime<Utc>,
        #[source]
        source: anyhow::Error,
    },

    #[error("raw capture failed for {url} at {instant}: {source:#}")]
    RawCapture {
        url: String,
        instant: DateTime<Utc>,
        #[source]
        source: anyhow::Error,
    },

    #[error("rendered capture failed for {url} at {instant}: {source:#}")]
    RenderedCapture {
        url: String,
        instant: DateTime<Utc>,
        #[source]
        source: anyhow::Error,
    },

    #[error("record store failed for {url} at {instant}: {source:#}")]
    Store {
        url: String,
        instant: DateTime<Utc>,
        #[source]
        source: anyhow::Error,
    },
}
