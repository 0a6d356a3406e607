use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::{RawCapture, RenderedCapture};
use crate::net_context::ClientContext;

/// The unit of persistence: one archived (url, resolved instant) visit.
///
/// At most one record is stored per (url, resolved_date) pair; later runs
/// with overwrite enabled replace the payload under the same key. Records
/// are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub url: String,
    pub slug: String,
    pub resolved_date: DateTime<Utc>,
    pub scraped_at: DateTime<Utc>,
    pub client_context: ClientContext,
    pub rendered: RenderedCapture,
    pub raw: RawCapture,
}

/// Canonical storage key format for an instant (UTC, second precision).
///
/// Both sides of every key comparison go through this, so key equality is
/// never sensitive to sub-second or offset formatting.
#[must_use]
pub fn record_date_key(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Row shape of the `archive_records` table. Payload columns hold JSON.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredRecord {
    pub id: i64,
    pub url: String,
    pub resolved_date: String,
    pub slug: String,
    pub scraped_at: String,
    pub client_context: String,
    pub rendered: String,
    pub raw: String,
    pub created_at: String,
}
