//! Wayback Machine availability resolution and snapshot URL construction.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Timestamp format used by the availability API and snapshot URLs.
pub const WAYBACK_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Format an instant as a 14-digit Wayback timestamp (second precision, UTC).
#[must_use]
pub fn wayback_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(WAYBACK_TIMESTAMP_FORMAT).to_string()
}

/// Parse a 14-digit Wayback timestamp.
///
/// # Errors
///
/// Returns an error if the value is not a valid timestamp.
pub fn parse_wayback_timestamp(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, WAYBACK_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .with_context(|| format!("Invalid snapshot timestamp {value:?}"))
}

/// URL of the rendered snapshot view (with archive-injected chrome).
#[must_use]
pub fn rendered_snapshot_url(web_base: &str, url: &str, instant: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}",
        web_base.trim_end_matches('/'),
        wayback_timestamp(instant),
        url
    )
}

/// URL of the identity/raw snapshot variant (original bytes, `id_` flag).
#[must_use]
pub fn raw_snapshot_url(web_base: &str, url: &str, instant: DateTime<Utc>) -> String {
    format!(
        "{}/{}id_/{}",
        web_base.trim_end_matches('/'),
        wayback_timestamp(instant),
        url
    )
}

#[derive(Debug, Default, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ClosestSnapshot {
    timestamp: String,
    available: Option<bool>,
}

/// Client for the Wayback Machine availability index.
pub struct WaybackClient {
    client: Client,
    availability_url: String,
}

impl WaybackClient {
    /// Create a client against the given availability endpoint.
    #[must_use]
    pub fn new(client: Client, availability_url: impl Into<String>) -> Self {
        Self {
            client,
            availability_url: availability_url.into(),
        }
    }

    /// Resolve the archived snapshot nearest to the requested instant.
    ///
    /// Returns `Ok(None)` when the archive holds no snapshot near the
    /// instant; callers treat that as a valid skip. No caching: the archive's
    /// holdings can change between runs, so every call re-queries.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a malformed response.
    pub async fn resolve(
        &self,
        url: &str,
        instant: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let request_url = format!(
            "{}?url={}&timestamp={}",
            self.availability_url,
            urlencoding::encode(url),
            wayback_timestamp(instant)
        );

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .context("Availability request failed")?
            .error_for_status()
            .context("Availability endpoint returned an error status")?;

        let body: AvailabilityResponse = response
            .json()
            .await
            .context("Failed to parse availability response")?;

        let Some(closest) = body.archived_snapshots.closest else {
            debug!(url = %url, instant = %instant, "No snapshot near requested instant");
            return Ok(None);
        };
        if closest.available == Some(false) {
            debug!(url = %url, instant = %instant, "Closest snapshot marked unavailable");
            return Ok(None);
        }

        let actual = parse_wayback_timestamp(&closest.timestamp)?;
        debug!(url = %url, requested = %instant, resolved = %actual, "Snapshot resolved");
        Ok(Some(actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(value: &str) -> DateTime<Utc> {
        parse_wayback_timestamp(value).unwrap()
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = instant("20200103040000");
        assert_eq!(wayback_timestamp(ts), "20200103040000");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_wayback_timestamp("not-a-timestamp").is_err());
        assert!(parse_wayback_timestamp("20201399000000").is_err());
    }

    #[test]
    fn test_snapshot_url_shapes() {
        let ts = instant("20200103040000");
        assert_eq!(
            rendered_snapshot_url("https://web.archive.org/web", "https://example.com/", ts),
            "https://web.archive.org/web/20200103040000/https://example.com/"
        );
        assert_eq!(
            raw_snapshot_url("https://web.archive.org/web/", "https://example.com/", ts),
            "https://web.archive.org/web/20200103040000id_/https://example.com/"
        );
    }

    #[test]
    fn test_availability_parse_closest_present() {
        let body: AvailabilityResponse = serde_json::from_value(serde_json::json!({
            "url": "https://example.com/",
            "archived_snapshots": {
                "closest": {
                    "status": "200",
                    "available": true,
                    "url": "http://web.archive.org/web/20200103040000/https://example.com/",
                    "timestamp": "20200103040000"
                }
            }
        }))
        .unwrap();
        let closest = body.archived_snapshots.closest.unwrap();
        assert_eq!(closest.timestamp, "20200103040000");
        assert_eq!(closest.available, Some(true));
    }

    #[test]
    fn test_availability_parse_no_snapshot() {
        let body: AvailabilityResponse = serde_json::from_value(serde_json::json!({
            "url": "https://example.com/",
            "archived_snapshots": {}
        }))
        .unwrap();
        assert!(body.archived_snapshots.closest.is_none());
    }
}
