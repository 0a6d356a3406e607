//! Raw-channel capture of a snapshot's original bytes.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};

use super::{HttpResponseInfo, RawCapture};
use crate::wayback;

/// Fetches the identity/raw snapshot variant over plain HTTP.
///
/// Persists nothing to disk; the response is carried in memory for the
/// orchestrator to combine and store.
pub struct RawCapturer {
    client: Client,
    web_url: String,
}

impl RawCapturer {
    #[must_use]
    pub fn new(client: Client, web_url: impl Into<String>) -> Self {
        Self {
            client,
            web_url: web_url.into(),
        }
    }

    /// Fetch the raw snapshot and extract lightweight structural metrics.
    ///
    /// # Errors
    ///
    /// Returns an error on any HTTP-layer failure (timeout, non-2xx,
    /// connection failure), scoped to this (url, instant). No retries.
    pub async fn capture(&self, url: &str, instant: DateTime<Utc>) -> Result<RawCapture> {
        let snapshot_url = wayback::raw_snapshot_url(&self.web_url, url, instant);
        debug!(url = %snapshot_url, "Fetching raw snapshot");

        let response = self
            .client
            .get(&snapshot_url)
            .send()
            .await
            .context("Raw snapshot request failed")?
            .error_for_status()
            .context("Raw snapshot returned an error status")?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .text()
            .await
            .context("Failed to read raw snapshot body")?;
        let char_count = body.chars().count();
        let (title, element_count) = parse_markup(&body)?;

        info!(url = %snapshot_url, elements = element_count, "Raw snapshot fetched");

        Ok(RawCapture {
            url: snapshot_url,
            title,
            element_count,
            char_count,
            response: HttpResponseInfo {
                status,
                content_type,
                headers,
                body,
            },
        })
    }
}

/// Extract the `<title>` text and a count of all elements in the document.
fn parse_markup(html: &str) -> Result<(String, usize)> {
    let document = Html::parse_document(html);
    let title_selector =
        Selector::parse("title").map_err(|e| anyhow::anyhow!("title selector: {e}"))?;
    let element_selector =
        Selector::parse("html *").map_err(|e| anyhow::anyhow!("element selector: {e}"))?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default();
    let element_count = document.select(&element_selector).count();

    Ok((title, element_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markup() {
        let html = "<html><head><title> Example Domain </title></head>\
                    <body><div><p>hello</p></div></body></html>";
        let (title, element_count) = parse_markup(html).unwrap();
        assert_eq!(title, "Example Domain");
        // head, title, body, div, p
        assert_eq!(element_count, 5);
    }

    #[test]
    fn test_parse_markup_without_title() {
        let (title, element_count) = parse_markup("<html><body></body></html>").unwrap();
        assert_eq!(title, "");
        assert!(element_count >= 1);
    }
}
