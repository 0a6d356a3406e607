//! Archival run orchestration: URL × instant iteration and per-pair policy.
//!
//! Each (url, instant) pair moves through resolve → capture → store. The
//! failure domain is the pair: any step's error is classified, logged with
//! enough context to re-run just that pair, and the run continues with the
//! next instant or URL.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::capture::{RawCapturer, RenderedCapturer};
use crate::config::Config;
use crate::db::{self, ArchiveRecord, Database};
use crate::error::ArchiveError;
use crate::input::PageEntry;
use crate::net_context::ClientContext;
use crate::slug::derive_slug;
use crate::wayback::WaybackClient;

/// Terminal state of one successfully visited (url, instant) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// Both captures ran and the record was upserted.
    Stored,
    /// The archive holds no snapshot near the requested instant.
    SkippedNoSnapshot,
    /// A record already exists and overwrite is disabled; no capture work ran.
    SkippedExists,
}

/// Aggregate counts for a completed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stored: usize,
    pub skipped_existing: usize,
    pub skipped_no_snapshot: usize,
    pub failed: usize,
}

/// Sequential archival pipeline over a list of target URLs.
pub struct Archiver {
    config: Config,
    db: Database,
    wayback: WaybackClient,
    rendered: RenderedCapturer,
    raw: RawCapturer,
    client_context: ClientContext,
}

impl Archiver {
    pub fn new(
        config: Config,
        db: Database,
        wayback: WaybackClient,
        rendered: RenderedCapturer,
        raw: RawCapturer,
        client_context: ClientContext,
    ) -> Self {
        Self {
            config,
            db,
            wayback,
            rendered,
            raw,
            client_context,
        }
    }

    /// Visit every (url, instant) pair in the configured range.
    ///
    /// Individual pair failures are logged and counted; the run itself
    /// always completes.
    pub async fn run(&self, pages: &[PageEntry]) -> RunSummary {
        let mut summary = RunSummary::default();

        for page in pages {
            self.process_url(&page.url, &mut summary).await;
        }

        info!(
            stored = summary.stored,
            skipped_existing = summary.skipped_existing,
            skipped_no_snapshot = summary.skipped_no_snapshot,
            failed = summary.failed,
            "Run complete"
        );
        summary
    }

    async fn process_url(&self, url: &str, summary: &mut RunSummary) {
        // A URL that cannot be parsed yields no slug and no archive queries,
        // so its whole iteration is abandoned.
        let slug = match derive_slug(url) {
            Ok(slug) => slug,
            Err(source) => {
                let err = ArchiveError::InvalidUrl {
                    url: url.to_string(),
                    source,
                };
                error!("{err}");
                summary.failed += 1;
                return;
            }
        };

        info!(url = %url, slug = %slug, "Processing target");

        let mut instant = self.config.start_date;
        while instant < self.config.end_date {
            match self.process_pair(url, &slug, instant).await {
                Ok(PairOutcome::Stored) => summary.stored += 1,
                Ok(PairOutcome::SkippedExists) => summary.skipped_existing += 1,
                Ok(PairOutcome::SkippedNoSnapshot) => summary.skipped_no_snapshot += 1,
                Err(err) => {
                    error!("{err}");
                    summary.failed += 1;
                }
            }

            let Some(next) = self.config.increment.advance(instant) else {
                warn!(url = %url, instant = %instant, "Step overflowed the calendar, stopping");
                break;
            };
            instant = next;
        }
    }

    async fn process_pair(
        &self,
        url: &str,
        slug: &str,
        instant: DateTime<Utc>,
    ) -> Result<PairOutcome, ArchiveError> {
        let resolved = self
            .wayback
            .resolve(url, instant)
            .await
            .map_err(|source| ArchiveError::Resolution {
                url: url.to_string(),
                instant,
                source,
            })?;

        let Some(actual) = resolved else {
            info!(url = %url, instant = %instant, "No snapshot available, skipping");
            return Ok(PairOutcome::SkippedNoSnapshot);
        };

        // Captures are expensive; with overwrite disabled an existing record
        // short-circuits before any browser or HTTP work.
        if !self.config.overwrite {
            let exists = db::record_exists(self.db.pool(), url, actual)
                .await
                .map_err(|source| ArchiveError::Store {
                    url: url.to_string(),
                    instant,
                    source,
                })?;
            if exists {
                info!(url = %url, resolved = %actual, "Record exists, skipping");
                return Ok(PairOutcome::SkippedExists);
            }
        }

        // The channels are independent: both run even if one fails, and each
        // failure gets its own log line. Persistence requires both.
        let rendered = self.rendered.capture(url, actual, slug).await;
        let raw = self.raw.capture(url, actual).await;

        let rendered = match rendered {
            Ok(capture) => capture,
            Err(source) => {
                if let Err(raw_source) = raw {
                    error!(
                        "{}",
                        ArchiveError::RawCapture {
                            url: url.to_string(),
                            instant,
                            source: raw_source,
                        }
                    );
                }
                return Err(ArchiveError::RenderedCapture {
                    url: url.to_string(),
                    instant,
                    source,
                });
            }
        };
        let raw = raw.map_err(|source| ArchiveError::RawCapture {
            url: url.to_string(),
            instant,
            source,
        })?;

        let record = ArchiveRecord {
            url: url.to_string(),
            slug: slug.to_string(),
            resolved_date: actual,
            scraped_at: Utc::now(),
            client_context: self.client_context.clone(),
            rendered,
            raw,
        };

        db::upsert_record(self.db.pool(), &record)
            .await
            .map_err(|source| ArchiveError::Store {
                url: url.to_string(),
                instant,
                source,
            })?;

        info!(url = %url, resolved = %actual, "Record stored");
        Ok(PairOutcome::Stored)
    }
}
