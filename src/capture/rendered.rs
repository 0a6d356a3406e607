//! Rendered-channel capture: browser-driven view, CSS/DOM metrics, and
//! screenshots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::{CssMetrics, Dimensions, RenderedCapture, ScreenshotResult, ViewportSpec};
use crate::browser::{BrowserEngine, PageHandle};
use crate::wayback;

/// Drives a browsing context through the capture steps for one snapshot.
pub struct RenderedCapturer {
    engine: Arc<dyn BrowserEngine>,
    web_url: String,
    scrapes_dir: PathBuf,
    viewports: Vec<ViewportSpec>,
}

impl RenderedCapturer {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        web_url: impl Into<String>,
        scrapes_dir: impl Into<PathBuf>,
        viewports: Vec<ViewportSpec>,
    ) -> Self {
        Self {
            engine,
            web_url: web_url.into(),
            scrapes_dir: scrapes_dir.into(),
            viewports,
        }
    }

    /// Capture the rendered snapshot view: stylesheet and page metrics plus
    /// one screenshot per configured viewport.
    ///
    /// # Errors
    ///
    /// Returns an error if any capture step fails, scoped to this
    /// (url, instant). The browsing context is closed on both paths.
    pub async fn capture(
        &self,
        url: &str,
        instant: DateTime<Utc>,
        slug: &str,
    ) -> Result<RenderedCapture> {
        let snapshot_url = wayback::rendered_snapshot_url(&self.web_url, url, instant);
        let page = self
            .engine
            .new_page()
            .await
            .context("Failed to open browsing context")?;

        let result = self
            .capture_on_page(page.as_ref(), &snapshot_url, instant, slug)
            .await;

        // Close on both paths so a failed capture cannot leak page state
        // into later captures.
        if let Err(e) = page.close().await {
            warn!(url = %snapshot_url, "Failed to close browsing context: {e:#}");
        }

        result
    }

    async fn capture_on_page(
        &self,
        page: &dyn PageHandle,
        snapshot_url: &str,
        instant: DateTime<Utc>,
        slug: &str,
    ) -> Result<RenderedCapture> {
        page.navigate(snapshot_url).await?;
        page.strip_archive_chrome().await?;

        let stylesheets = page.stylesheets().await?;
        let css_metrics = CssMetrics::from_stylesheets(&stylesheets);

        let screens_dir = self.scrapes_dir.join(slug).join("screens");
        tokio::fs::create_dir_all(&screens_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create screenshot directory: {}",
                    screens_dir.display()
                )
            })?;

        let mut screenshots = Vec::with_capacity(self.viewports.len());
        for viewport in &self.viewports {
            screenshots.push(
                self.capture_screenshot(page, &screens_dir, instant, viewport)
                    .await?,
            );
        }

        let title = page.title().await?;
        let page_metrics = page.performance_metrics().await?;
        let browser = self.engine.identity().await?;

        Ok(RenderedCapture {
            url: snapshot_url.to_string(),
            title,
            stylesheets,
            css_metrics,
            page_metrics,
            browser,
            screenshots,
        })
    }

    /// Capture one viewport's screenshot to its deterministic path.
    ///
    /// An existing file is reused as-is: capture is skipped and the file's
    /// dimensions are read from disk. This file-level idempotence is
    /// independent of the record-level overwrite policy, so a reused stale
    /// screenshot can sit under an otherwise-refreshed record.
    async fn capture_screenshot(
        &self,
        page: &dyn PageHandle,
        dir: &Path,
        instant: DateTime<Utc>,
        viewport: &ViewportSpec,
    ) -> Result<ScreenshotResult> {
        let name = format!(
            "{}-{}.png",
            wayback::wayback_timestamp(instant),
            viewport.name
        );
        let file = dir.join(&name);

        page.set_viewport(viewport).await?;

        if file.exists() {
            warn!(path = %file.display(), "Screenshot exists, skipping capture");
        } else {
            let png = page.screenshot(viewport.full_page()).await?;
            tokio::fs::write(&file, &png)
                .await
                .with_context(|| format!("Failed to write screenshot: {}", file.display()))?;
            info!(path = %file.display(), "Screenshot captured");
        }

        let (width, height) = image::image_dimensions(&file)
            .with_context(|| format!("Failed to read image dimensions: {}", file.display()))?;
        let calculated = page.document_dimensions().await?;

        Ok(ScreenshotResult {
            name,
            viewport: viewport.clone(),
            physical: Dimensions { width, height },
            calculated,
        })
    }
}
