//! Headless browser engine behind a typed page capability.
//!
//! Capture logic talks to [`PageHandle`] rather than to CDP directly, so it
//! can be exercised with a fake page in tests. The chromiumoxide
//! implementation keeps a single shared browser process; every capture gets
//! its own isolated page.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::performance;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::capture::{BrowserIdentity, Dimensions, StylesheetInfo, ViewportSpec};

/// Removes the archive-injected banner and stylesheet links. Guarded per
/// element: absent chrome (the archive UI changes over time) is not an error.
const STRIP_CHROME_JS: &str = r#"
(() => {
    const banner = document.querySelector('#wm-ipp');
    if (banner && banner.parentNode) {
        banner.parentNode.removeChild(banner);
    }
    for (const name of ['banner-styles.css', 'iconochive.css']) {
        const link = document.querySelector(`link[href*="${name}"]`);
        if (link && link.parentNode) {
            link.parentNode.removeChild(link);
        }
    }
    return true;
})()
"#;

/// Lists active stylesheets. Cross-origin sheets deny `cssRules` access and
/// count as zero rules.
const LIST_STYLESHEETS_JS: &str = r#"
(() => Array.from(document.styleSheets).map((sheet) => {
    let rules = 0;
    try {
        rules = sheet.cssRules ? sheet.cssRules.length : 0;
    } catch (e) {
        rules = 0;
    }
    return { href: sheet.href || 'inline', rules };
}))()
"#;

/// Measures the live document. Height is the maximum across several signals
/// because individual ones under-report on quirks-mode pages.
const MEASURE_DOCUMENT_JS: &str = r#"
(() => {
    const body = document.body;
    const html = document.documentElement;
    const height = Math.max(
        body ? body.scrollHeight : 0,
        body ? body.offsetHeight : 0,
        html.clientHeight,
        html.scrollHeight,
        html.offsetHeight
    );
    const width = html.clientWidth || (body ? body.offsetWidth : 0);
    return { width, height };
})()
"#;

/// Typed operations evaluated against a live page.
#[async_trait]
pub trait PageHandle: Send {
    /// Navigate and wait until the page has quiesced, within the engine's
    /// ceiling.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Remove archive-injected banner and stylesheet chrome, best-effort per
    /// element.
    async fn strip_archive_chrome(&self) -> Result<()>;

    /// List the document's active stylesheets with their rule counts.
    async fn stylesheets(&self) -> Result<Vec<StylesheetInfo>>;

    /// Resize the browsing context to the given viewport.
    async fn set_viewport(&self, viewport: &ViewportSpec) -> Result<()>;

    /// Capture the current page as PNG bytes.
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;

    /// Measure the live document's width and height.
    async fn document_dimensions(&self) -> Result<Dimensions>;

    /// Current document title.
    async fn title(&self) -> Result<String>;

    /// Page performance metrics as a name-to-value map.
    async fn performance_metrics(&self) -> Result<BTreeMap<String, f64>>;

    /// Close the browsing context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A browser engine that can open isolated pages.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Open a fresh browsing context.
    async fn new_page(&self) -> Result<Box<dyn PageHandle>>;

    /// User agent and version of the underlying browser.
    async fn identity(&self) -> Result<BrowserIdentity>;
}

/// Shared headless Chromium instance.
pub struct ChromiumEngine {
    browser: Mutex<Option<Browser>>,
    page_timeout: Duration,
}

impl ChromiumEngine {
    /// Launch the browser process.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser cannot be configured or started.
    pub async fn launch(chrome_path: Option<&str>, page_timeout: Duration) -> Result<Self> {
        info!("Launching headless browser");

        let mut config_builder = BrowserConfig::builder()
            .request_timeout(page_timeout)
            .no_sandbox()
            .disable_default_args()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-extensions")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--mute-audio")
            .arg("--hide-scrollbars");

        if let Some(path) = chrome_path {
            config_builder = config_builder.chrome_executable(path);
        }

        let browser_config = config_builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        // Drain CDP events in the background for the lifetime of the browser
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        info!("Headless browser launched");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page_timeout,
        })
    }

    /// Shutdown the browser gracefully.
    pub async fn shutdown(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                error!("Failed to close browser: {e}");
            } else {
                info!("Browser shutdown complete");
            }
        }
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().context("Browser not running")?;
        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open browsing context")?;
        Ok(Box::new(ChromiumPage {
            page,
            timeout: self.page_timeout,
        }))
    }

    async fn identity(&self) -> Result<BrowserIdentity> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().context("Browser not running")?;
        let version = browser
            .version()
            .await
            .context("Failed to query browser version")?;
        Ok(BrowserIdentity {
            user_agent: version.user_agent,
            version: version.product,
        })
    }
}

struct ChromiumPage {
    page: Page,
    timeout: Duration,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let load = async {
            self.page.goto(url).await.context("Navigation failed")?;
            self.page
                .wait_for_navigation()
                .await
                .context("Page never finished loading")?;
            // Settle delay for late async subresources; the surrounding
            // timeout is the quiescence ceiling.
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<(), anyhow::Error>(())
        };

        tokio::time::timeout(self.timeout, load)
            .await
            .map_err(|_| anyhow::anyhow!("Page did not quiesce within {:?}", self.timeout))??;
        Ok(())
    }

    async fn strip_archive_chrome(&self) -> Result<()> {
        self.page
            .evaluate(STRIP_CHROME_JS)
            .await
            .context("Chrome strip evaluation failed")?;
        Ok(())
    }

    async fn stylesheets(&self) -> Result<Vec<StylesheetInfo>> {
        let result = self
            .page
            .evaluate(LIST_STYLESHEETS_JS)
            .await
            .context("Stylesheet enumeration failed")?;
        result
            .into_value()
            .context("Unexpected stylesheet listing shape")
    }

    async fn set_viewport(&self, viewport: &ViewportSpec) -> Result<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(viewport.height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid viewport parameters: {e}"))?;
        self.page
            .execute(params)
            .await
            .context("Viewport resize failed")?;
        Ok(())
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(full_page).build();
        self.page
            .screenshot(params)
            .await
            .context("Screenshot capture failed")
    }

    async fn document_dimensions(&self) -> Result<Dimensions> {
        let result = self
            .page
            .evaluate(MEASURE_DOCUMENT_JS)
            .await
            .context("Document measurement failed")?;
        result
            .into_value()
            .context("Unexpected document measurement shape")
    }

    async fn title(&self) -> Result<String> {
        Ok(self
            .page
            .get_title()
            .await
            .context("Failed to read page title")?
            .unwrap_or_default())
    }

    async fn performance_metrics(&self) -> Result<BTreeMap<String, f64>> {
        self.page
            .execute(performance::EnableParams::default())
            .await
            .context("Failed to enable performance domain")?;
        let response = self
            .page
            .execute(performance::GetMetricsParams::default())
            .await
            .context("Failed to read performance metrics")?;
        Ok(response
            .result
            .metrics
            .iter()
            .map(|metric| (metric.name.clone(), metric.value))
            .collect())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let Self { page, .. } = *self;
        page.close().await.context("Failed to close browsing context")?;
        Ok(())
    }
}
