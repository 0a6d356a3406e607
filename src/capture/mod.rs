//! Capture data model shared by the rendered and raw channels.

mod raw;
mod rendered;

pub use raw::RawCapturer;
pub use rendered::RenderedCapturer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named browser viewport used for screenshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSpec {
    pub name: String,
    pub width: u32,
    /// A height of 1 requests the full scrollable page height.
    pub height: u32,
    pub is_landscape: bool,
}

impl ViewportSpec {
    /// Whether screenshots at this viewport capture the full page height.
    #[must_use]
    pub fn full_page(&self) -> bool {
        self.height <= 1
    }
}

/// The fixed default viewport set.
#[must_use]
pub fn default_viewports() -> Vec<ViewportSpec> {
    vec![
        ViewportSpec {
            name: "mobile".to_string(),
            width: 600,
            height: 1,
            is_landscape: false,
        },
        ViewportSpec {
            name: "desktop".to_string(),
            width: 1200,
            height: 1,
            is_landscape: true,
        },
    ]
}

/// Pixel dimensions of an image or document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// One active stylesheet in the rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylesheetInfo {
    /// Reachable URL, or `"inline"` for sheets without one.
    pub href: String,
    pub rules: u32,
}

/// Rollup metrics over a document's stylesheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssMetrics {
    pub sheets_with_zero_rules: u32,
    pub total_rules: u32,
}

impl CssMetrics {
    #[must_use]
    pub fn from_stylesheets(stylesheets: &[StylesheetInfo]) -> Self {
        Self {
            sheets_with_zero_rules: stylesheets.iter().filter(|s| s.rules == 0).count() as u32,
            total_rules: stylesheets.iter().map(|s| s.rules).sum(),
        }
    }
}

/// Identity of the browser that produced a rendered capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserIdentity {
    pub user_agent: String,
    pub version: String,
}

/// One screenshot, with both dimension readings retained.
///
/// The physical reading comes from the saved image file, the calculated one
/// from the live document at capture time; they can diverge and the
/// divergence is observable, not corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotResult {
    pub name: String,
    pub viewport: ViewportSpec,
    pub physical: Dimensions,
    pub calculated: Dimensions,
}

/// Browser-rendered view of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedCapture {
    pub url: String,
    pub title: String,
    pub stylesheets: Vec<StylesheetInfo>,
    pub css_metrics: CssMetrics,
    pub page_metrics: BTreeMap<String, f64>,
    pub browser: BrowserIdentity,
    pub screenshots: Vec<ScreenshotResult>,
}

/// HTTP response carried with a raw capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponseInfo {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Raw (identity) fetch of a snapshot's original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCapture {
    pub url: String,
    pub title: String,
    pub element_count: usize,
    pub char_count: usize,
    pub response: HttpResponseInfo,
}
