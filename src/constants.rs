//! Shared constants used across the application.

/// User agent string used for archival HTTP requests.
///
/// A realistic browser user agent; the archive serves identical content
/// either way, but some origin pages embedded in snapshots behave better
/// when the request looks like normal browser traffic.
pub const ARCHIVAL_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
