//! Wayback Chronicler library.
//!
//! Archives historical Wayback Machine renderings of web pages: for each
//! target URL and requested instant, resolves the nearest actually-archived
//! snapshot, captures a browser-rendered view (screenshots, DOM/CSS metrics)
//! alongside the raw archived HTML, and persists the combined record
//! idempotently so repeated runs do not duplicate work.

pub mod archiver;
pub mod browser;
pub mod capture;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod input;
pub mod net_context;
pub mod slug;
pub mod wayback;
