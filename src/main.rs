use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wayback_chronicler::archiver::Archiver;
use wayback_chronicler::browser::{BrowserEngine, ChromiumEngine};
use wayback_chronicler::capture::{RawCapturer, RenderedCapturer};
use wayback_chronicler::config::Config;
use wayback_chronicler::constants::ARCHIVAL_USER_AGENT;
use wayback_chronicler::db::Database;
use wayback_chronicler::input::{self, PageEntry};
use wayback_chronicler::net_context;
use wayback_chronicler::wayback::WaybackClient;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting wayback-chronicler");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let pages = if let Some(url) = config.single_url.clone() {
        vec![PageEntry { url }]
    } else {
        input::read_pages(&config.pages_csv).context("Failed to read URL list")?
    };
    if pages.is_empty() {
        info!(path = %config.pages_csv.display(), "No target URLs, nothing to do");
        return Ok(());
    }

    info!(
        targets = pages.len(),
        start = %config.start_date,
        end = %config.end_date,
        overwrite = config.overwrite,
        "Configuration loaded"
    );

    // Ensure data directories exist
    tokio::fs::create_dir_all(&config.scrapes_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create scrapes directory: {}",
                config.scrapes_dir.display()
            )
        })?;
    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database initialized");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(ARCHIVAL_USER_AGENT)
        .build()
        .context("Failed to create HTTP client")?;

    // One shared browser process for the whole run; each capture opens its
    // own isolated page.
    let engine = Arc::new(
        ChromiumEngine::launch(config.chrome_path.as_deref(), config.page_timeout)
            .await
            .context("Failed to launch browser engine")?,
    );

    // Annotate all of this run's records with where they were scraped from
    let client_context =
        net_context::lookup(&http, &config.ip_lookup_url, &config.geo_lookup_url).await;

    let wayback = WaybackClient::new(http.clone(), config.availability_url.clone());
    let rendered = RenderedCapturer::new(
        Arc::clone(&engine) as Arc<dyn BrowserEngine>,
        config.web_url.clone(),
        config.scrapes_dir.clone(),
        config.viewports.clone(),
    );
    let raw = RawCapturer::new(http, config.web_url.clone());

    let archiver = Archiver::new(config, db, wayback, rendered, raw, client_context);
    archiver.run(&pages).await;

    engine.shutdown().await;

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wayback_chronicler=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
