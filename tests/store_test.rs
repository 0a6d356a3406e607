//! Integration tests for the archive record store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use wayback_chronicler::capture::{
    BrowserIdentity, CssMetrics, Dimensions, HttpResponseInfo, RawCapture, RenderedCapture,
    ScreenshotResult, StylesheetInfo, ViewportSpec,
};
use wayback_chronicler::db::{
    count_records, get_record, record_exists, upsert_record, ArchiveRecord, Database,
};
use wayback_chronicler::net_context::ClientContext;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn instant(value: &str) -> DateTime<Utc> {
    value.parse().expect("valid instant")
}

fn sample_record(url: &str, resolved: DateTime<Utc>, title: &str) -> ArchiveRecord {
    let viewport = ViewportSpec {
        name: "desktop".to_string(),
        width: 1200,
        height: 1,
        is_landscape: true,
    };
    let stylesheets = vec![StylesheetInfo {
        href: "inline".to_string(),
        rules: 3,
    }];

    ArchiveRecord {
        url: url.to_string(),
        slug: "com-example_com".to_string(),
        resolved_date: resolved,
        scraped_at: instant("2024-05-01T12:00:00Z"),
        client_context: ClientContext::default(),
        rendered: RenderedCapture {
            url: format!("https://web.archive.org/web/20200103040000/{url}"),
            title: title.to_string(),
            css_metrics: CssMetrics::from_stylesheets(&stylesheets),
            stylesheets,
            page_metrics: BTreeMap::from([("Nodes".to_string(), 42.0)]),
            browser: BrowserIdentity {
                user_agent: "TestBrowser/1.0".to_string(),
                version: "Test/1.0".to_string(),
            },
            screenshots: vec![ScreenshotResult {
                name: "20200103040000-desktop.png".to_string(),
                viewport: viewport.clone(),
                physical: Dimensions {
                    width: 1200,
                    height: 2400,
                },
                calculated: Dimensions {
                    width: 1200,
                    height: 2390,
                },
            }],
        },
        raw: RawCapture {
            url: format!("https://web.archive.org/web/20200103040000id_/{url}"),
            title: title.to_string(),
            element_count: 120,
            char_count: 4096,
            response: HttpResponseInfo {
                status: 200,
                content_type: Some("text/html".to_string()),
                headers: BTreeMap::new(),
                body: "<html></html>".to_string(),
            },
        },
    }
}

#[tokio::test]
async fn test_exists_then_upsert() {
    let (db, _temp_dir) = setup_db().await;
    let resolved = instant("2020-01-03T04:00:00Z");

    assert!(!record_exists(db.pool(), "https://example.com/", resolved)
        .await
        .expect("existence check"));

    let record = sample_record("https://example.com/", resolved, "Example Domain");
    upsert_record(db.pool(), &record).await.expect("upsert");

    assert!(record_exists(db.pool(), "https://example.com/", resolved)
        .await
        .expect("existence check"));
    assert_eq!(count_records(db.pool()).await.expect("count"), 1);
}

#[tokio::test]
async fn test_upsert_same_key_keeps_one_row() {
    let (db, _temp_dir) = setup_db().await;
    let resolved = instant("2020-01-03T04:00:00Z");

    let first = sample_record("https://example.com/", resolved, "First Title");
    upsert_record(db.pool(), &first).await.expect("upsert");

    let mut second = sample_record("https://example.com/", resolved, "Second Title");
    second.scraped_at = instant("2024-06-01T12:00:00Z");
    upsert_record(db.pool(), &second).await.expect("upsert");

    assert_eq!(count_records(db.pool()).await.expect("count"), 1);

    let stored = get_record(db.pool(), "https://example.com/", resolved)
        .await
        .expect("fetch")
        .expect("record present");
    assert_eq!(stored.scraped_at, "2024-06-01T12:00:00Z");
    assert_eq!(stored.resolved_date, "2020-01-03T04:00:00Z");

    let rendered: RenderedCapture = serde_json::from_str(&stored.rendered).expect("payload json");
    assert_eq!(rendered.title, "Second Title");
}

#[tokio::test]
async fn test_distinct_keys_stored_separately() {
    let (db, _temp_dir) = setup_db().await;

    let first = sample_record(
        "https://example.com/",
        instant("2020-01-03T04:00:00Z"),
        "Example Domain",
    );
    let second = sample_record(
        "https://example.com/",
        instant("2021-02-01T00:00:00Z"),
        "Example Domain",
    );
    let third = sample_record(
        "https://example.org/",
        instant("2020-01-03T04:00:00Z"),
        "Other Domain",
    );

    for record in [&first, &second, &third] {
        upsert_record(db.pool(), record).await.expect("upsert");
    }

    assert_eq!(count_records(db.pool()).await.expect("count"), 3);
}

#[tokio::test]
async fn test_payload_round_trip() {
    let (db, _temp_dir) = setup_db().await;
    let resolved = instant("2020-01-03T04:00:00Z");

    let record = sample_record("https://example.com/", resolved, "Example Domain");
    upsert_record(db.pool(), &record).await.expect("upsert");

    let stored = get_record(db.pool(), "https://example.com/", resolved)
        .await
        .expect("fetch")
        .expect("record present");

    let rendered: RenderedCapture = serde_json::from_str(&stored.rendered).expect("rendered json");
    assert_eq!(rendered.screenshots.len(), 1);
    assert_eq!(
        rendered.screenshots[0].physical,
        Dimensions {
            width: 1200,
            height: 2400
        }
    );
    assert_eq!(
        rendered.screenshots[0].calculated,
        Dimensions {
            width: 1200,
            height: 2390
        }
    );

    let raw: RawCapture = serde_json::from_str(&stored.raw).expect("raw json");
    assert_eq!(raw.element_count, 120);
    assert_eq!(raw.response.status, 200);
}
