//! Integration tests for availability resolution against a mock endpoint.

use chrono::{DateTime, Utc};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wayback_chronicler::wayback::WaybackClient;

fn instant(value: &str) -> DateTime<Utc> {
    value.parse().expect("valid instant")
}

async fn client_for(server: &MockServer) -> WaybackClient {
    WaybackClient::new(
        reqwest::Client::new(),
        format!("{}/wayback/available", server.uri()),
    )
}

#[tokio::test]
async fn test_resolves_closest_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .and(query_param("url", "https://example.com/"))
        .and(query_param("timestamp", "20200101000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://example.com/",
            "archived_snapshots": {
                "closest": {
                    "status": "200",
                    "available": true,
                    "timestamp": "20200103040000",
                    "url": "http://web.archive.org/web/20200103040000/https://example.com/",
                }
            }
        })))
        .mount(&server)
        .await;

    let resolved = client_for(&server)
        .await
        .resolve("https://example.com/", instant("2020-01-01T00:00:00Z"))
        .await
        .expect("resolution succeeds");

    assert_eq!(resolved, Some(instant("2020-01-03T04:00:00Z")));
}

#[tokio::test]
async fn test_no_snapshot_resolves_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://example.com/",
            "archived_snapshots": {}
        })))
        .mount(&server)
        .await;

    let resolved = client_for(&server)
        .await
        .resolve("https://example.com/", instant("2020-01-01T00:00:00Z"))
        .await
        .expect("resolution succeeds");

    assert_eq!(resolved, None);
}

#[tokio::test]
async fn test_unavailable_snapshot_resolves_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived_snapshots": {
                "closest": {
                    "status": "404",
                    "available": false,
                    "timestamp": "20200103040000",
                }
            }
        })))
        .mount(&server)
        .await;

    let resolved = client_for(&server)
        .await
        .resolve("https://example.com/", instant("2020-01-01T00:00:00Z"))
        .await
        .expect("resolution succeeds");

    assert_eq!(resolved, None);
}

#[tokio::test]
async fn test_server_error_is_a_resolution_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .await
        .resolve("https://example.com/", instant("2020-01-01T00:00:00Z"))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_malformed_timestamp_is_a_resolution_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived_snapshots": {
                "closest": {
                    "available": true,
                    "timestamp": "not-a-timestamp",
                }
            }
        })))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .await
        .resolve("https://example.com/", instant("2020-01-01T00:00:00Z"))
        .await;

    assert!(result.is_err());
}
