//! Best-effort client network context for record annotation.
//!
//! Looked up once per run. Any failure here degrades to absent fields; it
//! never fails the run.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Network context of the machine performing the archival run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip: Option<String>,
    pub geo: Option<GeoInfo>,
}

/// Geolocation of the client's public IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Response shape of the ip-api.com style geolocation endpoint.
#[derive(Debug, Deserialize)]
struct GeoResponse {
    status: Option<String>,
    country: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl From<GeoResponse> for GeoInfo {
    fn from(response: GeoResponse) -> Self {
        Self {
            country: response.country,
            region: response.region_name,
            city: response.city,
            lat: response.lat,
            lon: response.lon,
        }
    }
}

/// Look up the public IP and its geolocation.
pub async fn lookup(client: &Client, ip_url: &str, geo_url: &str) -> ClientContext {
    let ip = match fetch_ip(client, ip_url).await {
        Ok(ip) => ip,
        Err(e) => {
            warn!("Public IP lookup failed: {e:#}");
            return ClientContext::default();
        }
    };
    debug!(ip = %ip, "Public IP resolved");

    let geo = match fetch_geo(client, geo_url, &ip).await {
        Ok(geo) => Some(geo),
        Err(e) => {
            warn!(ip = %ip, "Geolocation lookup failed: {e:#}");
            None
        }
    };

    ClientContext { ip: Some(ip), geo }
}

async fn fetch_ip(client: &Client, ip_url: &str) -> Result<String> {
    let response = client
        .get(ip_url)
        .send()
        .await
        .context("IP lookup request failed")?
        .error_for_status()
        .context("IP lookup returned an error status")?;

    let ip = response
        .text()
        .await
        .context("Failed to read IP lookup body")?
        .trim()
        .to_string();
    if ip.is_empty() {
        anyhow::bail!("IP lookup returned an empty body");
    }
    Ok(ip)
}

async fn fetch_geo(client: &Client, geo_url: &str, ip: &str) -> Result<GeoInfo> {
    let request_url = format!("{}/{}", geo_url.trim_end_matches('/'), ip);
    let response: GeoResponse = client
        .get(&request_url)
        .send()
        .await
        .context("Geolocation request failed")?
        .error_for_status()
        .context("Geolocation endpoint returned an error status")?
        .json()
        .await
        .context("Failed to parse geolocation response")?;

    if response.status.as_deref() == Some("fail") {
        anyhow::bail!("Geolocation endpoint reported failure for {ip}");
    }
    Ok(response.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_response_mapping() {
        let response: GeoResponse = serde_json::from_value(serde_json::json!({
            "status": "success",
            "country": "United States",
            "regionName": "California",
            "city": "San Francisco",
            "lat": 37.77,
            "lon": -122.42,
        }))
        .unwrap();
        let geo = GeoInfo::from(response);
        assert_eq!(geo.country.as_deref(), Some("United States"));
        assert_eq!(geo.region.as_deref(), Some("California"));
        assert_eq!(geo.lat, Some(37.77));
    }

    #[test]
    fn test_geo_response_tolerates_missing_fields() {
        let response: GeoResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        let geo = GeoInfo::from(response);
        assert!(geo.country.is_none());
        assert!(geo.lat.is_none());
    }
}
