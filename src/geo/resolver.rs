use std::time::Duration;

use serde_json::Value;

use crate::geo::{DistanceResolver, GeoError, GeoPoint};

/// Talks to a Nominatim-compatible geocoder and an OSRM-compatible routing
/// service over plain JSON, no SDK dependency.
pub struct HttpDistanceResolver {
    client: reqwest::Client,
    geocoder_base_url: String,
    routing_base_url: String,
}

impl HttpDistanceResolver {
    pub fn new(
        geocoder_base_url: String,
        routing_base_url: String,
        timeout: Duration,
    ) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            geocoder_base_url: geocoder_base_url.trim_end_matches('/').to_string(),
            routing_base_url: routing_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl DistanceResolver for HttpDistanceResolver {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError> {
        let url = format!("{}/search", self.geocoder_base_url);
        let body: Value = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("limit", "1"), ("q", address)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let first = body
            .as_array()
            .and_then(|results| results.first())
            .ok_or_else(|| GeoError::NoResult(address.to_string()))?;

        let lat = parse_coordinate(first, "lat")?;
        let lng = parse_coordinate(first, "lon")?;

        Ok(GeoPoint { lat, lng })
    }

    async fn driving_distance_meters(
        &self,
        from: &GeoPoint,
        to: &GeoPoint,
    ) -> Result<f64, GeoError> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.routing_base_url, from.lng, from.lat, to.lng, to.lat
        );
        let body: Value = self
            .client
            .get(&url)
            .query(&[("overview", "false")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        body["routes"][0]["distance"]
            .as_f64()
            .ok_or_else(|| GeoError::Malformed("route response missing distance".to_string()))
    }
}

// Nominatim returns coordinates as strings.
fn parse_coordinate(result: &Value, key: &str) -> Result<f64, GeoError> {
    result[key]
        .as_str()
        .and_then(|raw| raw.parse::<f64>().ok())
        .or_else(|| result[key].as_f64())
        .ok_or_else(|| GeoError::Malformed(format!("geocoding result missing {key}")))
}

/// Stand-in used when no geocoder is configured; every lookup fails, which
/// sends the pricing engine down its textual fallback path.
pub struct DisabledDistanceResolver;

#[async_trait::async_trait]
impl DistanceResolver for DisabledDistanceResolver {
    async fn geocode(&self, _address: &str) -> Result<GeoPoint, GeoError> {
        Err(GeoError::Disabled)
    }

    async fn driving_distance_meters(
        &self,
        _from: &GeoPoint,
        _to: &GeoPoint,
    ) -> Result<f64, GeoError> {
        Err(GeoError::Disabled)
    }
}
