pub mod resolver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use resolver::{DisabledDistanceResolver, HttpDistanceResolver};

pub const METERS_PER_MILE: f64 = 1_609.344;

const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("distance resolver disabled")]
    Disabled,

    #[error("request failed: {0}")]
    Request(String),

    #[error("no geocoding result for address: {0}")]
    NoResult(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GeoError {
    fn from(err: reqwest::Error) -> Self {
        GeoError::Request(err.to_string())
    }
}

/// External geocoding + driving-distance service, injected into the pricing
/// engine so tests can script it and deployments can point at any
/// Nominatim/OSRM-compatible endpoint.
#[async_trait::async_trait]
pub trait DistanceResolver: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError>;

    async fn driving_distance_meters(&self, from: &GeoPoint, to: &GeoPoint)
        -> Result<f64, GeoError>;
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

#[cfg(test)]
mod tests {
    use super::{haversine_km, GeoPoint};

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 39.7817,
            lng: -89.6501,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint {
            lat: 51.5074,
            lng: -0.1278,
        };
        let paris = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        let distance = haversine_km(&london, &paris);
        assert!((distance - 343.0).abs() < 5.0);
    }
}
