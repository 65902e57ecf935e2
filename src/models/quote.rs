use serde::{Deserialize, Serialize};

use crate::models::order::{SizeClass, Urgency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Matrix,
    Fallback,
}

impl DistanceSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceSource::Matrix => "matrix",
            DistanceSource::Fallback => "fallback",
        }
    }
}

/// Transient pricing breakdown. Never persisted; an order is created with the
/// quote's total baked in and the quote itself is discarded.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub pickup_address: String,
    pub delivery_address: String,
    pub urgency: Urgency,
    pub size: SizeClass,
    pub distance_miles: f64,
    pub distance_source: DistanceSource,
    pub base_fee: f64,
    #[serde(serialize_with = "crate::models::ser_round2")]
    pub distance_fee: f64,
    pub urgency_multiplier: f64,
    pub size_multiplier: f64,
    #[serde(serialize_with = "crate::models::ser_round2")]
    pub total: f64,
}
