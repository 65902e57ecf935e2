pub mod fallback;

use std::sync::Arc;

use tracing::debug;

use crate::geo::{haversine_km, DistanceResolver, GeoError, METERS_PER_MILE};
use crate::models::order::{SizeClass, Urgency};
use crate::models::quote::{DistanceSource, Quote};
use crate::observability::metrics::Metrics;
use crate::pricing::fallback::fallback_distance_miles;

pub const BASE_FEE: f64 = 5.00;
pub const PER_MILE_FEE: f64 = 0.75;

// Two geocoded points closer than this are treated as the same place;
// noisy geocoding otherwise yields absurd near-zero quotes.
const NEAR_ZERO_KM: f64 = 0.01;
const NEAR_ZERO_MILES: f64 = 0.1;

pub fn urgency_multiplier(urgency: Urgency) -> f64 {
    match urgency {
        Urgency::Urgent => 1.3,
        Urgency::Standard => 1.0,
        Urgency::Scheduled => 0.9,
    }
}

pub fn size_multiplier(size: SizeClass) -> f64 {
    match size {
        SizeClass::Small => 1.0,
        SizeClass::Medium => 1.1,
        SizeClass::Large => 1.25,
        SizeClass::ExtraLarge => 1.5,
    }
}

pub struct PricingEngine {
    resolver: Arc<dyn DistanceResolver>,
    metrics: Metrics,
}

impl PricingEngine {
    pub fn new(resolver: Arc<dyn DistanceResolver>, metrics: Metrics) -> Self {
        Self { resolver, metrics }
    }

    /// Price a prospective delivery. Never fails: any resolver trouble
    /// silently degrades to the textual fallback estimate.
    pub async fn quote(
        &self,
        pickup_address: &str,
        delivery_address: &str,
        urgency: Urgency,
        size: SizeClass,
    ) -> Quote {
        let (distance_miles, distance_source) =
            match self.resolve_distance(pickup_address, delivery_address).await {
                Ok(miles) => (miles, DistanceSource::Matrix),
                Err(err) => {
                    debug!(error = %err, "distance resolver unavailable, using fallback estimate");
                    (
                        fallback_distance_miles(pickup_address, delivery_address),
                        DistanceSource::Fallback,
                    )
                }
            };

        self.metrics
            .quotes_total
            .with_label_values(&[distance_source.as_str()])
            .inc();

        let distance_fee = distance_miles * PER_MILE_FEE;
        let urgency_mult = urgency_multiplier(urgency);
        let size_mult = size_multiplier(size);
        let total = (BASE_FEE + distance_fee) * urgency_mult * size_mult;

        Quote {
            pickup_address: pickup_address.to_string(),
            delivery_address: delivery_address.to_string(),
            urgency,
            size,
            distance_miles,
            distance_source,
            base_fee: BASE_FEE,
            distance_fee,
            urgency_multiplier: urgency_mult,
            size_multiplier: size_mult,
            total,
        }
    }

    async fn resolve_distance(&self, pickup: &str, delivery: &str) -> Result<f64, GeoError> {
        let from = self.resolver.geocode(pickup).await?;
        let to = self.resolver.geocode(delivery).await?;

        if haversine_km(&from, &to) < NEAR_ZERO_KM {
            return Ok(NEAR_ZERO_MILES);
        }

        let meters = self.resolver.driving_distance_meters(&from, &to).await?;
        Ok(meters / METERS_PER_MILE)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::geo::{DisabledDistanceResolver, DistanceResolver, GeoError, GeoPoint, METERS_PER_MILE};
    use crate::models::order::{SizeClass, Urgency};
    use crate::models::quote::DistanceSource;
    use crate::models::round2;
    use crate::observability::metrics::Metrics;

    use super::{size_multiplier, urgency_multiplier, PricingEngine, BASE_FEE, PER_MILE_FEE};

    struct ScriptedResolver {
        meters: f64,
    }

    #[async_trait::async_trait]
    impl DistanceResolver for ScriptedResolver {
        async fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError> {
            if address.contains("Springfield") {
                Ok(GeoPoint {
                    lat: 39.7817,
                    lng: -89.6501,
                })
            } else {
                Ok(GeoPoint {
                    lat: 39.4061,
                    lng: -88.8103,
                })
            }
        }

        async fn driving_distance_meters(
            &self,
            _from: &GeoPoint,
            _to: &GeoPoint,
        ) -> Result<f64, GeoError> {
            Ok(self.meters)
        }
    }

    struct SamePointResolver;

    #[async_trait::async_trait]
    impl DistanceResolver for SamePointResolver {
        async fn geocode(&self, _address: &str) -> Result<GeoPoint, GeoError> {
            Ok(GeoPoint {
                lat: 39.7817,
                lng: -89.6501,
            })
        }

        async fn driving_distance_meters(
            &self,
            _from: &GeoPoint,
            _to: &GeoPoint,
        ) -> Result<f64, GeoError> {
            panic!("driving distance must not be requested for co-located points");
        }
    }

    fn engine(resolver: Arc<dyn DistanceResolver>) -> PricingEngine {
        PricingEngine::new(resolver, Metrics::new())
    }

    #[tokio::test]
    async fn urgent_large_ten_mile_order_totals_20_31() {
        let pricing = engine(Arc::new(ScriptedResolver {
            meters: 10.0 * METERS_PER_MILE,
        }));

        let quote = pricing
            .quote(
                "742 Evergreen Terrace, Springfield",
                "1 Industrial Way, Shelbyville",
                Urgency::Urgent,
                SizeClass::Large,
            )
            .await;

        assert_eq!(quote.distance_source, DistanceSource::Matrix);
        assert!((quote.distance_miles - 10.0).abs() < 1e-9);
        assert!((quote.total - 20.3125).abs() < 1e-9);
        assert_eq!(round2(quote.total), 20.31);
    }

    #[tokio::test]
    async fn total_is_exact_product_of_fee_and_multipliers() {
        let urgencies = [Urgency::Standard, Urgency::Urgent, Urgency::Scheduled];
        let sizes = [
            SizeClass::Small,
            SizeClass::Medium,
            SizeClass::Large,
            SizeClass::ExtraLarge,
        ];

        for urgency in urgencies {
            for size in sizes {
                let pricing = engine(Arc::new(ScriptedResolver {
                    meters: 4.0 * METERS_PER_MILE,
                }));
                let quote = pricing
                    .quote(
                        "10 Main St, Springfield",
                        "20 Oak St, Shelbyville",
                        urgency,
                        size,
                    )
                    .await;

                let expected = (BASE_FEE + quote.distance_miles * PER_MILE_FEE)
                    * urgency_multiplier(urgency)
                    * size_multiplier(size);
                assert_eq!(quote.total, expected);
            }
        }
    }

    #[tokio::test]
    async fn co_located_addresses_price_as_a_tenth_of_a_mile() {
        let pricing = engine(Arc::new(SamePointResolver));

        let quote = pricing
            .quote(
                "500 Center St, Springfield",
                "500 Center St Apt 2, Springfield",
                Urgency::Standard,
                SizeClass::Small,
            )
            .await;

        assert_eq!(quote.distance_miles, 0.1);
        assert_eq!(quote.distance_source, DistanceSource::Matrix);
    }

    #[tokio::test]
    async fn resolver_failure_degrades_to_fallback() {
        let pricing = engine(Arc::new(DisabledDistanceResolver));

        let quote = pricing
            .quote(
                "123 Main St, Springfield",
                "125 Main St, Springfield",
                Urgency::Standard,
                SizeClass::Small,
            )
            .await;

        assert_eq!(quote.distance_source, DistanceSource::Fallback);
        assert_eq!(quote.distance_miles, 0.1);
        assert_eq!(quote.total, (BASE_FEE + 0.1 * PER_MILE_FEE) * 1.0 * 1.0);
    }

    #[tokio::test]
    async fn fallback_quotes_are_repeatable() {
        let pricing = engine(Arc::new(DisabledDistanceResolver));

        let first = pricing
            .quote(
                "44 Birch Rd, Capital City",
                "7 Pine Ln, Ogdenville",
                Urgency::Scheduled,
                SizeClass::Medium,
            )
            .await;
        let second = pricing
            .quote(
                "44 Birch Rd, Capital City",
                "7 Pine Ln, Ogdenville",
                Urgency::Scheduled,
                SizeClass::Medium,
            )
            .await;

        assert_eq!(first.distance_miles, second.distance_miles);
        assert_eq!(first.total, second.total);
    }
}
