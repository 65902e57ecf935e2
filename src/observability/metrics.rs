use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub claims_total: IntCounterVec,
    pub orders_total: IntCounterVec,
    pub quotes_total: IntCounterVec,
    pub pending_orders: IntGauge,
    pub reminders_sent_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let orders_total = IntCounterVec::new(
            Opts::new("orders_total", "Order transitions by resulting status"),
            &["status"],
        )
        .expect("valid orders_total metric");

        let quotes_total = IntCounterVec::new(
            Opts::new("quotes_total", "Quotes computed by distance source"),
            &["source"],
        )
        .expect("valid quotes_total metric");

        let pending_orders = IntGauge::new("pending_orders", "Orders currently awaiting a driver")
            .expect("valid pending_orders metric");

        let reminders_sent_total = IntCounterVec::new(
            Opts::new("reminders_sent_total", "Expiration reminders by threshold"),
            &["threshold"],
        )
        .expect("valid reminders_sent_total metric");

        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(orders_total.clone()))
            .expect("register orders_total");
        registry
            .register(Box::new(quotes_total.clone()))
            .expect("register quotes_total");
        registry
            .register(Box::new(pending_orders.clone()))
            .expect("register pending_orders");
        registry
            .register(Box::new(reminders_sent_total.clone()))
            .expect("register reminders_sent_total");

        Self {
            registry,
            claims_total,
            orders_total,
            quotes_total,
            pending_orders,
            reminders_sent_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
