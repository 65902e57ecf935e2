use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dispatch::{DispatchEngine, InMemoryOrderStore, OrderStore};
use crate::geo::DistanceResolver;
use crate::models::driver::{Driver, DriverDocument};
use crate::models::order::OrderEvent;
use crate::observability::metrics::Metrics;
use crate::pricing::PricingEngine;
use crate::reminders::ReminderScheduler;

pub struct AppState {
    pub drivers: Arc<DashMap<Uuid, Driver>>,
    pub documents: Arc<DashMap<Uuid, DriverDocument>>,
    pub dispatch: DispatchEngine,
    pub pricing: PricingEngine,
    pub reminders: ReminderScheduler,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(resolver: Arc<dyn DistanceResolver>, event_buffer_size: usize) -> Self {
        let (order_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let metrics = Metrics::new();
        let store: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
        let drivers = Arc::new(DashMap::new());
        let documents = Arc::new(DashMap::new());

        Self {
            dispatch: DispatchEngine::new(store, order_events_tx.clone(), metrics.clone()),
            pricing: PricingEngine::new(resolver, metrics.clone()),
            reminders: ReminderScheduler::new(drivers.clone(), documents.clone()),
            drivers,
            documents,
            order_events_tx,
            metrics,
        }
    }
}
