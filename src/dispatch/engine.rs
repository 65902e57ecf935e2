use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dispatch::store::{
    ExpectedDriver, OrderFilter, OrderPatch, OrderStore, StoreError,
};
use crate::error::AppError;
use crate::models::order::{Order, OrderEvent, OrderStatus};
use crate::models::quote::Quote;
use crate::observability::metrics::Metrics;

/// Outcome of a claim attempt. Losing the race to another driver is an
/// expected, frequent result, not an error.
#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(Order),
    Lost,
}

#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub item_description: String,
    pub contact_phone: String,
    pub special_instructions: Option<String>,
    pub tip: f64,
}

/// Owns the order state machine. Stateless between calls; every durable
/// fact lives in the injected store, and every write goes through the
/// store's conditional-update primitive so no partial transition is ever
/// observable.
pub struct DispatchEngine {
    store: Arc<dyn OrderStore>,
    events: broadcast::Sender<OrderEvent>,
    metrics: Metrics,
}

impl DispatchEngine {
    pub fn new(
        store: Arc<dyn OrderStore>,
        events: broadcast::Sender<OrderEvent>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            events,
            metrics,
        }
    }

    pub async fn create_order(
        &self,
        customer_id: Uuid,
        quote: &Quote,
        details: OrderDetails,
    ) -> Result<Order, AppError> {
        if quote.pickup_address.trim().is_empty() || quote.delivery_address.trim().is_empty() {
            return Err(AppError::Validation(
                "pickup and delivery addresses are required".to_string(),
            ));
        }
        if details.contact_phone.trim().is_empty() {
            return Err(AppError::Validation(
                "contact phone is required".to_string(),
            ));
        }
        if details.item_description.trim().is_empty() {
            return Err(AppError::Validation(
                "item description is required".to_string(),
            ));
        }
        if details.tip < 0.0 {
            return Err(AppError::Validation("tip cannot be negative".to_string()));
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            customer_id,
            driver_id: None,
            pickup_address: quote.pickup_address.clone(),
            delivery_address: quote.delivery_address.clone(),
            item_description: details.item_description,
            contact_phone: details.contact_phone,
            special_instructions: details.special_instructions,
            urgency: quote.urgency,
            size: quote.size,
            total: quote.total,
            tip: details.tip,
            status: OrderStatus::Pending,
            proof_photo_url: None,
            created_at: now,
            accepted_at: None,
            picked_up_at: None,
            delivered_at: None,
            cancelled_at: None,
            updated_at: now,
        };

        self.store.insert(order.clone()).await.map_err(transport)?;

        self.metrics
            .orders_total
            .with_label_values(&["pending"])
            .inc();
        self.metrics.pending_orders.inc();
        self.emit(&order);

        info!(
            order_id = %order.id,
            customer_id = %customer_id,
            total = order.total,
            "order created"
        );

        Ok(order)
    }

    /// Claim a pending order for a driver. Exactly one of any number of
    /// concurrent attempts succeeds; the rest observe zero affected rows and
    /// get `Lost`. Transport errors are retryable: retrying an already-lost
    /// claim just yields `Lost` again.
    pub async fn accept_order(
        &self,
        order_id: Uuid,
        driver_id: Uuid,
    ) -> Result<ClaimOutcome, AppError> {
        let rows = self
            .store
            .conditional_update(
                order_id,
                &[OrderStatus::Pending],
                ExpectedDriver::Unassigned,
                OrderPatch::claim(driver_id, Utc::now()),
            )
            .await
            .map_err(|err| {
                self.metrics
                    .claims_total
                    .with_label_values(&["error"])
                    .inc();
                transport(err)
            })?;

        if rows == 0 {
            if self.store.get(order_id).await.map_err(transport)?.is_none() {
                return Err(AppError::NotFound(format!("order {order_id} not found")));
            }

            self.metrics.claims_total.with_label_values(&["lost"]).inc();
            debug!(order_id = %order_id, driver_id = %driver_id, "claim lost");
            return Ok(ClaimOutcome::Lost);
        }

        let order = self.load(order_id).await?;

        self.metrics.claims_total.with_label_values(&["won"]).inc();
        self.metrics
            .orders_total
            .with_label_values(&["accepted"])
            .inc();
        self.metrics.pending_orders.dec();
        self.emit(&order);

        info!(order_id = %order_id, driver_id = %driver_id, "order claimed");

        Ok(ClaimOutcome::Claimed(order))
    }

    /// Advance a claimed order along the forward-only sequence. The write
    /// expects the precise prior status and the assigned driver; if it
    /// affects zero rows the order moved concurrently (or the caller has no
    /// claim on it) and the attempt is rejected with the fresh status.
    pub async fn advance(
        &self,
        order_id: Uuid,
        driver_id: Uuid,
        target: OrderStatus,
        proof_photo_url: Option<String>,
    ) -> Result<Order, AppError> {
        let expected_statuses: &[OrderStatus] = match target {
            OrderStatus::PickedUp => &[OrderStatus::Accepted],
            OrderStatus::InTransit => &[OrderStatus::PickedUp],
            OrderStatus::Delivered => &[OrderStatus::PickedUp, OrderStatus::InTransit],
            other => {
                return Err(AppError::Validation(format!(
                    "{other} is not a driver-advanceable status"
                )))
            }
        };

        let patch = OrderPatch::transition(target, Utc::now()).with_proof(proof_photo_url);
        let rows = self
            .store
            .conditional_update(
                order_id,
                expected_statuses,
                ExpectedDriver::Assigned(driver_id),
                patch,
            )
            .await
            .map_err(transport)?;

        if rows == 0 {
            let current = self.store.get(order_id).await.map_err(transport)?;
            return Err(match current {
                None => AppError::NotFound(format!("order {order_id} not found")),
                Some(order) if order.driver_id != Some(driver_id) => AppError::IllegalTransition(
                    format!("driver {driver_id} is not assigned to order {order_id}"),
                ),
                Some(order) => AppError::IllegalTransition(format!(
                    "order {order_id} is {} and cannot move to {target}",
                    order.status
                )),
            });
        }

        let order = self.load(order_id).await?;

        self.metrics
            .orders_total
            .with_label_values(&[target.as_str()])
            .inc();
        self.emit(&order);

        info!(order_id = %order_id, driver_id = %driver_id, status = %target, "order advanced");

        Ok(order)
    }

    /// Cancel an order that has not been picked up yet. Once a driver has
    /// the goods (or the order is terminal) cancellation is rejected.
    pub async fn cancel(&self, order_id: Uuid, actor_id: Uuid) -> Result<Order, AppError> {
        let rows = self
            .store
            .conditional_update(
                order_id,
                &[OrderStatus::Pending, OrderStatus::Accepted],
                ExpectedDriver::Any,
                OrderPatch::transition(OrderStatus::Cancelled, Utc::now()),
            )
            .await
            .map_err(transport)?;

        if rows == 0 {
            let current = self.store.get(order_id).await.map_err(transport)?;
            return Err(match current {
                None => AppError::NotFound(format!("order {order_id} not found")),
                Some(order) => AppError::IllegalTransition(format!(
                    "order {order_id} is {} and can no longer be cancelled",
                    order.status
                )),
            });
        }

        let order = self.load(order_id).await?;

        // Cancelled straight out of the pool, before any driver claimed it.
        if order.accepted_at.is_none() {
            self.metrics.pending_orders.dec();
        }
        self.metrics
            .orders_total
            .with_label_values(&["cancelled"])
            .inc();
        self.emit(&order);

        info!(order_id = %order_id, actor_id = %actor_id, "order cancelled");

        Ok(order)
    }

    pub async fn order(&self, order_id: Uuid) -> Result<Order, AppError> {
        self.store
            .get(order_id)
            .await
            .map_err(transport)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
    }

    pub async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>, AppError> {
        self.store.list(filter).await.map_err(transport)
    }

    async fn load(&self, order_id: Uuid) -> Result<Order, AppError> {
        self.store
            .get(order_id)
            .await
            .map_err(transport)?
            .ok_or_else(|| AppError::Internal(format!("order {order_id} vanished after update")))
    }

    fn emit(&self, order: &Order) {
        let _ = self.events.send(OrderEvent {
            order_id: order.id,
            status: order.status,
            driver_id: order.driver_id,
            at: order.updated_at,
        });
    }
}

fn transport(err: StoreError) -> AppError {
    AppError::Transport(err.to_string())
}
