use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order store unavailable: {0}")]
    Unavailable(String),
}

/// Fields a single conditional write may change. The status-specific
/// timestamp is derived from the new status so a transition and its
/// timestamp always land together.
#[derive(Debug, Clone)]
pub struct OrderPatch {
    pub status: OrderStatus,
    pub driver_id: Option<Uuid>,
    pub proof_photo_url: Option<String>,
    pub stamp: DateTime<Utc>,
}

impl OrderPatch {
    pub fn transition(status: OrderStatus, stamp: DateTime<Utc>) -> Self {
        Self {
            status,
            driver_id: None,
            proof_photo_url: None,
            stamp,
        }
    }

    pub fn claim(driver_id: Uuid, stamp: DateTime<Utc>) -> Self {
        Self {
            status: OrderStatus::Accepted,
            driver_id: Some(driver_id),
            proof_photo_url: None,
            stamp,
        }
    }

    pub fn with_proof(mut self, proof_photo_url: Option<String>) -> Self {
        self.proof_photo_url = proof_photo_url;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedDriver {
    Unassigned,
    Assigned(Uuid),
    Any,
}

impl ExpectedDriver {
    fn matches(self, current: Option<Uuid>) -> bool {
        match self {
            ExpectedDriver::Unassigned => current.is_none(),
            ExpectedDriver::Assigned(id) => current == Some(id),
            ExpectedDriver::Any => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

/// Durable home of all orders. `conditional_update` is the single
/// concurrency primitive of the whole dispatch design: a check-then-write
/// against one order that reports whether it took effect. A backing store
/// without such a primitive must emulate it with a version column or a
/// row-locked transaction.
#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Applies `patch` iff the order's status is one of `expected_statuses`
    /// and its driver matches `expected_driver`. Returns the number of rows
    /// affected: 1 if the write landed, 0 if the condition failed.
    async fn conditional_update(
        &self,
        id: Uuid,
        expected_statuses: &[OrderStatus],
        expected_driver: ExpectedDriver,
        patch: OrderPatch,
    ) -> Result<u64, StoreError>;
}

/// In-memory store. The map entry lock held by `get_mut` makes the
/// check-then-write in `conditional_update` atomic per order.
pub struct InMemoryOrderStore {
    orders: DashMap<Uuid, Order>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        self.orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let orders = self
            .orders
            .iter()
            .filter(|entry| match filter.status {
                Some(status) => entry.value().status == status,
                None => true,
            })
            .map(|entry| entry.value().clone())
            .collect();

        Ok(orders)
    }

    async fn conditional_update(
        &self,
        id: Uuid,
        expected_statuses: &[OrderStatus],
        expected_driver: ExpectedDriver,
        patch: OrderPatch,
    ) -> Result<u64, StoreError> {
        let Some(mut entry) = self.orders.get_mut(&id) else {
            return Ok(0);
        };

        let order = entry.value_mut();
        if !expected_statuses.contains(&order.status) || !expected_driver.matches(order.driver_id)
        {
            return Ok(0);
        }

        apply_patch(order, &patch);
        Ok(1)
    }
}

fn apply_patch(order: &mut Order, patch: &OrderPatch) {
    order.status = patch.status;
    if let Some(driver_id) = patch.driver_id {
        order.driver_id = Some(driver_id);
    }
    if let Some(url) = &patch.proof_photo_url {
        order.proof_photo_url = Some(url.clone());
    }

    match patch.status {
        OrderStatus::Accepted => order.accepted_at = Some(patch.stamp),
        OrderStatus::PickedUp => order.picked_up_at = Some(patch.stamp),
        OrderStatus::Delivered => order.delivered_at = Some(patch.stamp),
        OrderStatus::Cancelled => order.cancelled_at = Some(patch.stamp),
        OrderStatus::Pending | OrderStatus::InTransit => {}
    }

    order.updated_at = patch.stamp;
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::order::{Order, OrderStatus, SizeClass, Urgency};

    use super::{ExpectedDriver, InMemoryOrderStore, OrderPatch, OrderStore};

    fn pending_order() -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            driver_id: None,
            pickup_address: "123 Main St, Springfield".to_string(),
            delivery_address: "900 Elm St, Springfield".to_string(),
            item_description: "groceries".to_string(),
            contact_phone: "555-0100".to_string(),
            special_instructions: None,
            urgency: Urgency::Standard,
            size: SizeClass::Small,
            total: 8.75,
            tip: 0.0,
            status: OrderStatus::Pending,
            proof_photo_url: None,
            created_at: now,
            accepted_at: None,
            picked_up_at: None,
            delivered_at: None,
            cancelled_at: None,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn claim_applies_once_and_only_once() {
        let store = InMemoryOrderStore::new();
        let order = pending_order();
        let id = order.id;
        store.insert(order).await.unwrap();

        let first_driver = Uuid::new_v4();
        let rows = store
            .conditional_update(
                id,
                &[OrderStatus::Pending],
                ExpectedDriver::Unassigned,
                OrderPatch::claim(first_driver, Utc::now()),
            )
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let rows = store
            .conditional_update(
                id,
                &[OrderStatus::Pending],
                ExpectedDriver::Unassigned,
                OrderPatch::claim(Uuid::new_v4(), Utc::now()),
            )
            .await
            .unwrap();
        assert_eq!(rows, 0);

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Accepted);
        assert_eq!(stored.driver_id, Some(first_driver));
        assert!(stored.accepted_at.is_some());
    }

    #[tokio::test]
    async fn update_rejected_for_wrong_driver() {
        let store = InMemoryOrderStore::new();
        let order = pending_order();
        let id = order.id;
        store.insert(order).await.unwrap();

        let driver = Uuid::new_v4();
        store
            .conditional_update(
                id,
                &[OrderStatus::Pending],
                ExpectedDriver::Unassigned,
                OrderPatch::claim(driver, Utc::now()),
            )
            .await
            .unwrap();

        let rows = store
            .conditional_update(
                id,
                &[OrderStatus::Accepted],
                ExpectedDriver::Assigned(Uuid::new_v4()),
                OrderPatch::transition(OrderStatus::PickedUp, Utc::now()),
            )
            .await
            .unwrap();
        assert_eq!(rows, 0);

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Accepted);
    }

    #[tokio::test]
    async fn missing_order_affects_zero_rows() {
        let store = InMemoryOrderStore::new();

        let rows = store
            .conditional_update(
                Uuid::new_v4(),
                &[OrderStatus::Pending],
                ExpectedDriver::Unassigned,
                OrderPatch::claim(Uuid::new_v4(), Utc::now()),
            )
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }
}
