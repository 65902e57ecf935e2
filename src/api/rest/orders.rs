use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::dispatch::{ClaimOutcome, OrderDetails, OrderFilter};
use crate::error::AppError;
use crate::models::order::{Order, OrderStatus, SizeClass, Urgency};
use crate::models::quote::Quote;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quotes", post(create_quote))
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/advance", post(advance_order))
        .route("/orders/:id/cancel", post(cancel_order))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub pickup_address: String,
    pub delivery_address: String,
    pub urgency: Urgency,
    pub size: SizeClass,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub pickup_address: String,
    pub delivery_address: String,
    pub urgency: Urgency,
    pub size: SizeClass,
    pub item_description: String,
    pub contact_phone: String,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub tip: f64,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Deserialize)]
pub struct AcceptOrderRequest {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct AdvanceOrderRequest {
    pub driver_id: Uuid,
    pub target: OrderStatus,
    #[serde(default)]
    pub proof_photo_url: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub actor_id: Uuid,
}

async fn create_quote(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    if payload.pickup_address.trim().is_empty() || payload.delivery_address.trim().is_empty() {
        return Err(AppError::Validation(
            "pickup and delivery addresses are required".to_string(),
        ));
    }

    let quote = state
        .pricing
        .quote(
            &payload.pickup_address,
            &payload.delivery_address,
            payload.urgency,
            payload.size,
        )
        .await;

    Ok(Json(quote))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let quote = state
        .pricing
        .quote(
            &payload.pickup_address,
            &payload.delivery_address,
            payload.urgency,
            payload.size,
        )
        .await;

    let details = OrderDetails {
        item_description: payload.item_description,
        contact_phone: payload.contact_phone,
        special_instructions: payload.special_instructions,
        tip: payload.tip,
    };

    let order = state
        .dispatch
        .create_order(payload.customer_id, &quote, details)
        .await?;

    Ok(Json(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state
        .dispatch
        .orders(OrderFilter {
            status: query.status,
        })
        .await?;

    Ok(Json(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.dispatch.order(id).await?;
    Ok(Json(order))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptOrderRequest>,
) -> Result<Json<Order>, AppError> {
    match state.dispatch.accept_order(id, payload.driver_id).await? {
        ClaimOutcome::Claimed(order) => Ok(Json(order)),
        ClaimOutcome::Lost => Err(AppError::ClaimLost),
    }
}

async fn advance_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .dispatch
        .advance(id, payload.driver_id, payload.target, payload.proof_photo_url)
        .await?;

    Ok(Json(order))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state.dispatch.cancel(id, payload.actor_id).await?;
    Ok(Json(order))
}
