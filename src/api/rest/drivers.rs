use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::{DocumentKind, Driver, DriverDocument};
use crate::reminders::{self, DueReminder, ExpirationStats, NudgeReport};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id/status", patch(update_driver_status))
        .route("/drivers/:id/documents", post(attach_document))
        .route("/documents/stats", get(document_stats))
        .route("/reminders/run", post(run_reminders))
        .route("/reminders/nudge", post(compliance_nudge))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    pub phone: String,
}

#[derive(Deserialize)]
pub struct UpdateDriverStatusRequest {
    pub active: bool,
}

#[derive(Deserialize)]
pub struct AttachDocumentRequest {
    pub kind: DocumentKind,
    pub expires_on: NaiveDate,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if payload.phone.trim().is_empty() {
        return Err(AppError::Validation("phone cannot be empty".to_string()));
    }

    let driver = Driver {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        active: true,
        created_at: Utc::now(),
    };

    state.drivers.insert(driver.id, driver.clone());
    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    let drivers = state
        .drivers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(drivers)
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDriverStatusRequest>,
) -> Result<Json<Driver>, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    driver.active = payload.active;

    Ok(Json(driver.clone()))
}

async fn attach_document(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<Uuid>,
    Json(payload): Json<AttachDocumentRequest>,
) -> Result<Json<DriverDocument>, AppError> {
    if !state.drivers.contains_key(&driver_id) {
        return Err(AppError::NotFound(format!("driver {driver_id} not found")));
    }

    let document = DriverDocument {
        id: Uuid::new_v4(),
        driver_id,
        kind: payload.kind,
        expires_on: payload.expires_on,
    };

    state.documents.insert(document.id, document.clone());
    Ok(Json(document))
}

async fn document_stats(State(state): State<Arc<AppState>>) -> Json<ExpirationStats> {
    let today = Utc::now().date_naive();
    Json(state.reminders.expiration_statistics(today))
}

async fn run_reminders(State(state): State<Arc<AppState>>) -> Json<Vec<DueReminder>> {
    let today = Utc::now().date_naive();
    Json(reminders::send_due_reminders(&state, today))
}

async fn compliance_nudge(State(state): State<Arc<AppState>>) -> Json<NudgeReport> {
    let today = Utc::now().date_naive();
    Json(state.reminders.compliance_nudge(today))
}
