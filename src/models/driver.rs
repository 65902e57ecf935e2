use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    DriversLicense,
    VehicleRegistration,
    Insurance,
}

/// Compliance document on file for a driver. The reminder scheduler reads
/// these records; it never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverDocument {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub kind: DocumentKind,
    pub expires_on: NaiveDate,
}
