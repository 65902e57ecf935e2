use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::driver::{DocumentKind, Driver, DriverDocument};
use crate::state::AppState;

/// Days-until-expiry values at which a reminder fires, widest first.
pub const REMINDER_THRESHOLDS: [i64; 4] = [30, 14, 7, 1];

const EXPIRING_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct ExpirationStats {
    pub total: usize,
    pub expiring_30: usize,
    pub expiring_14: usize,
    pub expiring_7: usize,
    pub expired: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DueReminder {
    pub driver_id: Uuid,
    pub document_id: Uuid,
    pub kind: DocumentKind,
    pub expires_on: NaiveDate,
    pub threshold: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NudgeReport {
    pub drivers_notified: usize,
    pub with_expiring_documents: usize,
}

/// Scans document expirations and decides which reminders are due. Reads
/// driver and document records, never mutates them; its only state is the
/// ledger of already-fired (document, threshold) pairs, which is what makes
/// repeated runs idempotent.
pub struct ReminderScheduler {
    drivers: Arc<DashMap<Uuid, Driver>>,
    documents: Arc<DashMap<Uuid, DriverDocument>>,
    sent: DashMap<(Uuid, i64), DateTime<Utc>>,
}

impl ReminderScheduler {
    pub fn new(
        drivers: Arc<DashMap<Uuid, Driver>>,
        documents: Arc<DashMap<Uuid, DriverDocument>>,
    ) -> Self {
        Self {
            drivers,
            documents,
            sent: DashMap::new(),
        }
    }

    pub fn expiration_statistics(&self, today: NaiveDate) -> ExpirationStats {
        let mut stats = ExpirationStats {
            total: 0,
            expiring_30: 0,
            expiring_14: 0,
            expiring_7: 0,
            expired: 0,
        };

        for entry in self.documents.iter() {
            stats.total += 1;
            let days = days_until(entry.value().expires_on, today);

            if days <= 0 {
                stats.expired += 1;
                continue;
            }
            if days <= 7 {
                stats.expiring_7 += 1;
            }
            if days <= 14 {
                stats.expiring_14 += 1;
            }
            if days <= 30 {
                stats.expiring_30 += 1;
            }
        }

        stats
    }

    /// Reminders newly due as of `today`. Each document fires at most once
    /// per threshold, at the tightest threshold it currently sits at or
    /// below; a second call with the same date reports nothing new.
    pub fn due_reminders(&self, today: NaiveDate) -> Vec<DueReminder> {
        let mut due = Vec::new();

        for entry in self.documents.iter() {
            let document = entry.value();
            let days = days_until(document.expires_on, today);
            if days < 0 {
                continue;
            }

            let Some(threshold) = tightest_threshold(days) else {
                continue;
            };

            let key = (document.id, threshold);
            if self.sent.contains_key(&key) {
                continue;
            }
            self.sent.insert(key, Utc::now());

            due.push(DueReminder {
                driver_id: document.driver_id,
                document_id: document.id,
                kind: document.kind,
                expires_on: document.expires_on,
                threshold,
            });
        }

        due
    }

    /// Quarterly compliance nudge: every active driver hears from us,
    /// whatever the state of their paperwork.
    pub fn compliance_nudge(&self, today: NaiveDate) -> NudgeReport {
        let mut drivers_notified = 0;
        let mut with_expiring_documents = 0;

        for entry in self.drivers.iter() {
            let driver = entry.value();
            if !driver.active {
                continue;
            }
            drivers_notified += 1;

            let has_expiring = self.documents.iter().any(|doc| {
                let doc = doc.value();
                let days = days_until(doc.expires_on, today);
                doc.driver_id == driver.id && (0..=EXPIRING_WINDOW_DAYS).contains(&days)
            });
            if has_expiring {
                with_expiring_documents += 1;
            }
        }

        NudgeReport {
            drivers_notified,
            with_expiring_documents,
        }
    }
}

fn days_until(expires_on: NaiveDate, today: NaiveDate) -> i64 {
    (expires_on - today).num_days()
}

fn tightest_threshold(days: i64) -> Option<i64> {
    REMINDER_THRESHOLDS
        .iter()
        .rev()
        .copied()
        .find(|threshold| days <= *threshold)
}

/// One scan: compute the newly due reminders and hand them to the
/// notification fan-out (here: structured logs and metrics; the actual
/// delivery channel is an external collaborator). The ledger makes repeat
/// invocations for the same date report nothing new.
pub fn send_due_reminders(state: &AppState, today: NaiveDate) -> Vec<DueReminder> {
    let due = state.reminders.due_reminders(today);

    for reminder in &due {
        state
            .metrics
            .reminders_sent_total
            .with_label_values(&[&reminder.threshold.to_string()])
            .inc();

        info!(
            driver_id = %reminder.driver_id,
            document_id = %reminder.document_id,
            kind = ?reminder.kind,
            expires_on = %reminder.expires_on,
            threshold = reminder.threshold,
            "document expiration reminder due"
        );
    }

    due
}

/// Recurring timer around `send_due_reminders`.
pub async fn run_reminder_engine(state: Arc<AppState>, period: Duration) {
    info!("reminder engine started");

    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        send_due_reminders(&state, Utc::now().date_naive());
    }
}
