// libs/schedule-cell/src/services/store.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::domain::{Appointment, AppointmentStatus};

/// Per-clinic cache of the last authoritative appointment snapshot, plus the
/// optimistic edits layered on top of it between refetches.
///
/// Every snapshot fetch takes a ticket from a monotonic sequence; installing
/// a snapshot whose ticket has been superseded is refused, so a slow fetch
/// can never overwrite fresher state.
pub struct ScheduleStore {
    clinics: Arc<RwLock<HashMap<Uuid, ClinicSchedule>>>,
    tickets: Arc<AtomicU64>,
}

#[derive(Default)]
struct ClinicSchedule {
    rows: Vec<Appointment>,
    ticket: u64,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self {
            clinics: Arc::new(RwLock::new(HashMap::new())),
            tickets: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Next fetch ticket. Strictly increasing across the process.
    pub fn issue_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install a fetched snapshot. Returns `false` (and leaves the cache
    /// untouched) when a later ticket already installed its result.
    pub async fn install(&self, clinic_id: Uuid, ticket: u64, rows: Vec<Appointment>) -> bool {
        let mut clinics = self.clinics.write().await;
        let entry = clinics.entry(clinic_id).or_default();

        if ticket < entry.ticket {
            debug!(
                "Discarding superseded snapshot for clinic {} (ticket {} < {})",
                clinic_id, ticket, entry.ticket
            );
            return false;
        }

        entry.ticket = ticket;
        entry.rows = rows;
        true
    }

    /// Merge an authoritative row by id: replace when present, append when
    /// new. This is what keeps an optimistic write from leaving both the
    /// placeholder and the server row behind.
    pub async fn merge(&self, clinic_id: Uuid, row: Appointment) {
        let mut clinics = self.clinics.write().await;
        let entry = clinics.entry(clinic_id).or_default();

        if let Some(existing) = entry.rows.iter_mut().find(|a| a.id == row.id) {
            *existing = row;
        } else {
            entry.rows.push(row);
        }
    }

    /// Drop a row wherever it is cached. Used when a compensating refetch
    /// shows the backend no longer has it.
    pub async fn purge(&self, id: Uuid) {
        let mut clinics = self.clinics.write().await;
        for entry in clinics.values_mut() {
            entry.rows.retain(|a| a.id != id);
        }
    }

    /// Reconcile a single record with what the backend just returned for it.
    pub async fn reconcile(&self, id: Uuid, authoritative: Option<Appointment>) {
        match authoritative {
            Some(row) => self.merge(row.clinic_id, row).await,
            None => self.purge(id).await,
        }
    }

    /// Optimistically flip a cached row's status before the backend confirms.
    pub async fn set_status(&self, id: Uuid, status: AppointmentStatus) {
        let mut clinics = self.clinics.write().await;
        for entry in clinics.values_mut() {
            if let Some(row) = entry.rows.iter_mut().find(|a| a.id == id) {
                row.status = status;
            }
        }
    }

    pub async fn rows(&self, clinic_id: Uuid) -> Vec<Appointment> {
        let clinics = self.clinics.read().await;
        clinics
            .get(&clinic_id)
            .map(|entry| entry.rows.clone())
            .unwrap_or_default()
    }

    /// Drop a clinic's cached snapshot so the next agenda load refetches.
    pub async fn invalidate(&self, clinic_id: Uuid) {
        let mut clinics = self.clinics.write().await;
        if clinics.remove(&clinic_id).is_some() {
            debug!("Invalidated cached schedule for clinic {}", clinic_id);
        }
    }
}

impl Default for ScheduleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ScheduleStore {
    fn clone(&self) -> Self {
        Self {
            clinics: Arc::clone(&self.clinics),
            tickets: Arc::clone(&self.tickets),
        }
    }
}
