// libs/finance-cell/src/services/ledger.rs
use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::tenancy;
use shared_models::domain::{Appointment, AppointmentRow, PaymentStatus};

use crate::models::{DateFilter, FinanceError, LedgerEntry, LedgerTotals, PageInfo};

pub const PAGE_SIZE: usize = 20;

pub const UNKNOWN_PATIENT_LABEL: &str = "Unknown patient";
pub const UNKNOWN_PROFESSIONAL_LABEL: &str = "Unknown professional";
/// Rows with no service reference at all read as a plain consultation.
pub const DEFAULT_SERVICE_LABEL: &str = "Consultation";
/// Rows whose first service id no longer resolves.
pub const REMOVED_SERVICE_LABEL: &str = "Removed service";

#[derive(Debug, Deserialize)]
struct NameRow {
    id: Uuid,
    name: String,
}

/// Everything one ledger render needs: normalized appointments plus the
/// id→name maps for the three reference tables.
pub struct LedgerSnapshot {
    pub clinic_id: Option<Uuid>,
    pub appointments: Vec<Appointment>,
    pub patient_names: HashMap<Uuid, String>,
    pub collaborator_names: HashMap<Uuid, String>,
    pub service_names: HashMap<Uuid, String>,
}

pub struct LedgerService {
    supabase: SupabaseClient,
}

impl LedgerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn load_snapshot(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<LedgerSnapshot, FinanceError> {
        let clinic_id = tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| FinanceError::DatabaseError(e.to_string()))?;

        let (rows, patients, collaborators, services) = tokio::try_join!(
            self.fetch_collection::<AppointmentRow>("appointments", "select=*", clinic_id, auth_token),
            self.fetch_collection::<NameRow>("patients", "select=id,name", clinic_id, auth_token),
            self.fetch_collection::<NameRow>("collaborators", "select=id,name", clinic_id, auth_token),
            self.fetch_collection::<NameRow>("services", "select=id,name", clinic_id, auth_token),
        )?;

        let appointments: Vec<Appointment> =
            rows.into_iter().filter_map(Appointment::from_row).collect();
        debug!(
            "Ledger snapshot: {} appointments for clinic {:?}",
            appointments.len(),
            clinic_id
        );

        Ok(LedgerSnapshot {
            clinic_id,
            appointments,
            patient_names: name_map(patients),
            collaborator_names: name_map(collaborators),
            service_names: name_map(services),
        })
    }

    /// Authoritative payment-status write. On failure the one affected
    /// record is refetched so the divergence is at least observed and
    /// logged before the error surfaces; the client refetches from the
    /// list endpoint, which always reads fresh.
    pub async fn set_payment_status(
        &self,
        entry_id: Uuid,
        status: PaymentStatus,
        auth_token: &str,
    ) -> Result<Appointment, FinanceError> {
        debug!("Setting payment status of entry {} to {}", entry_id, status);

        let path = format!("/rest/v1/appointments?id=eq.{}", entry_id);
        let result: Result<Vec<AppointmentRow>, _> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({"payment_status": status.to_string()})),
                Some(representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => rows
                .into_iter()
                .next()
                .and_then(Appointment::from_row)
                .ok_or(FinanceError::NotFound),
            Err(e) => {
                self.reconcile_after_failure(entry_id, auth_token).await;
                Err(FinanceError::DatabaseError(e.to_string()))
            }
        }
    }

    async fn reconcile_after_failure(&self, entry_id: Uuid, auth_token: &str) {
        match self.fetch_by_id(entry_id, auth_token).await {
            Ok(Some(row)) => debug!(
                "Ledger entry {} is authoritatively {} after failed write",
                entry_id, row.payment_status
            ),
            Ok(None) => debug!("Ledger entry {} no longer exists", entry_id),
            Err(e) => warn!(
                "Compensating refetch for ledger entry {} failed: {}",
                entry_id, e
            ),
        }
    }

    async fn fetch_by_id(
        &self,
        entry_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, FinanceError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select=*", entry_id);
        let rows: Vec<AppointmentRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| FinanceError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().next().and_then(Appointment::from_row))
    }

    async fn fetch_collection<T: DeserializeOwned>(
        &self,
        table: &str,
        extra: &str,
        clinic_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<T>, FinanceError> {
        let path = match clinic_id {
            Some(clinic) => format!("/rest/v1/{}?clinic_id=eq.{}&{}", table, clinic, extra),
            None => format!("/rest/v1/{}?{}", table, extra),
        };

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| FinanceError::DatabaseError(e.to_string()))
    }
}

fn name_map(rows: Vec<NameRow>) -> HashMap<Uuid, String> {
    rows.into_iter().map(|row| (row.id, row.name)).collect()
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

// ==============================================================================
// PURE LEDGER DERIVATION
// ==============================================================================

pub fn patient_display_name(
    appointment: &Appointment,
    names: &HashMap<Uuid, String>,
) -> String {
    appointment
        .patient_id
        .and_then(|id| names.get(&id))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_PATIENT_LABEL.to_string())
}

pub fn professional_display_name(
    appointment: &Appointment,
    names: &HashMap<Uuid, String>,
) -> String {
    appointment
        .collaborator_id
        .and_then(|id| names.get(&id))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_PROFESSIONAL_LABEL.to_string())
}

/// The ledger shows the first referenced service only, with distinct labels
/// for "never had one" and "had one that is gone".
pub fn service_display_name(
    appointment: &Appointment,
    names: &HashMap<Uuid, String>,
) -> String {
    match appointment.service_ids.first() {
        None => DEFAULT_SERVICE_LABEL.to_string(),
        Some(id) => names
            .get(id)
            .cloned()
            .unwrap_or_else(|| REMOVED_SERVICE_LABEL.to_string()),
    }
}

/// AND-composed ledger predicates. The search runs over the resolved patient
/// display name, so rows whose patient is gone still match "unknown".
pub fn filter_entries<'a>(
    rows: &'a [Appointment],
    date: DateFilter,
    collaborator: Option<Uuid>,
    payment_status: Option<PaymentStatus>,
    search: Option<&str>,
    patient_names: &HashMap<Uuid, String>,
    today: NaiveDate,
) -> Vec<&'a Appointment> {
    let query = search
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    rows.iter()
        .filter(|a| {
            if let Some(collaborator_id) = collaborator {
                if a.collaborator_id != Some(collaborator_id) {
                    return false;
                }
            }
            if let Some(status) = payment_status {
                if a.payment_status != status {
                    return false;
                }
            }
            if !matches_date(a.local_date(), date, today) {
                return false;
            }
            if let Some(query) = query.as_deref() {
                if !patient_display_name(a, patient_names)
                    .to_lowercase()
                    .contains(query)
                {
                    return false;
                }
            }
            true
        })
        .collect()
}

fn matches_date(entry_date: NaiveDate, filter: DateFilter, today: NaiveDate) -> bool {
    match filter {
        DateFilter::All => true,
        DateFilter::Today => entry_date == today,
        DateFilter::Last7Days => entry_date >= today - Duration::days(7),
        DateFilter::Last30Days => entry_date >= today - Duration::days(30),
    }
}

/// Canonical instant, newest first.
pub fn sort_entries(rows: &mut [&Appointment]) {
    rows.sort_by(|a, b| b.start.cmp(&a.start));
}

/// Totals over the whole filtered set, never just the visible page. Rows
/// with a canceled payment contribute to nothing.
pub fn ledger_totals(rows: &[&Appointment]) -> LedgerTotals {
    let mut totals = LedgerTotals::default();
    for appointment in rows {
        match appointment.payment_status {
            PaymentStatus::Canceled => {}
            PaymentStatus::Paid => {
                totals.total += appointment.price;
                totals.received += appointment.price;
            }
            PaymentStatus::Pending => {
                totals.total += appointment.price;
                totals.pending += appointment.price;
            }
        }
    }
    totals
}

/// Clamp the requested page into the valid range and report the shown span.
/// An empty ledger still reports page 1 of 1.
pub fn resolve_page(total: usize, requested: usize) -> PageInfo {
    let total_pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
    let page = requested.clamp(1, total_pages);
    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(total);

    PageInfo {
        page,
        total_pages,
        shown_from: if total == 0 { 0 } else { start + 1 },
        shown_to: end,
        total,
    }
}

pub fn page_slice<'a>(rows: &'a [&'a Appointment], info: &PageInfo) -> &'a [&'a Appointment] {
    if info.total == 0 {
        return &[];
    }
    &rows[info.shown_from - 1..info.shown_to]
}

pub fn ledger_entry(
    appointment: &Appointment,
    patient_names: &HashMap<Uuid, String>,
    collaborator_names: &HashMap<Uuid, String>,
    service_names: &HashMap<Uuid, String>,
) -> LedgerEntry {
    LedgerEntry {
        id: appointment.id,
        date: appointment.start.format("%d/%m/%Y").to_string(),
        time: appointment.start.format("%H:%M").to_string(),
        patient: patient_display_name(appointment, patient_names),
        professional: professional_display_name(appointment, collaborator_names),
        service: service_display_name(appointment, service_names),
        price: appointment.price,
        payment_status: appointment.payment_status,
    }
}
