// libs/schedule-cell/src/services/agenda.rs
use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::tenancy;
use shared_models::domain::{Appointment, AppointmentRow, Collaborator, Patient, Service};

use crate::models::{AgendaFilter, DayColumn, MonthCell, MonthOverview, ScheduleError};
use crate::services::layout;
use crate::services::store::ScheduleStore;

/// Everything one agenda render needs, resolved in a single load: the
/// normalized appointment collection plus the reference collections the
/// client joins against.
pub struct AgendaSnapshot {
    pub clinic_id: Option<Uuid>,
    pub ticket: u64,
    pub appointments: Vec<Appointment>,
    pub patients: Vec<Patient>,
    pub services: Vec<Service>,
    pub collaborators: Vec<Collaborator>,
}

pub struct AgendaService {
    supabase: SupabaseClient,
}

impl AgendaService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Fetch the tenant's collections and install the appointment snapshot
    /// into the store under a fresh ticket. When a faster fetch has already
    /// installed a newer snapshot, this load's rows are discarded and the
    /// newer cached rows are served instead.
    pub async fn load_snapshot(
        &self,
        user_id: &str,
        auth_token: &str,
        store: &ScheduleStore,
    ) -> Result<AgendaSnapshot, ScheduleError> {
        let clinic_id = tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;
        let ticket = store.issue_ticket();

        let (rows, patients, services, collaborators) = tokio::try_join!(
            self.fetch_collection::<AppointmentRow>("appointments", "select=*", clinic_id, auth_token),
            self.fetch_collection::<Patient>("patients", "order=name.asc", clinic_id, auth_token),
            self.fetch_collection::<Service>("services", "is_active=eq.true", clinic_id, auth_token),
            self.fetch_collection::<Collaborator>("collaborators", "is_active=eq.true", clinic_id, auth_token),
        )?;

        let fetched: Vec<Appointment> = rows.into_iter().filter_map(Appointment::from_row).collect();
        debug!(
            "Loaded {} appointments for clinic {:?} under ticket {}",
            fetched.len(),
            clinic_id,
            ticket
        );

        let appointments = match clinic_id {
            Some(clinic) => {
                if store.install(clinic, ticket, fetched.clone()).await {
                    fetched
                } else {
                    store.rows(clinic).await
                }
            }
            None => fetched,
        };

        Ok(AgendaSnapshot {
            clinic_id,
            ticket,
            appointments,
            patients,
            services,
            collaborators,
        })
    }

    async fn fetch_collection<T: DeserializeOwned>(
        &self,
        table: &str,
        extra: &str,
        clinic_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<T>, ScheduleError> {
        let path = match clinic_id {
            Some(clinic) => format!("/rest/v1/{}?clinic_id=eq.{}&{}", table, clinic, extra),
            None => format!("/rest/v1/{}?{}", table, extra),
        };

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))
    }
}

// ==============================================================================
// PURE VIEW-MODEL DERIVATION
// ==============================================================================

pub fn patient_names(patients: &[Patient]) -> HashMap<Uuid, String> {
    patients
        .iter()
        .map(|p| (p.id, p.name.clone()))
        .collect()
}

/// Apply the AND-composed display predicates. An active name search hides
/// appointments whose patient cannot be resolved.
pub fn filter_appointments(
    rows: &[Appointment],
    filter: &AgendaFilter,
    names: &HashMap<Uuid, String>,
) -> Vec<Appointment> {
    let query = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    rows.iter()
        .filter(|a| {
            if let Some(collaborator_id) = filter.collaborator_id {
                if a.collaborator_id != Some(collaborator_id) {
                    return false;
                }
            }
            if let Some(status) = filter.status {
                if a.status != status {
                    return false;
                }
            }
            if let Some((from, to)) = filter.range {
                if a.start < from || a.start > to {
                    return false;
                }
            }
            if let Some(query) = query.as_deref() {
                let matched = a
                    .patient_id
                    .and_then(|id| names.get(&id))
                    .map(|name| name.to_lowercase().contains(query))
                    .unwrap_or(false);
                if !matched {
                    return false;
                }
            }
            true
        })
        .cloned()
        .collect()
}

/// Sunday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// One day column: canceled rows hidden, blocks sorted by start and placed
/// on the pixel grid.
pub fn day_column(date: NaiveDate, rows: &[Appointment]) -> DayColumn {
    let mut day_rows: Vec<Appointment> = rows
        .iter()
        .filter(|a| !a.is_canceled() && a.local_date() == date)
        .cloned()
        .collect();
    day_rows.sort_by_key(|a| a.start);

    DayColumn {
        date,
        blocks: day_rows.into_iter().map(layout::place).collect(),
    }
}

pub fn week_columns(reference: NaiveDate, rows: &[Appointment]) -> Vec<DayColumn> {
    let start = week_start(reference);
    (0..7)
        .map(|offset| day_column(start + Duration::days(offset), rows))
        .collect()
}

/// Month grid padded to full weeks. Cells cap at three visible entries,
/// sorted by start, with the overflow count alongside.
pub fn month_cells(reference: NaiveDate, rows: &[Appointment]) -> Vec<MonthCell> {
    let first = reference.with_day(1).unwrap_or(reference);
    let lead = first.weekday().num_days_from_sunday() as i64;
    let grid_start = first - Duration::days(lead);
    let total = lead + days_in_month(first);
    let total = ((total + 6) / 7) * 7;

    (0..total)
        .map(|offset| {
            let date = grid_start + Duration::days(offset);
            let mut day_rows: Vec<Appointment> = rows
                .iter()
                .filter(|a| !a.is_canceled() && a.local_date() == date)
                .cloned()
                .collect();
            day_rows.sort_by_key(|a| a.start);

            let overflow = day_rows.len().saturating_sub(3);
            day_rows.truncate(3);

            MonthCell {
                date,
                in_month: date.year() == first.year() && date.month() == first.month(),
                visible: day_rows,
                overflow,
            }
        })
        .collect()
}

pub fn year_overview(reference: NaiveDate, rows: &[Appointment]) -> Vec<MonthOverview> {
    (1..=12)
        .map(|month| MonthOverview {
            month,
            appointment_count: rows
                .iter()
                .filter(|a| {
                    !a.is_canceled()
                        && a.local_date().year() == reference.year()
                        && a.local_date().month() == month
                })
                .count(),
        })
        .collect()
}

/// Historical entries: canceled, or already finished. Newest first.
pub fn history_entries(rows: &[Appointment], now: DateTime<Utc>) -> Vec<Appointment> {
    let mut entries: Vec<Appointment> = rows
        .iter()
        .filter(|a| a.is_canceled() || a.end < now)
        .cloned()
        .collect();
    entries.sort_by(|a, b| b.start.cmp(&a.start));
    entries
}

fn days_in_month(first: NaiveDate) -> i64 {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next.map(|n| (n - first).num_days()).unwrap_or(30)
}
