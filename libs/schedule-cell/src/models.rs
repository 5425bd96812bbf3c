// libs/schedule-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_models::domain::{Appointment, AppointmentStatus, Location};
use shared_models::error::AppError;

// ==============================================================================
// AGENDA QUERY
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgendaMode {
    Day,
    Week,
    Month,
    Year,
    History,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgendaQuery {
    #[serde(default = "default_mode")]
    pub mode: AgendaMode,
    pub date: Option<NaiveDate>,
    pub search: Option<String>,
    pub collaborator_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

fn default_mode() -> AgendaMode {
    AgendaMode::Week
}

/// AND-composed display predicates. Every `None` predicate passes.
#[derive(Debug, Clone, Default)]
pub struct AgendaFilter {
    pub search: Option<String>,
    pub collaborator_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

// ==============================================================================
// VIEW MODELS
// ==============================================================================

/// An appointment placed on the time grid, carrying the pixel geometry the
/// calendar needs to absolutely position its card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedAppointment {
    pub appointment: Appointment,
    pub offset_px: f64,
    pub height_px: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayColumn {
    pub date: NaiveDate,
    pub blocks: Vec<PlacedAppointment>,
}

/// One cell of the month grid. Lead/trail cells from adjacent months carry
/// `in_month: false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub visible: Vec<Appointment>,
    pub overflow: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthOverview {
    pub month: u32,
    pub appointment_count: usize,
}

// ==============================================================================
// MUTATION REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub collaborator_id: Option<Uuid>,
    #[serde(default)]
    pub service_ids: Vec<Uuid>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub location: Location,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub collaborator_id: Option<Uuid>,
    pub service_ids: Option<Vec<Uuid>>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub location: Option<Location>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuickPatientRequest {
    pub name: String,
    pub phone: String,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

// ==============================================================================
// CHANGE FEED
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Row-change notification as the hosted backend posts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub table: String,
    pub record: Option<Value>,
    pub old_record: Option<Value>,
}

impl ChangeEvent {
    /// Clinic the change belongs to, from whichever row image carries it.
    pub fn clinic_id(&self) -> Option<Uuid> {
        for image in [self.record.as_ref(), self.old_record.as_ref()] {
            if let Some(id) = image
                .and_then(|value| value.get("clinic_id"))
                .and_then(|value| value.as_str())
                .and_then(|value| Uuid::parse_str(value).ok())
            {
                return Some(id);
            }
        }
        None
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("Tenant not resolved yet. Wait for your profile to load and try again.")]
    TenantNotResolved,

    #[error("Appointment not found")]
    NotFound,

    #[error("Status cannot change from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::TenantNotResolved => AppError::PreconditionFailed(err.to_string()),
            ScheduleError::NotFound => AppError::NotFound(err.to_string()),
            ScheduleError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            ScheduleError::InvalidTime(_) | ScheduleError::ValidationError(_) => {
                AppError::BadRequest(err.to_string())
            }
            ScheduleError::DatabaseError(_) => AppError::Database(err.to_string()),
        }
    }
}
