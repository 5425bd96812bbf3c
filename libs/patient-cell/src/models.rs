// libs/patient-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::domain::Address;
use shared_models::error::AppError;

// ============================================================================
// REQUEST / QUERY TYPES
// ============================================================================

/// Free-text lookup over the active patient list. The term matches either the
/// patient name (case-insensitive substring) or the CPF, with punctuation
/// stripped from both sides before comparing digits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub address: Address,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<Address>,
    pub avatar_url: Option<String>,
}

/// A clinical-note write. At least one of the two fields must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRequest {
    #[serde(default)]
    pub description: String,
    pub attachment: Option<String>,
}

// ============================================================================
// TIMELINE
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    Appointment,
    Note,
}

/// One entry in a patient's clinical history: either a visit or a note,
/// flattened into a common display shape and ordered newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: Uuid,
    pub kind: TimelineKind,
    pub instant: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub attachment: Option<String>,
}

// ============================================================================
// CSV IMPORT
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum PatientError {
    #[error("Tenant not resolved yet. Wait for your profile to load and try again.")]
    TenantNotResolved,

    #[error("Patient not found")]
    NotFound,

    #[error("Record not found")]
    RecordNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Malformed CSV: {0}")]
    MalformedCsv(String),

    #[error("CSV generation failed: {0}")]
    ExportFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::TenantNotResolved => AppError::PreconditionFailed(err.to_string()),
            PatientError::NotFound | PatientError::RecordNotFound => {
                AppError::NotFound(err.to_string())
            }
            PatientError::ValidationError(msg) => AppError::BadRequest(msg),
            PatientError::MalformedCsv(_) => AppError::BadRequest(err.to_string()),
            PatientError::ExportFailed(msg) => AppError::Internal(msg),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
