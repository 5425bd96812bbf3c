// libs/staff-cell/src/models.rs
use serde::Deserialize;

use shared_models::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollaboratorRequest {
    pub name: String,
    pub role: Option<String>,
    pub color: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCollaboratorRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub color: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StaffError {
    #[error("Tenant not resolved yet. Wait for your profile to load and try again.")]
    TenantNotResolved,

    #[error("Collaborator not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StaffError> for AppError {
    fn from(err: StaffError) -> Self {
        match err {
            StaffError::TenantNotResolved => AppError::PreconditionFailed(err.to_string()),
            StaffError::NotFound => AppError::NotFound(err.to_string()),
            StaffError::ValidationError(msg) => AppError::BadRequest(msg),
            StaffError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
