// libs/catalog-cell/src/models.rs
use serde::Deserialize;

use shared_models::error::AppError;

fn default_duration() -> i64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    #[serde(default = "default_duration")]
    pub duration_minutes: i64,
    #[serde(default)]
    pub price: f64,
    pub color: Option<String>,
    #[serde(default)]
    pub is_package: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub duration_minutes: Option<i64>,
    pub price: Option<f64>,
    pub color: Option<String>,
    pub is_package: Option<bool>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Tenant not resolved yet. Wait for your profile to load and try again.")]
    TenantNotResolved,

    #[error("Service not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TenantNotResolved => AppError::PreconditionFailed(err.to_string()),
            CatalogError::NotFound => AppError::NotFound(err.to_string()),
            CatalogError::ValidationError(msg) => AppError::BadRequest(msg),
            CatalogError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
