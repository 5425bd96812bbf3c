// libs/settings-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

/// The branding blob every screen renders from: clinic display name,
/// optional logo, and the accent color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    pub clinic_name: String,
    pub logo_url: Option<String>,
    pub brand_color: String,
}

/// Full profile payload from the settings form. The form always submits
/// every field, so an absent optional means "clear", not "keep".
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: String,
    #[serde(default)]
    pub clinic_name: String,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub avatar_url: Option<String>,
    pub brand_color: Option<String>,
    pub logo_url: Option<String>,
}

/// Plan summary for the subscription card.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionSummary {
    pub plan: String,
    pub subscription_status: String,
    pub status_label: String,
    pub days_remaining: i64,
    pub next_billing_date: Option<String>,
}

/// Broadcast when a profile save changes branding. Carries nothing beyond
/// the account: consumers refetch rather than patch their own copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeEvent {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::ValidationError(msg) => AppError::BadRequest(msg),
            SettingsError::ProfileNotFound => AppError::NotFound("Profile not found".to_string()),
            SettingsError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
