// libs/auth-cell/src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// SIGN-UP / SIGN-IN MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    /// Defaults to "<full_name>'s Clinic" when absent or blank.
    pub clinic_name: Option<String>,
    pub specialty: SpecialtyNiche,
}

/// Professional niche picked during onboarding, stored in user metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpecialtyNiche {
    Nutrition,
    Physiotherapy,
    Psychology,
    Other,
}

impl fmt::Display for SpecialtyNiche {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecialtyNiche::Nutrition => write!(f, "nutrition"),
            SpecialtyNiche::Physiotherapy => write!(f, "physiotherapy"),
            SpecialtyNiche::Psychology => write!(f, "psychology"),
            SpecialtyNiche::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}
