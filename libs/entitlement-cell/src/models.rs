// libs/entitlement-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// ACCESS RESOLUTION MODELS
// ==============================================================================

/// Resolved access snapshot for one user. Access holds while a paid
/// subscription is active or the trial window is still open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessStatus {
    pub has_access: bool,
    pub reason: AccessReason,
    pub subscription_status: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub trial_days_left: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    PaidSubscription,
    ActiveTrial,
    TrialExpired,
    NoSubscription,
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessReason::PaidSubscription => write!(f, "paid_subscription"),
            AccessReason::ActiveTrial => write!(f, "active_trial"),
            AccessReason::TrialExpired => write!(f, "trial_expired"),
            AccessReason::NoSubscription => write!(f, "no_subscription"),
        }
    }
}

/// Cache entry: the snapshot plus the exact token it was resolved under.
/// A re-check with the identical token inside the TTL is served from here;
/// any other token forces a fresh resolution.
#[derive(Debug, Clone)]
pub struct CachedAccess {
    pub token: String,
    pub status: AccessStatus,
    pub resolved_at: DateTime<Utc>,
}
