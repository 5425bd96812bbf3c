// libs/entitlement-cell/src/services/access.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AccessReason, AccessStatus};

/// Resolves whether a user may use the gated product surface.
///
/// Paid standing comes from the `is_subscription_valid` database function;
/// the trial window from the profile row. A failing paid probe never denies
/// by itself: it degrades to the trial check.
pub struct AccessService {
    supabase: SupabaseClient,
}

impl AccessService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn resolve_access(&self, user_id: &str, auth_token: &str) -> Result<AccessStatus> {
        debug!("Resolving access for user: {}", user_id);

        let is_paid = match self
            .supabase
            .rpc::<bool>("is_subscription_valid", Some(auth_token), json!({}))
            .await
        {
            Ok(paid) => paid,
            Err(e) => {
                warn!("Subscription probe failed, falling back to trial check: {}", e);
                false
            }
        };

        let (subscription_status, trial_ends_at) =
            self.fetch_trial_window(user_id, auth_token).await;

        let now = Utc::now();
        let trial_valid = trial_ends_at.map(|end| end > now).unwrap_or(false);
        let has_access = is_paid || trial_valid;

        let reason = if is_paid {
            AccessReason::PaidSubscription
        } else if trial_valid {
            AccessReason::ActiveTrial
        } else if trial_ends_at.is_some() {
            AccessReason::TrialExpired
        } else {
            AccessReason::NoSubscription
        };

        Ok(AccessStatus {
            has_access,
            reason,
            subscription_status,
            trial_ends_at,
            trial_days_left: trial_ends_at.map(|end| trial_days_left(end, now)),
        })
    }

    /// Trial data from the profile row. Fetch problems leave the trial
    /// unknown rather than failing the whole resolution.
    async fn fetch_trial_window(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> (Option<String>, Option<DateTime<Utc>>) {
        let path = format!(
            "/rest/v1/profiles?id=eq.{}&select=subscription_status,trial_ends_at",
            user_id
        );

        let rows: Vec<Value> = match self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Profile fetch failed during access resolution: {}", e);
                return (None, None);
            }
        };

        let Some(profile) = rows.first() else {
            return (None, None);
        };

        let subscription_status = profile["subscription_status"]
            .as_str()
            .map(|s| s.to_string());

        let trial_ends_at = profile["trial_ends_at"]
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        (subscription_status, trial_ends_at)
    }
}

/// Whole days until the trial ends, rounded up, floored at zero.
pub fn trial_days_left(trial_end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    ((trial_end - now).num_seconds() + 86_399).div_euclid(86_400).max(0)
}
