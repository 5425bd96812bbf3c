// libs/settings-cell/src/services/profile.rs
use chrono::{DateTime, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use entitlement_cell::services::access::trial_days_left;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::text::digits_only;

use crate::models::{Branding, SettingsError, SubscriptionSummary, UpdateProfileRequest};
use crate::services::theme::ThemeCache;

pub const DEFAULT_CLINIC_NAME: &str = "HealthFlow";
pub const DEFAULT_BRAND_COLOR: &str = "#0ea5e9";

const PLAN_NAME: &str = "HealthFlow Pro";

#[derive(Debug, Default, Deserialize)]
struct BrandingRow {
    #[serde(default)]
    clinic_id: Option<Uuid>,
    #[serde(default)]
    clinic_name: Option<String>,
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default)]
    brand_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClinicNameRow {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PlanRow {
    #[serde(default)]
    subscription_status: Option<String>,
    #[serde(default)]
    trial_ends_at: Option<DateTime<Utc>>,
}

/// Owns the profile row behind the settings screens: the branding blob, the
/// profile save (with its clinic rename side effect), and the plan summary.
pub struct ProfileService {
    supabase: SupabaseClient,
}

impl ProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Branding blob for the account, served from the cache when warm.
    pub async fn branding(
        &self,
        user_id: Uuid,
        auth_token: &str,
        cache: &ThemeCache,
    ) -> Result<Branding, SettingsError> {
        if let Some(hit) = cache.get(user_id).await {
            debug!("Branding cache hit for user {}", user_id);
            return Ok(hit);
        }

        let path = format!(
            "/rest/v1/profiles?id=eq.{}&select=clinic_id,clinic_name,logo_url,brand_color",
            user_id
        );
        let rows: Vec<BrandingRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SettingsError::DatabaseError(e.to_string()))?;

        let row = rows.into_iter().next().unwrap_or_default();
        let branding = self.branding_from_row(row, user_id, auth_token).await;

        cache.put(user_id, branding.clone()).await;
        Ok(branding)
    }

    /// Upsert the profile row, keep the clinics row's display name in step,
    /// then evict the cached branding and notify subscribers.
    pub async fn save_profile(
        &self,
        user_id: Uuid,
        auth_token: &str,
        request: UpdateProfileRequest,
        cache: &ThemeCache,
    ) -> Result<Branding, SettingsError> {
        let full_name = request.full_name.trim();
        if full_name.is_empty() {
            return Err(SettingsError::ValidationError(
                "Full name is required".to_string(),
            ));
        }
        let brand_color = normalize_brand_color(request.brand_color.as_deref())?;
        let clinic_name = request.clinic_name.trim().to_string();

        let payload = json!({
            "id": user_id,
            "full_name": full_name,
            "clinic_name": clinic_name,
            "phone": request.phone.as_deref().map(digits_only),
            "cpf": request.cpf.as_deref().map(digits_only),
            "avatar_url": request.avatar_url,
            "brand_color": brand_color,
            "logo_url": request.logo_url,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<BrandingRow> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/profiles?on_conflict=id",
                Some(auth_token),
                Some(payload),
                Some(upsert_headers()),
            )
            .await
            .map_err(|e| SettingsError::DatabaseError(e.to_string()))?;
        let stored = rows.into_iter().next().ok_or(SettingsError::ProfileNotFound)?;

        self.rename_clinic(stored.clinic_id, user_id, &clinic_name, auth_token)
            .await;

        let listeners = cache.invalidate(user_id).await;
        debug!(
            "Branding invalidated for user {} ({} listeners notified)",
            user_id, listeners
        );

        Ok(self.branding_from_row(stored, user_id, auth_token).await)
    }

    /// Plan summary for the subscription card.
    pub async fn subscription(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<SubscriptionSummary, SettingsError> {
        let path = format!(
            "/rest/v1/profiles?id=eq.{}&select=subscription_status,trial_ends_at",
            user_id
        );
        let rows: Vec<PlanRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SettingsError::DatabaseError(e.to_string()))?;

        let row = rows.into_iter().next().unwrap_or_default();
        Ok(plan_summary(row, Utc::now()))
    }

    async fn branding_from_row(
        &self,
        row: BrandingRow,
        user_id: Uuid,
        auth_token: &str,
    ) -> Branding {
        let clinic_name = match non_empty(row.clinic_name.as_deref()) {
            Some(name) => name.to_string(),
            None => self.clinic_row_name(row.clinic_id, user_id, auth_token).await,
        };

        Branding {
            clinic_name,
            logo_url: row.logo_url.filter(|url| !url.is_empty()),
            brand_color: non_empty(row.brand_color.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_BRAND_COLOR.to_string()),
        }
    }

    /// Clinic display name straight from the clinics table, used when the
    /// profile carries none. Missing rows and fetch failures fall back to
    /// the product default rather than failing the branding read.
    async fn clinic_row_name(
        &self,
        clinic_id: Option<Uuid>,
        user_id: Uuid,
        auth_token: &str,
    ) -> String {
        let target = clinic_id.unwrap_or(user_id);
        let path = format!("/rest/v1/clinics?id=eq.{}&select=name", target);

        let rows: Vec<ClinicNameRow> = match self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Clinic name fetch failed for {}: {}", target, e);
                return DEFAULT_CLINIC_NAME.to_string();
            }
        };

        rows.into_iter()
            .next()
            .and_then(|row| row.name)
            .and_then(|name| display_clinic_name(&name))
            .unwrap_or_else(|| DEFAULT_CLINIC_NAME.to_string())
    }

    /// Failures here are logged and swallowed: the profile save already
    /// succeeded, and branding reads prefer the profile value anyway.
    async fn rename_clinic(
        &self,
        clinic_id: Option<Uuid>,
        user_id: Uuid,
        name: &str,
        auth_token: &str,
    ) {
        if name.is_empty() {
            return;
        }

        let target = clinic_id.unwrap_or(user_id);
        let path = format!("/rest/v1/clinics?id=eq.{}", target);
        if let Err(e) = self
            .supabase
            .request_empty(Method::PATCH, &path, Some(auth_token), Some(json!({ "name": name })))
            .await
        {
            warn!("Clinic rename failed for {}: {}", target, e);
        }
    }
}

fn upsert_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Prefer",
        HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
    );
    headers
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Clinic rows created by early sign-up flows sometimes carry the owner's
/// e-mail address as the name. Those are cut down to the part before the
/// '@', then before any dot in it; names without an '@' pass through.
pub fn display_clinic_name(raw: &str) -> Option<String> {
    let mut cleaned = raw;
    if let Some((local, _)) = cleaned.split_once('@') {
        cleaned = local;
        if let Some((head, _)) = cleaned.split_once('.') {
            cleaned = head;
        }
    }

    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Brand colors come from a fixed palette or a free-form color input; either
/// way they must be hex like `#0ea5e9`. Missing values fall back to the
/// default accent.
fn normalize_brand_color(raw: Option<&str>) -> Result<String, SettingsError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_BRAND_COLOR.to_string());
    };

    let digits = value
        .strip_prefix('#')
        .filter(|rest| rest.len() == 3 || rest.len() == 6)
        .filter(|rest| rest.chars().all(|c| c.is_ascii_hexdigit()));
    match digits {
        Some(_) => Ok(value.to_ascii_lowercase()),
        None => Err(SettingsError::ValidationError(format!(
            "Invalid brand color: {}",
            value
        ))),
    }
}

/// Days remaining round up, so a trial expiring later today still reads as
/// one day. Accounts without a trial window show zero and no billing date.
fn plan_summary(row: PlanRow, now: DateTime<Utc>) -> SubscriptionSummary {
    let status = row
        .subscription_status
        .unwrap_or_else(|| "trial".to_string());
    let status_label = if status == "trial" { "Trial period" } else { "Active" };

    SubscriptionSummary {
        plan: PLAN_NAME.to_string(),
        subscription_status: status,
        status_label: status_label.to_string(),
        days_remaining: row
            .trial_ends_at
            .map(|end| trial_days_left(end, now))
            .unwrap_or(0),
        next_billing_date: row
            .trial_ends_at
            .map(|end| end.format("%d/%m/%Y").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn email_ish_clinic_names_lose_their_suffixes() {
        assert_eq!(
            display_clinic_name("bellavita@gmail.com"),
            Some("bellavita".to_string())
        );
        assert_eq!(
            display_clinic_name("dra.ana@clinic.com"),
            Some("dra".to_string())
        );
        assert_eq!(display_clinic_name("@gmail.com"), None);
        assert_eq!(display_clinic_name("   "), None);
    }

    #[test]
    fn dots_survive_when_the_name_is_not_an_email() {
        assert_eq!(
            display_clinic_name("Dr. Silva Clinic"),
            Some("Dr. Silva Clinic".to_string())
        );
    }

    #[test]
    fn brand_colors_must_be_hex() {
        assert_eq!(
            normalize_brand_color(Some("#0EA5E9")).unwrap(),
            "#0ea5e9"
        );
        assert_eq!(normalize_brand_color(Some("#abc")).unwrap(), "#abc");
        assert_eq!(normalize_brand_color(None).unwrap(), DEFAULT_BRAND_COLOR);
        assert_eq!(normalize_brand_color(Some("  ")).unwrap(), DEFAULT_BRAND_COLOR);

        assert!(normalize_brand_color(Some("blue")).is_err());
        assert!(normalize_brand_color(Some("#12345")).is_err());
        assert!(normalize_brand_color(Some("#gggggg")).is_err());
    }

    #[test]
    fn plan_summary_rounds_trial_days_up() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let row = PlanRow {
            subscription_status: None,
            trial_ends_at: Some(Utc.with_ymd_and_hms(2024, 3, 17, 0, 0, 0).unwrap()),
        };

        let summary = plan_summary(row, now);
        assert_eq!(summary.plan, "HealthFlow Pro");
        assert_eq!(summary.subscription_status, "trial");
        assert_eq!(summary.status_label, "Trial period");
        assert_eq!(summary.days_remaining, 2);
        assert_eq!(summary.next_billing_date.as_deref(), Some("17/03/2024"));
    }

    #[test]
    fn expired_trials_report_zero_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let row = PlanRow {
            subscription_status: Some("active".to_string()),
            trial_ends_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
        };

        let summary = plan_summary(row, now);
        assert_eq!(summary.status_label, "Active");
        assert_eq!(summary.days_remaining, 0);
    }

    #[test]
    fn accounts_without_a_trial_window_show_no_billing_date() {
        let summary = plan_summary(PlanRow::default(), Utc::now());
        assert_eq!(summary.days_remaining, 0);
        assert_eq!(summary.next_billing_date, None);
    }
}
