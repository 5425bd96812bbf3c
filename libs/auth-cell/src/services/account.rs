// libs/auth-cell/src/services/account.rs
use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::text::digits_only;

use crate::models::SignUpRequest;

/// Account flows against the hosted auth service. Clinic, owner profile and
/// the trial subscription are provisioned backend-side on sign-up; this
/// service only shapes the metadata blob the trigger consumes.
pub struct AccountService {
    supabase: SupabaseClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<Value> {
        debug!("Signing up new account for {}", request.email);

        let clinic_name = match request.clinic_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format!("{}'s Clinic", request.full_name.trim()),
        };

        let metadata = json!({
            "full_name": request.full_name.trim(),
            "role": request.specialty.to_string(),
            "clinic_name": clinic_name,
            "phone": request.phone.as_deref().map(digits_only),
            "cpf": request.cpf.as_deref().map(digits_only),
        });

        let body = json!({
            "email": request.email.trim(),
            "password": request.password,
            "data": metadata,
        });

        self.supabase
            .request(Method::POST, "/auth/v1/signup", None, Some(body))
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Value> {
        debug!("Password sign-in for {}", email);

        let body = json!({
            "email": email.trim(),
            "password": password,
        });

        self.supabase
            .request(
                Method::POST,
                "/auth/v1/token?grant_type=password",
                None,
                Some(body),
            )
            .await
    }

    pub async fn sign_out(&self, auth_token: &str) -> Result<()> {
        debug!("Signing out current session");

        self.supabase
            .request_empty(Method::POST, "/auth/v1/logout", Some(auth_token), None)
            .await
    }

    /// Current user joined with their profile row.
    pub async fn get_profile(&self, user_id: &str, auth_token: &str) -> Result<Value> {
        debug!("Fetching profile for user: {}", user_id);

        let auth_user = self.supabase.get_user(auth_token).await?;

        let path = format!("/rest/v1/profiles?id=eq.{}", user_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let profile = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Profile not found"))?;

        Ok(json!({
            "user": auth_user,
            "profile": profile,
        }))
    }
}
