// libs/shared/database/src/tenancy.rs
use anyhow::Result;
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::supabase::SupabaseClient;

#[derive(Debug, Deserialize)]
struct ProfileClinicRow {
    clinic_id: Option<Uuid>,
}

/// Clinic the caller's profile is bound to, if the profile row exists and has
/// one. Write paths treat `None` as a hard precondition failure; read paths
/// fall back to policy-scoped unfiltered queries.
pub async fn resolve_clinic_id(
    supabase: &SupabaseClient,
    user_id: &str,
    auth_token: &str,
) -> Result<Option<Uuid>> {
    let path = format!("/rest/v1/profiles?id=eq.{}&select=clinic_id", user_id);
    let rows: Vec<ProfileClinicRow> = supabase
        .request(Method::GET, &path, Some(auth_token), None)
        .await?;

    let clinic_id = rows.into_iter().next().and_then(|row| row.clinic_id);
    debug!("Resolved clinic {:?} for user {}", clinic_id, user_id);
    Ok(clinic_id)
}
