// libs/staff-cell/src/services/roster.rs
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::tenancy;
use shared_models::domain::Collaborator;
use shared_utils::text::generated_avatar_url;

use crate::models::{CreateCollaboratorRequest, StaffError, UpdateCollaboratorRequest};

pub struct RosterService {
    supabase: SupabaseClient,
}

impl RosterService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn require_clinic(&self, user_id: &str, auth_token: &str) -> Result<Uuid, StaffError> {
        tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| StaffError::DatabaseError(e.to_string()))?
            .ok_or(StaffError::TenantNotResolved)
    }

    /// Active collaborators, name-ascending. Deactivated staff never leave
    /// the backend but are filtered on every read.
    pub async fn list(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Collaborator>, StaffError> {
        let clinic_id = tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| StaffError::DatabaseError(e.to_string()))?;

        let path = match clinic_id {
            Some(clinic) => format!(
                "/rest/v1/collaborators?clinic_id=eq.{}&is_active=eq.true&order=name.asc",
                clinic
            ),
            None => "/rest/v1/collaborators?is_active=eq.true&order=name.asc".to_string(),
        };

        let collaborators: Vec<Collaborator> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| StaffError::DatabaseError(e.to_string()))?;

        debug!("Fetched {} active collaborators", collaborators.len());
        Ok(collaborators)
    }

    pub async fn create(
        &self,
        user_id: &str,
        request: CreateCollaboratorRequest,
        auth_token: &str,
    ) -> Result<Collaborator, StaffError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(StaffError::ValidationError(
                "Collaborator name is required".to_string(),
            ));
        }

        let clinic_id = self.require_clinic(user_id, auth_token).await?;
        info!("Creating collaborator {} in clinic {}", name, clinic_id);

        let avatar_url = request
            .avatar_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| generated_avatar_url(name));

        let payload = json!({
            "clinic_id": clinic_id,
            "name": name,
            "role": request.role,
            "color": request.color,
            "avatar_url": avatar_url,
            "is_active": true,
        });

        let rows: Vec<Collaborator> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/collaborators",
                Some(auth_token),
                Some(payload),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| StaffError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StaffError::DatabaseError("Insert returned no representation".to_string()))
    }

    pub async fn update(
        &self,
        collaborator_id: Uuid,
        request: UpdateCollaboratorRequest,
        auth_token: &str,
    ) -> Result<Collaborator, StaffError> {
        let mut payload = Map::new();
        if let Some(name) = request.name {
            payload.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(role) = request.role {
            payload.insert("role".to_string(), json!(role));
        }
        if let Some(color) = request.color {
            payload.insert("color".to_string(), json!(color));
        }
        if let Some(avatar_url) = request.avatar_url {
            payload.insert("avatar_url".to_string(), json!(avatar_url));
        }

        if payload.is_empty() {
            return Err(StaffError::ValidationError("Nothing to update".to_string()));
        }

        self.patch(collaborator_id, Value::Object(payload), auth_token)
            .await
    }

    pub async fn deactivate(
        &self,
        collaborator_id: Uuid,
        auth_token: &str,
    ) -> Result<Collaborator, StaffError> {
        info!("Deactivating collaborator {}", collaborator_id);
        self.patch(collaborator_id, json!({"is_active": false}), auth_token)
            .await
    }

    async fn patch(
        &self,
        collaborator_id: Uuid,
        payload: Value,
        auth_token: &str,
    ) -> Result<Collaborator, StaffError> {
        let path = format!("/rest/v1/collaborators?id=eq.{}", collaborator_id);
        let rows: Vec<Collaborator> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(payload),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| StaffError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(StaffError::NotFound)
    }
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}
