// libs/catalog-cell/src/services/pricelist.rs
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::tenancy;
use shared_models::domain::Service;

use crate::models::{CatalogError, CreateServiceRequest, UpdateServiceRequest};

pub struct PriceListService {
    supabase: SupabaseClient,
}

impl PriceListService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn require_clinic(&self, user_id: &str, auth_token: &str) -> Result<Uuid, CatalogError> {
        tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?
            .ok_or(CatalogError::TenantNotResolved)
    }

    /// Active services, name-ascending. Retired services stay in the backend
    /// so historic appointments keep their titles and prices.
    pub async fn list(&self, user_id: &str, auth_token: &str) -> Result<Vec<Service>, CatalogError> {
        let clinic_id = tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        let path = match clinic_id {
            Some(clinic) => format!(
                "/rest/v1/services?clinic_id=eq.{}&is_active=eq.true&order=name.asc",
                clinic
            ),
            None => "/rest/v1/services?is_active=eq.true&order=name.asc".to_string(),
        };

        let services: Vec<Service> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        debug!("Fetched {} active services", services.len());
        Ok(services)
    }

    pub async fn create(
        &self,
        user_id: &str,
        request: CreateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, CatalogError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(CatalogError::ValidationError(
                "Service name is required".to_string(),
            ));
        }
        validate_pricing(request.price, request.duration_minutes)?;

        let clinic_id = self.require_clinic(user_id, auth_token).await?;
        info!("Creating service {} in clinic {}", name, clinic_id);

        let payload = json!({
            "clinic_id": clinic_id,
            "name": name,
            "duration_minutes": request.duration_minutes,
            "price": request.price,
            "color": request.color,
            "is_package": request.is_package,
            "is_active": true,
        });

        let rows: Vec<Service> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/services",
                Some(auth_token),
                Some(payload),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| CatalogError::DatabaseError("Insert returned no representation".to_string()))
    }

    pub async fn update(
        &self,
        service_id: Uuid,
        request: UpdateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, CatalogError> {
        // Fields left out of the patch keep their stored values, so only the
        // ones present need to pass validation.
        validate_pricing(request.price.unwrap_or(0.0), request.duration_minutes.unwrap_or(1))?;

        let mut payload = Map::new();
        if let Some(name) = request.name {
            payload.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(duration) = request.duration_minutes {
            payload.insert("duration_minutes".to_string(), json!(duration));
        }
        if let Some(price) = request.price {
            payload.insert("price".to_string(), json!(price));
        }
        if let Some(color) = request.color {
            payload.insert("color".to_string(), json!(color));
        }
        if let Some(is_package) = request.is_package {
            payload.insert("is_package".to_string(), json!(is_package));
        }

        if payload.is_empty() {
            return Err(CatalogError::ValidationError("Nothing to update".to_string()));
        }

        self.patch(service_id, Value::Object(payload), auth_token)
            .await
    }

    pub async fn deactivate(
        &self,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<Service, CatalogError> {
        info!("Deactivating service {}", service_id);
        self.patch(service_id, json!({"is_active": false}), auth_token)
            .await
    }

    async fn patch(
        &self,
        service_id: Uuid,
        payload: Value,
        auth_token: &str,
    ) -> Result<Service, CatalogError> {
        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let rows: Vec<Service> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(payload),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| CatalogError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(CatalogError::NotFound)
    }
}

fn validate_pricing(price: f64, duration_minutes: i64) -> Result<(), CatalogError> {
    if !price.is_finite() || price < 0.0 {
        return Err(CatalogError::ValidationError(
            "Service price must be zero or positive".to_string(),
        ));
    }
    if duration_minutes <= 0 {
        return Err(CatalogError::ValidationError(
            "Service duration must be positive".to_string(),
        ));
    }
    Ok(())
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}
