// libs/catalog-cell/src/handlers.rs
use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateServiceRequest, UpdateServiceRequest};
use crate::services::PriceListService;

#[axum::debug_handler]
pub async fn list_services(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Service catalog request from user {}", user.id);

    let service = PriceListService::new(&config);
    let services = service
        .list(&user.id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "services": services,
        "total": services.len(),
    })))
}

#[axum::debug_handler]
pub async fn create_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Create service request from user {}", user.id);

    let service = PriceListService::new(&config);
    let created = service
        .create(&user.id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "service": created,
    })))
}

#[axum::debug_handler]
pub async fn update_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(service_id): Path<Uuid>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Update service {} from user {}", service_id, user.id);

    let service = PriceListService::new(&config);
    let updated = service
        .update(service_id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "service": updated,
    })))
}

#[axum::debug_handler]
pub async fn deactivate_service(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Deactivate service {} from user {}", service_id, user.id);

    let service = PriceListService::new(&config);
    let retired = service
        .deactivate(service_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "service": retired,
    })))
}
