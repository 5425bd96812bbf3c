// libs/staff-cell/src/handlers.rs
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

use crate::models::{CreateCollaboratorRequest, UpdateCollaboratorRequest};
use crate::services::RosterService;

#[axum::debug_handler]
pub async fn list_collaborators(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Collaborator list request from user {}", user.id);

    let service = RosterService::new(&config);
    let collaborators = service
        .list(&user.id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "collaborators": collaborators,
        "total": collaborators.len(),
    })))
}

#[axum::debug_handler]
pub async fn create_collaborator(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateCollaboratorRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Create collaborator request from user {}", user.id);

    let service = RosterService::new(&config);
    let collaborator = service
        .create(&user.id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "collaborator": collaborator,
    })))
}

#[axum::debug_handler]
pub async fn update_collaborator(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(collaborator_id): Path<Uuid>,
    Json(request): Json<UpdateCollaboratorRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Update collaborator {} from user {}", collaborator_id, user.id);

    let service = RosterService::new(&config);
    let collaborator = service
        .update(collaborator_id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "collaborator": collaborator,
    })))
}

#[axum::debug_handler]
pub async fn deactivate_collaborator(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(collaborator_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Deactivate collaborator {} from user {}", collaborator_id, user.id);

    let service = RosterService::new(&config);
    let collaborator = service
        .deactivate(collaborator_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "collaborator": collaborator,
    })))
}
