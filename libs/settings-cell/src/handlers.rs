// libs/settings-cell/src/handlers.rs
use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::UpdateProfileRequest;
use crate::services::{ProfileService, ThemeCache};

fn parse_user_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user id".to_string()))
}

#[axum::debug_handler]
pub async fn get_branding(
    State(config): State<Arc<AppConfig>>,
    Extension(cache): Extension<ThemeCache>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_user_id(&user)?;
    debug!("Branding request from user {}", user_id);

    let service = ProfileService::new(&config);
    let branding = service
        .branding(user_id, auth.token(), &cache)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "branding": branding })))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(cache): Extension<ThemeCache>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_user_id(&user)?;
    info!("Profile save from user {}", user_id);

    let service = ProfileService::new(&config);
    let branding = service
        .save_profile(user_id, auth.token(), request, &cache)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "success": true, "branding": branding })))
}

#[axum::debug_handler]
pub async fn get_subscription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_user_id(&user)?;
    debug!("Subscription summary request from user {}", user_id);

    let service = ProfileService::new(&config);
    let summary = service
        .subscription(user_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "subscription": summary })))
}
