use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::jwt::validate_token as validate_jwt;

use crate::models::{SignInRequest, SignUpRequest};
use crate::services::account::AccountService;

// Helper function to extract token
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    Ok(auth_value[7..].to_string())
}

#[axum::debug_handler]
pub async fn sign_up(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<SignUpRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Sign-up request for {}", request.email);

    if request.full_name.trim().is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }
    if request.password.len() < 6 {
        return Err(AppError::ValidationError(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let service = AccountService::new(&state);

    let session = service.sign_up(request).await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn sign_in(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Sign-in request for {}", request.email);

    let service = AccountService::new(&state);

    let session = service.sign_in(&request.email, &request.password).await
        .map_err(|e| AppError::Auth(e.to_string()))?;

    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn sign_out(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Sign-out for user: {}", user.id);

    let service = AccountService::new(&state);

    service.sign_out(auth.token()).await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(serde_json::json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match validate_jwt(&token, &config.supabase_jwt_secret) {
        Ok(user) => {
            let response = TokenResponse {
                valid: true,
                user_id: user.id,
                email: user.email,
                role: user.role,
            };

            Ok(Json(response))
        },
        Err(err) => {
            Err(AppError::Auth(err.to_string()))
        }
    }
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let service = AccountService::new(&state);

    let profile = service.get_profile(&user.id, auth.token()).await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(profile))
}
