use axum::{
    extract::Extension,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::gate::EntitlementGate;

/// Current access snapshot. The client keeps its loading state until this
/// resolves, then shows either the product or the lock view.
#[axum::debug_handler]
pub async fn get_access(
    Extension(gate): Extension<EntitlementGate>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Access check for user: {}", user.id);

    let status = gate.check(&user.id, auth.token()).await?;

    Ok(Json(json!(status)))
}

/// Drop the cached snapshot and re-resolve. The explicit invalidation path
/// for after a plan change.
#[axum::debug_handler]
pub async fn refresh_access(
    Extension(gate): Extension<EntitlementGate>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Access refresh for user: {}", user.id);

    gate.cache().invalidate(&user.id).await;
    let status = gate.check(&user.id, auth.token()).await?;

    Ok(Json(json!(status)))
}
