// libs/insight-cell/src/handlers.rs
use std::sync::Arc;

use axum::extract::{Extension, Query, State};
use axum::Json;
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{DashboardQuery, InsightError, RangeKind};
use crate::services::DashboardService;

#[axum::debug_handler]
pub async fn dashboard(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Value>, AppError> {
    let token = query.range.as_deref().unwrap_or("today");
    let kind = RangeKind::from_token(token)
        .ok_or_else(|| AppError::from(InsightError::UnknownRange(token.to_string())))?;

    debug!("Dashboard request from user {} for range {}", user.id, token);

    let service = DashboardService::new(&config);
    let report = service
        .report(&user.id, auth.token(), kind, query.date, Utc::now().date_naive())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "dashboard": report })))
}
