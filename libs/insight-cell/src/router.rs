// libs/insight-cell/src/router.rs
use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use entitlement_cell::gate::{require_access, EntitlementGate};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::dashboard;

pub fn insight_routes(state: Arc<AppConfig>, gate: EntitlementGate) -> Router {
    Router::new()
        .route("/insights/dashboard", get(dashboard))
        .layer(middleware::from_fn_with_state(gate, require_access))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
