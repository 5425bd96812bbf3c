// libs/settings-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, put},
    Extension, Router,
};
use std::sync::Arc;

use entitlement_cell::gate::{require_access, EntitlementGate};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{get_branding, get_subscription, update_profile};
use crate::services::ThemeCache;

pub fn settings_routes(state: Arc<AppConfig>, gate: EntitlementGate) -> Router {
    let cache = ThemeCache::new();

    Router::new()
        .route("/settings/branding", get(get_branding))
        .route("/settings/profile", put(update_profile))
        .route("/settings/subscription", get(get_subscription))
        .layer(Extension(cache))
        .layer(middleware::from_fn_with_state(gate, require_access))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
