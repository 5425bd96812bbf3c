use std::sync::Arc;

use axum::{
    Extension,
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::gate::EntitlementGate;
use crate::handlers;

pub fn entitlement_routes(state: Arc<AppConfig>, gate: EntitlementGate) -> Router {
    let protected_routes = Router::new()
        .route("/access", get(handlers::get_access))
        .route("/refresh", post(handlers::refresh_access))
        .layer(Extension(gate))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
