// libs/catalog-cell/src/router.rs
use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use entitlement_cell::gate::{require_access, EntitlementGate};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{create_service, deactivate_service, list_services, update_service};

pub fn catalog_routes(state: Arc<AppConfig>, gate: EntitlementGate) -> Router {
    Router::new()
        .route("/catalog", get(list_services).post(create_service))
        .route(
            "/catalog/{id}",
            axum::routing::patch(update_service).delete(deactivate_service),
        )
        .layer(middleware::from_fn_with_state(gate, require_access))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
