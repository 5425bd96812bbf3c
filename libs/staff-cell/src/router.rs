// libs/staff-cell/src/router.rs
use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use entitlement_cell::gate::{require_access, EntitlementGate};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{
    create_collaborator, deactivate_collaborator, list_collaborators, update_collaborator,
};

pub fn staff_routes(state: Arc<AppConfig>, gate: EntitlementGate) -> Router {
    Router::new()
        .route("/staff", get(list_collaborators).post(create_collaborator))
        .route(
            "/staff/{id}",
            axum::routing::patch(update_collaborator).delete(deactivate_collaborator),
        )
        .layer(middleware::from_fn_with_state(gate, require_access))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
