// libs/finance-cell/src/router.rs
use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use entitlement_cell::gate::{require_access, EntitlementGate};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{export_ledger, list_ledger, update_payment_status};

pub fn finance_routes(state: Arc<AppConfig>, gate: EntitlementGate) -> Router {
    Router::new()
        .route("/finance/entries", get(list_ledger))
        .route(
            "/finance/entries/{id}/payment-status",
            axum::routing::patch(update_payment_status),
        )
        .route("/finance/export", get(export_ledger))
        .layer(middleware::from_fn_with_state(gate, require_access))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
