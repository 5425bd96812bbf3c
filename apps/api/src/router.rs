use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use auth_cell::router::auth_routes;
use catalog_cell::router::catalog_routes;
use entitlement_cell::gate::EntitlementGate;
use entitlement_cell::router::entitlement_routes;
use finance_cell::router::finance_routes;
use insight_cell::router::insight_routes;
use patient_cell::router::patient_routes;
use schedule_cell::router::schedule_routes;
use settings_cell::router::settings_routes;
use shared_config::AppConfig;
use staff_cell::router::staff_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // One gate instance so every cell shares the same access cache.
    let gate = EntitlementGate::new(state.clone());

    Router::new()
        .route("/", get(|| async { "HealthFlow API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/entitlement", entitlement_routes(state.clone(), gate.clone()))
        .merge(schedule_routes(state.clone(), gate.clone()))
        .merge(patient_routes(state.clone(), gate.clone()))
        .merge(staff_routes(state.clone(), gate.clone()))
        .merge(catalog_routes(state.clone(), gate.clone()))
        .merge(insight_routes(state.clone(), gate.clone()))
        .merge(finance_routes(state.clone(), gate.clone()))
        .merge(settings_routes(state, gate))
}
