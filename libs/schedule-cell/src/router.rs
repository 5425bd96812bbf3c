// libs/schedule-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

use entitlement_cell::gate::{require_access, EntitlementGate};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{
    cancel_appointment, create_appointment, create_quick_patient, get_agenda, get_appointment,
    ingest_change, subscribe_feed, update_appointment,
};
use crate::services::{ChangeFeedHub, ScheduleStore};

pub fn schedule_routes(state: Arc<AppConfig>, gate: EntitlementGate) -> Router {
    let store = ScheduleStore::new();
    let hub = ChangeFeedHub::new();

    let protected = Router::new()
        .route("/schedule/agenda", get(get_agenda))
        .route("/schedule/appointments", post(create_appointment))
        .route(
            "/schedule/appointments/{id}",
            get(get_appointment).patch(update_appointment),
        )
        .route("/schedule/appointments/{id}/cancel", post(cancel_appointment))
        .route("/schedule/patients/quick", post(create_quick_patient))
        .route("/schedule/feed", get(subscribe_feed))
        .layer(Extension(store.clone()))
        .layer(Extension(hub.clone()))
        .layer(middleware::from_fn_with_state(gate.clone(), require_access))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Change ingest is called by the backend with a service token; it is
    // authenticated but not entitlement-gated.
    let ingest = Router::new()
        .route("/schedule/events", post(ingest_change))
        .layer(Extension(store))
        .layer(Extension(hub))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected).merge(ingest).with_state(state)
}
