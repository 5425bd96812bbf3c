// libs/patient-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use entitlement_cell::gate::{require_access, EntitlementGate};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{
    create_patient, create_record, deactivate_patient, export_patients, get_patient,
    import_patients, list_patients, patient_timeline, update_patient, update_record,
};

pub fn patient_routes(state: Arc<AppConfig>, gate: EntitlementGate) -> Router {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/export", get(export_patients))
        .route("/patients/import", post(import_patients))
        .route(
            "/patients/{id}",
            get(get_patient).patch(update_patient).delete(deactivate_patient),
        )
        .route("/patients/{id}/timeline", get(patient_timeline))
        .route("/patients/{id}/records", post(create_record))
        .route("/patients/records/{id}", patch(update_record))
        .layer(middleware::from_fn_with_state(gate, require_access))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
