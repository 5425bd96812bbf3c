// libs/patient-cell/src/handlers.rs
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreatePatientRequest, PatientListQuery, RecordRequest, UpdatePatientRequest,
};
use crate::services::transfer;
use crate::services::{CsvTransferService, PatientDirectoryService, TimelineService};

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Value>, AppError> {
    debug!("Patient list request from user {}", user.id);

    let service = PatientDirectoryService::new(&config);
    let patients = service
        .list(&user.id, auth.token(), query.search.as_deref())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len(),
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Patient {} lookup by user {}", patient_id, user.id);

    let service = PatientDirectoryService::new(&config);
    let patient = service
        .fetch(patient_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({"patient": patient})))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Create patient request from user {}", user.id);

    let service = PatientDirectoryService::new(&config);
    let patient = service
        .create(&user.id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
    })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Update patient {} from user {}", patient_id, user.id);

    let service = PatientDirectoryService::new(&config);
    let patient = service
        .update(patient_id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
    })))
}

/// Delete is a soft flip of `is_active`; the row never leaves the backend.
#[axum::debug_handler]
pub async fn deactivate_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Deactivate patient {} from user {}", patient_id, user.id);

    let service = PatientDirectoryService::new(&config);
    let patient = service
        .deactivate(patient_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
    })))
}

#[axum::debug_handler]
pub async fn patient_timeline(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Timeline for patient {} requested by user {}", patient_id, user.id);

    let service = TimelineService::new(&config);
    let timeline = service
        .fetch(patient_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "timeline": timeline,
        "total": timeline.len(),
    })))
}

#[axum::debug_handler]
pub async fn create_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<RecordRequest>,
) -> Result<Json<Value>, AppError> {
    info!("New clinical note for patient {} from user {}", patient_id, user.id);

    let service = TimelineService::new(&config);
    let record = service
        .create_record(patient_id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "record": record,
    })))
}

#[axum::debug_handler]
pub async fn update_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(record_id): Path<Uuid>,
    Json(request): Json<RecordRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Update clinical note {} from user {}", record_id, user.id);

    let service = TimelineService::new(&config);
    let record = service
        .update_record(record_id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "record": record,
    })))
}

#[axum::debug_handler]
pub async fn export_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Response, AppError> {
    info!("Patient CSV export requested by user {}", user.id);

    let service = CsvTransferService::new(&config);
    let bytes = service
        .export(&user.id, auth.token())
        .await
        .map_err(AppError::from)?;

    let filename = transfer::export_filename(Utc::now().date_naive());
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];

    Ok((headers, bytes).into_response())
}

#[axum::debug_handler]
pub async fn import_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    info!("Patient CSV import from user {}", user.id);

    let service = CsvTransferService::new(&config);
    let report = service
        .import(&user.id, &body, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "inserted": report.inserted,
        "skipped": report.skipped,
    })))
}
