// libs/schedule-cell/src/handlers.rs
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Extension, Path, Query, State};
use axum::response::Json;
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::authorization::Bearer;
use headers::Authorization;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::domain::AppointmentStatus;
use shared_models::error::AppError;

use crate::models::{
    AgendaFilter, AgendaMode, AgendaQuery, ChangeEvent, CreateAppointmentRequest,
    QuickPatientRequest, UpdateAppointmentRequest,
};
use crate::services::agenda::{
    self, day_column, history_entries, month_cells, week_columns, year_overview, AgendaService,
};
use crate::services::booking::BookingService;
use crate::services::feed::ChangeFeedHub;
use crate::services::store::ScheduleStore;

/// How long a feed subscriber is parked before being told to poll again.
const FEED_POLL_TIMEOUT: Duration = Duration::from_secs(25);

#[axum::debug_handler]
pub async fn get_agenda(
    State(config): State<Arc<AppConfig>>,
    Extension(store): Extension<ScheduleStore>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AgendaQuery>,
) -> Result<Json<Value>, AppError> {
    debug!("Agenda {:?} request from user {}", query.mode, user.id);

    let service = AgendaService::new(&config);
    let snapshot = service
        .load_snapshot(&user.id, auth.token(), &store)
        .await
        .map_err(AppError::from)?;

    let names = agenda::patient_names(&snapshot.patients);
    let filter = AgendaFilter {
        search: query.search.clone(),
        collaborator_id: query.collaborator_id,
        status: query.status,
        range: None,
    };
    let filtered = agenda::filter_appointments(&snapshot.appointments, &filter, &names);
    let reference = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let view = match query.mode {
        AgendaMode::Day => json!({"days": [day_column(reference, &filtered)]}),
        AgendaMode::Week => json!({"days": week_columns(reference, &filtered)}),
        AgendaMode::Month => json!({"cells": month_cells(reference, &filtered)}),
        AgendaMode::Year => json!({"months": year_overview(reference, &filtered)}),
        AgendaMode::History => json!({"entries": history_entries(&filtered, Utc::now())}),
    };

    let mut body = json!({
        "mode": query.mode,
        "reference_date": reference,
        "ticket": snapshot.ticket,
        "patients": snapshot.patients,
        "services": snapshot.services,
        "collaborators": snapshot.collaborators,
    });
    if let (Some(body), Some(view)) = (body.as_object_mut(), view.as_object()) {
        for (key, value) in view {
            body.insert(key.clone(), value.clone());
        }
    }

    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Appointment {} lookup by user {}", appointment_id, user.id);

    let booking = BookingService::new(&config);
    let appointment = booking
        .fetch_by_id(appointment_id, auth.token())
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    Ok(Json(json!({"appointment": appointment})))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(store): Extension<ScheduleStore>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Create appointment request from user {}", user.id);

    let booking = BookingService::new(&config);
    // A failed insert leaves the cache untouched; there is no row to
    // reconcile until the backend has assigned an id.
    let appointment = booking
        .create(&user.id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    store.merge(appointment.clinic_id, appointment.clone()).await;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(store): Extension<ScheduleStore>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Update appointment {} from user {}", appointment_id, user.id);

    let booking = BookingService::new(&config);
    match booking
        .update(&user.id, appointment_id, request, auth.token())
        .await
    {
        Ok(appointment) => {
            store.merge(appointment.clinic_id, appointment.clone()).await;
            Ok(Json(json!({
                "success": true,
                "appointment": appointment,
            })))
        }
        Err(e) => {
            booking
                .reconcile_after_failure(&store, appointment_id, auth.token())
                .await;
            Err(AppError::from(e))
        }
    }
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(store): Extension<ScheduleStore>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Cancel appointment {} from user {}", appointment_id, user.id);

    // Optimistic flip; the compensating refetch below restores the truth if
    // the backend refuses the write.
    store
        .set_status(appointment_id, AppointmentStatus::Canceled)
        .await;

    let booking = BookingService::new(&config);
    match booking.cancel(appointment_id, auth.token()).await {
        Ok(appointment) => {
            store.merge(appointment.clinic_id, appointment.clone()).await;
            Ok(Json(json!({
                "success": true,
                "appointment": appointment,
            })))
        }
        Err(e) => {
            booking
                .reconcile_after_failure(&store, appointment_id, auth.token())
                .await;
            Err(AppError::from(e))
        }
    }
}

#[axum::debug_handler]
pub async fn create_quick_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<QuickPatientRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Quick patient creation from user {}", user.id);

    let booking = BookingService::new(&config);
    let patient = booking
        .create_quick_patient(&user.id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
    })))
}

/// Row-change ingest from the hosted backend. Any appointment change drops
/// the clinic's cached snapshot and tells live subscribers to refetch.
#[axum::debug_handler]
pub async fn ingest_change(
    State(_config): State<Arc<AppConfig>>,
    Extension(store): Extension<ScheduleStore>,
    Extension(hub): Extension<ChangeFeedHub>,
    Json(event): Json<ChangeEvent>,
) -> Result<Json<Value>, AppError> {
    if event.table != "appointments" {
        debug!("Ignoring change event for table {}", event.table);
        return Ok(Json(json!({"ignored": true})));
    }

    let Some(clinic_id) = event.clinic_id() else {
        warn!("Appointment change event without a clinic id");
        return Ok(Json(json!({"ignored": true})));
    };

    store.invalidate(clinic_id).await;
    let notified = hub.publish(clinic_id, event).await;
    debug!(
        "Change event for clinic {} fanned out to {} subscribers",
        clinic_id, notified
    );

    Ok(Json(json!({
        "success": true,
        "subscribers_notified": notified,
    })))
}

/// Long-poll subscription to the clinic's change feed. The response never
/// carries a diff to apply, only whether a full snapshot refetch is due.
#[axum::debug_handler]
pub async fn subscribe_feed(
    State(config): State<Arc<AppConfig>>,
    Extension(hub): Extension<ChangeFeedHub>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let supabase = SupabaseClient::new(&config);
    let clinic_id = shared_database::tenancy::resolve_clinic_id(&supabase, &user.id, auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| {
            AppError::PreconditionFailed(
                "Tenant not resolved yet. Wait for your profile to load and try again.".to_string(),
            )
        })?;

    let mut receiver = hub.subscribe(clinic_id).await;

    match tokio::time::timeout(FEED_POLL_TIMEOUT, receiver.recv()).await {
        Ok(Ok(event)) => Ok(Json(json!({
            "action": "refetch",
            "event": event,
        }))),
        // Falling behind the channel means missed events, which is exactly
        // when a refetch is due.
        Ok(Err(RecvError::Lagged(_))) => Ok(Json(json!({"action": "refetch"}))),
        Ok(Err(RecvError::Closed)) | Err(_) => Ok(Json(json!({"action": "none"}))),
    }
}
