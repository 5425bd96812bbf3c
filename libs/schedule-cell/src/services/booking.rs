// libs/schedule-cell/src/services/booking.rs
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::tenancy;
use shared_models::domain::{Appointment, AppointmentRow, AppointmentStatus, Patient};
use shared_utils::text::{digits_only, generated_avatar_url};

use crate::models::{CreateAppointmentRequest, QuickPatientRequest, ScheduleError, UpdateAppointmentRequest};
use crate::services::lifecycle::LifecycleService;
use crate::services::store::ScheduleStore;

#[derive(Debug, Deserialize)]
struct ServicePriceRow {
    #[allow(dead_code)]
    id: Uuid,
    #[serde(default)]
    price: f64,
}

pub struct BookingService {
    supabase: SupabaseClient,
    lifecycle: LifecycleService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            lifecycle: LifecycleService::new(),
        }
    }

    /// Writes hard-require a resolved tenant; there is no queueing or retry.
    async fn require_clinic(&self, user_id: &str, auth_token: &str) -> Result<Uuid, ScheduleError> {
        tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?
            .ok_or(ScheduleError::TenantNotResolved)
    }

    /// Price is always derived server-side from the catalog at write time,
    /// never taken from the client.
    pub async fn derive_price(
        &self,
        clinic_id: Uuid,
        service_ids: &[Uuid],
        auth_token: &str,
    ) -> Result<f64, ScheduleError> {
        if service_ids.is_empty() {
            return Ok(0.0);
        }

        let ids = service_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/services?clinic_id=eq.{}&id=in.({})&is_active=eq.true&select=id,price",
            clinic_id, ids
        );

        let rows: Vec<ServicePriceRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        Ok(rows.iter().map(|row| row.price).sum())
    }

    pub async fn create(
        &self,
        user_id: &str,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        info!("Booking appointment for patient {}", request.patient_id);

        let clinic_id = self.require_clinic(user_id, auth_token).await?;
        let (start, end) = build_window(request.date, &request.start_time, &request.end_time)?;
        let price = self
            .derive_price(clinic_id, &request.service_ids, auth_token)
            .await?;

        let payload = json!({
            "clinic_id": clinic_id,
            "patient_id": request.patient_id,
            "collaborator_id": request.collaborator_id,
            "service_ids": request.service_ids,
            "start_time": start.to_rfc3339(),
            "end_time": end.to_rfc3339(),
            "status": AppointmentStatus::Pending.to_string(),
            "price": price,
            "location": request.location.to_string(),
            "notes": request.notes,
            "source": "app",
        });

        let rows: Vec<AppointmentRow> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(payload),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        let appointment = rows
            .into_iter()
            .next()
            .and_then(Appointment::from_row)
            .ok_or_else(|| {
                ScheduleError::DatabaseError("Insert returned no representation".to_string())
            })?;

        info!("Appointment {} booked", appointment.id);
        Ok(appointment)
    }

    pub async fn update(
        &self,
        user_id: &str,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        debug!("Updating appointment {}", appointment_id);

        let clinic_id = self.require_clinic(user_id, auth_token).await?;
        let current = self
            .fetch_by_id(appointment_id, auth_token)
            .await?
            .ok_or(ScheduleError::NotFound)?;

        if let Some(next_status) = request.status {
            self.lifecycle
                .validate_transition(current.status, next_status)?;
        }

        let mut payload = Map::new();
        if let Some(patient_id) = request.patient_id {
            payload.insert("patient_id".to_string(), json!(patient_id));
        }
        if let Some(collaborator_id) = request.collaborator_id {
            payload.insert("collaborator_id".to_string(), json!(collaborator_id));
        }
        if let Some(service_ids) = &request.service_ids {
            payload.insert("service_ids".to_string(), json!(service_ids));
            let price = self.derive_price(clinic_id, service_ids, auth_token).await?;
            payload.insert("price".to_string(), json!(price));
        }
        if request.date.is_some() || request.start_time.is_some() || request.end_time.is_some() {
            let date = request.date.unwrap_or_else(|| current.local_date());
            let start_clock = request
                .start_time
                .clone()
                .unwrap_or_else(|| current.start.format("%H:%M").to_string());
            let end_clock = request
                .end_time
                .clone()
                .unwrap_or_else(|| current.end.format("%H:%M").to_string());
            let (start, end) = build_window(date, &start_clock, &end_clock)?;
            payload.insert("start_time".to_string(), json!(start.to_rfc3339()));
            payload.insert("end_time".to_string(), json!(end.to_rfc3339()));
        }
        if let Some(status) = request.status {
            payload.insert("status".to_string(), json!(status.to_string()));
        }
        if let Some(location) = request.location {
            payload.insert("location".to_string(), json!(location.to_string()));
        }
        if let Some(notes) = request.notes {
            payload.insert("notes".to_string(), json!(notes));
        }

        if payload.is_empty() {
            return Err(ScheduleError::ValidationError(
                "Nothing to update".to_string(),
            ));
        }

        self.patch(appointment_id, Value::Object(payload), auth_token)
            .await
    }

    /// Cancel is a status transition like any other; the optimistic local
    /// flip happens at the handler, this is the authoritative write.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        debug!("Cancelling appointment {}", appointment_id);

        let current = self
            .fetch_by_id(appointment_id, auth_token)
            .await?
            .ok_or(ScheduleError::NotFound)?;
        self.lifecycle
            .validate_transition(current.status, AppointmentStatus::Canceled)?;

        self.patch(
            appointment_id,
            json!({"status": AppointmentStatus::Canceled.to_string()}),
            auth_token,
        )
        .await
    }

    pub async fn fetch_by_id(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, ScheduleError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select=*", appointment_id);
        let rows: Vec<AppointmentRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().next().and_then(Appointment::from_row))
    }

    /// Uniform failure compensation: refetch the one affected record and
    /// reconcile the cache with whatever the backend now says. Compensation
    /// failures are logged, never surfaced over the original error.
    pub async fn reconcile_after_failure(
        &self,
        store: &ScheduleStore,
        appointment_id: Uuid,
        auth_token: &str,
    ) {
        match self.fetch_by_id(appointment_id, auth_token).await {
            Ok(authoritative) => {
                store.reconcile(appointment_id, authoritative).await;
                debug!("Reconciled appointment {} after failed write", appointment_id);
            }
            Err(e) => {
                warn!(
                    "Compensating refetch for appointment {} failed: {}",
                    appointment_id, e
                );
            }
        }
    }

    /// Minimal patient insert from the booking form, so scheduling can
    /// continue without a detour through the full registration screen. This
    /// write is independent of the appointment insert; there is no
    /// transaction spanning the two.
    pub async fn create_quick_patient(
        &self,
        user_id: &str,
        request: QuickPatientRequest,
        auth_token: &str,
    ) -> Result<Patient, ScheduleError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ScheduleError::ValidationError(
                "Patient name is required".to_string(),
            ));
        }

        let clinic_id = self.require_clinic(user_id, auth_token).await?;
        let payload = json!({
            "clinic_id": clinic_id,
            "name": name,
            "phone": digits_only(&request.phone),
            "cpf": request.cpf.as_deref().map(digits_only),
            "birth_date": request.birth_date,
            "email": "",
            "address": {"street": "", "number": "", "neighborhood": "", "city": ""},
            "avatar_url": generated_avatar_url(name),
            "is_active": true,
        });

        let rows: Vec<Patient> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(payload),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or_else(|| {
            ScheduleError::DatabaseError("Insert returned no representation".to_string())
        })
    }

    async fn patch(
        &self,
        appointment_id: Uuid,
        payload: Value,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<AppointmentRow> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(payload),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .and_then(Appointment::from_row)
            .ok_or(ScheduleError::NotFound)
    }
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

/// Combine the form's date and wall-clock strings into canonical instants.
fn build_window(
    date: NaiveDate,
    start_clock: &str,
    end_clock: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ScheduleError> {
    let start = parse_clock(start_clock)?;
    let end = parse_clock(end_clock)?;

    let start = Utc.from_utc_datetime(&date.and_time(start));
    let end = Utc.from_utc_datetime(&date.and_time(end));

    if end <= start {
        return Err(ScheduleError::InvalidTime(
            "Appointment must end after it starts".to_string(),
        ));
    }

    Ok((start, end))
}

fn parse_clock(value: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ScheduleError::InvalidTime(format!("Unparseable time: {}", value)))
}
