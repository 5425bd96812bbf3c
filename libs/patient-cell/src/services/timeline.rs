// libs/patient-cell/src/services/timeline.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::domain::{Appointment, AppointmentRow, MedicalRecord};

use crate::models::{PatientError, RecordRequest, TimelineItem, TimelineKind};

const FALLBACK_VISIT_TITLE: &str = "Consultation";
const NOTE_TITLE: &str = "Clinical note";

#[derive(Debug, Deserialize)]
struct ServiceNameRow {
    id: Uuid,
    name: String,
}

pub struct TimelineService {
    supabase: SupabaseClient,
}

impl TimelineService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Appointments and clinical notes for one patient, flattened into a
    /// single newest-first history.
    pub async fn fetch(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TimelineItem>, PatientError> {
        let appointments_path = format!("/rest/v1/appointments?patient_id=eq.{}", patient_id);
        let records_path = format!("/rest/v1/medical_records?patient_id=eq.{}", patient_id);

        // Inactive services stay in the name map so historic visits keep
        // their titles after the catalog entry is retired.
        let (rows, records, service_rows) = tokio::try_join!(
            self.fetch_rows::<AppointmentRow>(&appointments_path, auth_token),
            self.fetch_rows::<MedicalRecord>(&records_path, auth_token),
            self.fetch_rows::<ServiceNameRow>("/rest/v1/services?select=id,name", auth_token),
        )?;

        let service_names: HashMap<Uuid, String> = service_rows
            .into_iter()
            .map(|row| (row.id, row.name))
            .collect();
        let appointments: Vec<Appointment> =
            rows.into_iter().filter_map(Appointment::from_row).collect();

        debug!(
            "Timeline for patient {}: {} visits, {} notes",
            patient_id,
            appointments.len(),
            records.len()
        );

        Ok(merge_timeline(&appointments, records, &service_names))
    }

    pub async fn create_record(
        &self,
        patient_id: Uuid,
        request: RecordRequest,
        auth_token: &str,
    ) -> Result<MedicalRecord, PatientError> {
        validate_record(&request)?;

        let payload = json!({
            "patient_id": patient_id,
            "description": request.description,
            "attachment": request.attachment,
        });

        let rows: Vec<MedicalRecord> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/medical_records",
                Some(auth_token),
                Some(payload),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Insert returned no representation".to_string()))
    }

    pub async fn update_record(
        &self,
        record_id: Uuid,
        request: RecordRequest,
        auth_token: &str,
    ) -> Result<MedicalRecord, PatientError> {
        validate_record(&request)?;

        let path = format!("/rest/v1/medical_records?id=eq.{}", record_id);
        let payload = json!({
            "description": request.description,
            "attachment": request.attachment,
        });

        let rows: Vec<MedicalRecord> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(payload),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(PatientError::RecordNotFound)
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<T>, PatientError> {
        self.supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))
    }
}

fn validate_record(request: &RecordRequest) -> Result<(), PatientError> {
    if request.description.trim().is_empty() && request.attachment.is_none() {
        return Err(PatientError::ValidationError(
            "A note needs text or an attachment".to_string(),
        ));
    }
    Ok(())
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

/// Flatten visits and notes into one display list ordered newest-first.
pub fn merge_timeline(
    appointments: &[Appointment],
    records: Vec<MedicalRecord>,
    service_names: &HashMap<Uuid, String>,
) -> Vec<TimelineItem> {
    let mut items = Vec::with_capacity(appointments.len() + records.len());

    for appointment in appointments {
        let mut description = format!("Status: {}", appointment.status);
        if let Some(notes) = appointment.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            description.push_str(". Notes: ");
            description.push_str(notes);
        }

        items.push(TimelineItem {
            id: appointment.id,
            kind: TimelineKind::Appointment,
            instant: appointment.start,
            title: visit_title(appointment, service_names),
            description,
            attachment: None,
        });
    }

    for record in records {
        items.push(TimelineItem {
            id: record.id,
            kind: TimelineKind::Note,
            // Rows missing a timestamp sink to the end of the history.
            instant: record.created_at.unwrap_or(DateTime::<Utc>::MIN_UTC),
            title: NOTE_TITLE.to_string(),
            description: record.description,
            attachment: record.attachment,
        });
    }

    items.sort_by(|a, b| b.instant.cmp(&a.instant));
    items
}

fn visit_title(appointment: &Appointment, service_names: &HashMap<Uuid, String>) -> String {
    let names: Vec<&str> = appointment
        .service_ids
        .iter()
        .filter_map(|id| service_names.get(id).map(String::as_str))
        .collect();

    if names.is_empty() {
        FALLBACK_VISIT_TITLE.to_string()
    } else {
        names.join(" + ")
    }
}
