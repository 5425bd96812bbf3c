// libs/patient-cell/src/services/directory.rs
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::tenancy;
use shared_models::domain::Patient;
use shared_utils::text::digits_only;

use crate::models::{CreatePatientRequest, PatientError, UpdatePatientRequest};

pub struct PatientDirectoryService {
    supabase: SupabaseClient,
}

impl PatientDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn require_clinic(&self, user_id: &str, auth_token: &str) -> Result<Uuid, PatientError> {
        tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?
            .ok_or(PatientError::TenantNotResolved)
    }

    /// Active patients for the caller's clinic, name-ascending. The search
    /// term is applied after the fetch so name and CPF matching share one
    /// predicate with the unit tests.
    pub async fn list(
        &self,
        user_id: &str,
        auth_token: &str,
        search: Option<&str>,
    ) -> Result<Vec<Patient>, PatientError> {
        let clinic_id = tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let path = match clinic_id {
            Some(clinic) => format!(
                "/rest/v1/patients?clinic_id=eq.{}&is_active=eq.true&order=name.asc",
                clinic
            ),
            None => "/rest/v1/patients?is_active=eq.true&order=name.asc".to_string(),
        };

        let patients: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        debug!("Fetched {} active patients", patients.len());

        match search {
            Some(term) if !term.trim().is_empty() => Ok(patients
                .into_iter()
                .filter(|patient| matches_search(patient, term))
                .collect()),
            _ => Ok(patients),
        }
    }

    pub async fn fetch(&self, patient_id: Uuid, auth_token: &str) -> Result<Patient, PatientError> {
        let path = format!("/rest/v1/patients?id=eq.{}&is_active=eq.true", patient_id);
        let rows: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn create(
        &self,
        user_id: &str,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let clinic_id = self.require_clinic(user_id, auth_token).await?;
        self.insert_in_clinic(clinic_id, request, auth_token).await
    }

    /// Raw insert for callers that already resolved the tenant once, such as
    /// the CSV import loop.
    pub async fn insert_in_clinic(
        &self,
        clinic_id: Uuid,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(PatientError::ValidationError(
                "Patient name is required".to_string(),
            ));
        }

        info!("Creating patient {} in clinic {}", name, clinic_id);

        // Masks are presentation; only digits reach the backend.
        let payload = json!({
            "clinic_id": clinic_id,
            "name": name,
            "phone": digits_only(&request.phone),
            "email": request.email,
            "cpf": request.cpf.as_deref().map(digits_only),
            "birth_date": request.birth_date,
            "address": request.address,
            "avatar_url": request.avatar_url,
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
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Insert returned no representation".to_string()))
    }

    pub async fn update(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let mut payload = Map::new();
        if let Some(name) = request.name {
            payload.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(phone) = request.phone {
            payload.insert("phone".to_string(), json!(digits_only(&phone)));
        }
        if let Some(email) = request.email {
            payload.insert("email".to_string(), json!(email));
        }
        if let Some(cpf) = request.cpf {
            payload.insert("cpf".to_string(), json!(digits_only(&cpf)));
        }
        if let Some(birth_date) = request.birth_date {
            payload.insert("birth_date".to_string(), json!(birth_date));
        }
        if let Some(address) = request.address {
            payload.insert("address".to_string(), json!(address));
        }
        if let Some(avatar_url) = request.avatar_url {
            payload.insert("avatar_url".to_string(), json!(avatar_url));
        }

        if payload.is_empty() {
            return Err(PatientError::ValidationError("Nothing to update".to_string()));
        }

        self.patch(patient_id, Value::Object(payload), auth_token).await
    }

    /// Soft delete: the row stays behind its `is_active` flag and every read
    /// path filters it out.
    pub async fn deactivate(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        info!("Deactivating patient {}", patient_id);
        self.patch(patient_id, json!({"is_active": false}), auth_token)
            .await
    }

    async fn patch(
        &self,
        patient_id: Uuid,
        payload: Value,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let rows: Vec<Patient> = self
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

        rows.into_iter().next().ok_or(PatientError::NotFound)
    }
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

/// Search hits on the name (case-insensitive substring) or on the CPF, the
/// latter both as typed and with punctuation stripped from both sides.
pub fn matches_search(patient: &Patient, term: &str) -> bool {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return true;
    }
    if patient.name.to_lowercase().contains(&trimmed.to_lowercase()) {
        return true;
    }

    let Some(cpf) = patient.cpf.as_deref() else {
        return false;
    };
    if cpf.contains(trimmed) {
        return true;
    }
    let digits = digits_only(trimmed);
    !digits.is_empty() && digits_only(cpf).contains(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(name: &str, cpf: Option<&str>) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            name: name.to_string(),
            phone: Some("11988887777".to_string()),
            email: None,
            cpf: cpf.map(|c| c.to_string()),
            birth_date: None,
            address: None,
            avatar_url: None,
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn search_matches_name_case_insensitively() {
        let p = patient("Maria Silva", None);
        assert!(matches_search(&p, "mAriA"));
        assert!(matches_search(&p, "silva"));
        assert!(!matches_search(&p, "joana"));
    }

    #[test]
    fn search_matches_cpf_with_or_without_punctuation() {
        let p = patient("Maria Silva", Some("39053344705"));
        assert!(matches_search(&p, "390.533"));
        assert!(matches_search(&p, "3905334"));
        assert!(!matches_search(&p, "999"));
    }

    #[test]
    fn blank_search_matches_everyone() {
        let p = patient("Maria Silva", None);
        assert!(matches_search(&p, "   "));
    }

    #[test]
    fn punctuation_only_search_without_cpf_digits_misses() {
        let p = patient("Maria Silva", Some("39053344705"));
        assert!(!matches_search(&p, "..."));
    }
}
