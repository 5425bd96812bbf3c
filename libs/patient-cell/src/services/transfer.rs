// libs/patient-cell/src/services/transfer.rs
use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, Trim, WriterBuilder};
use serde::Deserialize;
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::tenancy;
use shared_models::domain::{Address, Patient};
use shared_utils::text::digits_only;

use crate::models::{CreatePatientRequest, ImportReport, PatientError};
use crate::services::directory::PatientDirectoryService;

/// Spreadsheet tools key charset detection off the byte-order mark.
pub const BOM: &[u8] = b"\xef\xbb\xbf";

const EXPORT_HEADERS: [&str; 7] = ["id", "name", "phone", "email", "cpf", "birth_date", "city"];

#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    cpf: String,
    #[serde(default)]
    birth_date: String,
    #[serde(default)]
    city: String,
}

pub struct CsvTransferService {
    supabase: SupabaseClient,
    directory: PatientDirectoryService,
}

impl CsvTransferService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: PatientDirectoryService::new(config),
        }
    }

    pub async fn export(&self, user_id: &str, auth_token: &str) -> Result<Vec<u8>, PatientError> {
        let patients = self.directory.list(user_id, auth_token, None).await?;
        export_csv(&patients)
    }

    /// Inserts one patient per parsed row. Rows without a name and rows the
    /// backend refuses are counted instead of aborting the batch.
    pub async fn import(
        &self,
        user_id: &str,
        bytes: &[u8],
        auth_token: &str,
    ) -> Result<ImportReport, PatientError> {
        let requests = parse_import(bytes)?;
        let clinic_id = tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?
            .ok_or(PatientError::TenantNotResolved)?;

        let mut report = ImportReport::default();
        for request in requests {
            if request.name.trim().is_empty() {
                report.skipped += 1;
                continue;
            }
            match self
                .directory
                .insert_in_clinic(clinic_id, request, auth_token)
                .await
            {
                Ok(_) => report.inserted += 1,
                Err(e) => {
                    warn!("Skipping patient row on import: {}", e);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Patient import finished: {} inserted, {} skipped",
            report.inserted, report.skipped
        );
        Ok(report)
    }
}

pub fn export_filename(today: NaiveDate) -> String {
    format!("patients_export_{}.csv", today.format("%Y-%m-%d"))
}

/// Comma-delimited, fully quoted, BOM-prefixed snapshot of the patient list.
/// Phone and CPF are reduced to digits, mirroring how they are stored.
pub fn export_csv(patients: &[Patient]) -> Result<Vec<u8>, PatientError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(EXPORT_HEADERS)
        .map_err(|e| PatientError::ExportFailed(e.to_string()))?;

    for patient in patients {
        writer
            .write_record([
                patient.id.to_string(),
                patient.name.clone(),
                digits_only(patient.phone.as_deref().unwrap_or("")),
                patient.email.clone().unwrap_or_default(),
                digits_only(patient.cpf.as_deref().unwrap_or("")),
                patient
                    .birth_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                patient
                    .address
                    .as_ref()
                    .map(|a| a.city.clone())
                    .unwrap_or_default(),
            ])
            .map_err(|e| PatientError::ExportFailed(e.to_string()))?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| PatientError::ExportFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(BOM.len() + body.len());
    out.extend_from_slice(BOM);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Parses the same column set the export writes. Unknown columns (including
/// `id`) are ignored; a missing birth date or an unparseable one becomes
/// `None` rather than failing the row.
pub fn parse_import(bytes: &[u8]) -> Result<Vec<CreatePatientRequest>, PatientError> {
    let body = bytes.strip_prefix(BOM).unwrap_or(bytes);

    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(body);
    let mut requests = Vec::new();

    for row in reader.deserialize::<ImportRow>() {
        let row = row.map_err(|e| PatientError::MalformedCsv(e.to_string()))?;

        requests.push(CreatePatientRequest {
            name: row.name,
            phone: row.phone,
            email: non_empty(row.email),
            cpf: non_empty(row.cpf),
            birth_date: NaiveDate::parse_from_str(&row.birth_date, "%Y-%m-%d").ok(),
            address: Address {
                city: row.city,
                ..Default::default()
            },
            avatar_url: None,
        });
    }

    Ok(requests)
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
