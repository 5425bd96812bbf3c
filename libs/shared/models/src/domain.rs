// libs/shared/models/src/domain.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// APPOINTMENT STATUS / PAYMENT / LOCATION
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    #[serde(alias = "cancelled")]
    Canceled,
}

impl AppointmentStatus {
    /// Lenient parse for rows written by older clients; unknown labels fall
    /// back to `Pending` rather than rejecting the whole row.
    pub fn from_wire(label: &str) -> Self {
        match label {
            "confirmed" => AppointmentStatus::Confirmed,
            "completed" => AppointmentStatus::Completed,
            "canceled" | "cancelled" => AppointmentStatus::Canceled,
            _ => AppointmentStatus::Pending,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, AppointmentStatus::Canceled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    #[serde(alias = "cancelled")]
    Canceled,
}

impl PaymentStatus {
    pub fn from_wire(label: &str) -> Self {
        match label {
            "paid" => PaymentStatus::Paid,
            "canceled" | "cancelled" => PaymentStatus::Canceled,
            _ => PaymentStatus::Pending,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    #[default]
    Clinic,
    Home,
}

impl Location {
    pub fn from_wire(label: &str) -> Self {
        match label {
            "home" => Location::Home,
            _ => Location::Clinic,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Clinic => write!(f, "clinic"),
            Location::Home => write!(f, "home"),
        }
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

/// Raw appointment row as the data API returns it. Older rows store a
/// `date` plus wall-clock `start_time`/`end_time` strings; newer rows store
/// full RFC 3339 instants in the same columns. Nothing outside
/// `Appointment::from_row` should ever look at these fields directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub collaborator_id: Option<Uuid>,
    pub service_ids: Option<Vec<Uuid>>,
    pub service_id: Option<Uuid>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Canonical appointment with both time representations already reconciled
/// into a single pair of instants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub collaborator_id: Option<Uuid>,
    pub service_ids: Vec<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub price: f64,
    pub location: Location,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

const LEGACY_DEFAULT_START: (u32, u32) = (9, 0);
const LEGACY_DEFAULT_END: (u32, u32) = (10, 0);

impl Appointment {
    /// Normalize a raw row into canonical instants. Rows carrying neither a
    /// timestamp nor a date are unusable and dropped (`None`).
    pub fn from_row(row: AppointmentRow) -> Option<Self> {
        let start_instant = row.start_time.as_deref().and_then(parse_instant);
        let end_instant = row.end_time.as_deref().and_then(parse_instant);

        let (start, end) = match (start_instant, end_instant) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, start + Duration::hours(1)),
            _ => {
                let date = row.date?;
                let start_clock = row
                    .start_time
                    .as_deref()
                    .and_then(parse_wall_clock)
                    .unwrap_or_else(|| legacy_time(LEGACY_DEFAULT_START));
                let end_clock = row
                    .end_time
                    .as_deref()
                    .and_then(parse_wall_clock)
                    .unwrap_or_else(|| legacy_time(LEGACY_DEFAULT_END));
                (
                    Utc.from_utc_datetime(&date.and_time(start_clock)),
                    Utc.from_utc_datetime(&date.and_time(end_clock)),
                )
            }
        };

        // Historic rows occasionally carry an inverted or zero-length window;
        // restore the one-hour default so durations stay positive.
        let end = if end <= start {
            start + Duration::hours(1)
        } else {
            end
        };

        let service_ids = row
            .service_ids
            .unwrap_or_else(|| row.service_id.map(|id| vec![id]).unwrap_or_default());

        Some(Appointment {
            id: row.id,
            clinic_id: row.clinic_id,
            patient_id: row.patient_id,
            collaborator_id: row.collaborator_id,
            service_ids,
            start,
            end,
            status: row
                .status
                .as_deref()
                .map(AppointmentStatus::from_wire)
                .unwrap_or(AppointmentStatus::Pending),
            payment_status: row
                .payment_status
                .as_deref()
                .map(PaymentStatus::from_wire)
                .unwrap_or(PaymentStatus::Pending),
            price: row.price.unwrap_or(0.0),
            location: row
                .location
                .as_deref()
                .map(Location::from_wire)
                .unwrap_or_default(),
            notes: row.notes,
            created_at: row.created_at,
        })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Calendar date the appointment is bucketed under.
    pub fn local_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn is_canceled(&self) -> bool {
        self.status.is_canceled()
    }
}

fn legacy_time((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_wall_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

// ==============================================================================
// PATIENTS / COLLABORATORS / SERVICES
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<Address>,
    pub avatar_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Patient {
    /// Completed years as of `today`; `None` when no birth date is on file.
    pub fn age(&self, today: NaiveDate) -> Option<i32> {
        let birth = self.birth_date?;
        let mut age = today.years_since(birth)? as i32;
        if age < 0 {
            age = 0;
        }
        Some(age)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub role: Option<String>,
    pub color: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub duration_minutes: i64,
    #[serde(default)]
    pub price: f64,
    pub color: Option<String>,
    #[serde(default)]
    pub is_package: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub description: String,
    pub attachment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

// ==============================================================================
// PROFILES / CLINICS / SUBSCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub clinic_name: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub role: Option<String>,
    pub avatar_url: Option<String>,
    pub subscription_status: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub brand_color: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_row() -> AppointmentRow {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "clinic_id": Uuid::new_v4(),
        }))
        .unwrap()
    }

    #[test]
    fn normalizes_timestamp_rows() {
        let mut row = base_row();
        row.start_time = Some("2024-03-01T14:30:00Z".to_string());
        row.end_time = Some("2024-03-01T15:15:00Z".to_string());

        let apt = Appointment::from_row(row).unwrap();
        assert_eq!(apt.local_date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(apt.duration_minutes(), 45);
    }

    #[test]
    fn normalizes_legacy_date_plus_wall_clock_rows() {
        let mut row = base_row();
        row.date = NaiveDate::from_ymd_opt(2023, 11, 20);
        row.start_time = Some("08:30".to_string());
        row.end_time = Some("09:00".to_string());

        let apt = Appointment::from_row(row).unwrap();
        assert_eq!(apt.local_date(), NaiveDate::from_ymd_opt(2023, 11, 20).unwrap());
        assert_eq!(apt.start.format("%H:%M").to_string(), "08:30");
        assert_eq!(apt.duration_minutes(), 30);
    }

    #[test]
    fn legacy_rows_without_times_get_default_window() {
        let mut row = base_row();
        row.date = NaiveDate::from_ymd_opt(2023, 5, 2);

        let apt = Appointment::from_row(row).unwrap();
        assert_eq!(apt.start.format("%H:%M").to_string(), "09:00");
        assert_eq!(apt.end.format("%H:%M").to_string(), "10:00");
    }

    #[test]
    fn inverted_window_is_restored_to_an_hour() {
        let mut row = base_row();
        row.start_time = Some("2024-03-01T14:00:00Z".to_string());
        row.end_time = Some("2024-03-01T13:00:00Z".to_string());

        let apt = Appointment::from_row(row).unwrap();
        assert_eq!(apt.duration_minutes(), 60);
    }

    #[test]
    fn rows_without_any_date_are_dropped() {
        assert!(Appointment::from_row(base_row()).is_none());
    }

    #[test]
    fn legacy_single_service_id_becomes_list() {
        let mut row = base_row();
        row.date = NaiveDate::from_ymd_opt(2023, 5, 2);
        let service = Uuid::new_v4();
        row.service_id = Some(service);

        let apt = Appointment::from_row(row).unwrap();
        assert_eq!(apt.service_ids, vec![service]);
    }

    #[test]
    fn status_parsing_accepts_both_cancel_spellings() {
        assert_eq!(AppointmentStatus::from_wire("canceled"), AppointmentStatus::Canceled);
        assert_eq!(AppointmentStatus::from_wire("cancelled"), AppointmentStatus::Canceled);
        assert_eq!(AppointmentStatus::from_wire("garbage"), AppointmentStatus::Pending);
    }

    #[test]
    fn patient_age_counts_completed_years() {
        let patient = Patient {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            name: "Ana".to_string(),
            phone: None,
            email: None,
            cpf: None,
            birth_date: NaiveDate::from_ymd_opt(1990, 6, 15),
            address: None,
            avatar_url: None,
            is_active: true,
            created_at: None,
        };

        let before_birthday = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let after_birthday = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(patient.age(before_birthday), Some(33));
        assert_eq!(patient.age(after_birthday), Some(34));
    }
}
