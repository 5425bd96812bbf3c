// libs/insight-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

/// Date-range filter tokens accepted by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    All,
    Custom,
}

impl RangeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "today" => Some(Self::Today),
            "yesterday" => Some(Self::Yesterday),
            "last7days" => Some(Self::Last7Days),
            "last30days" => Some(Self::Last30Days),
            "all" => Some(Self::All),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub range: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Inclusive instant window a report is computed over. `single_day` decides
/// whether the time series buckets by hour or by calendar date.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ReportingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub single_day: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardMetrics {
    pub revenue: f64,
    pub appointments: usize,
    pub new_patients: usize,
    pub revenue_pct: f64,
    pub appointments_pct: f64,
    pub new_patients_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopService {
    pub name: String,
    pub count: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartSeries {
    pub revenue: Vec<SeriesPoint>,
    pub attendance: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub range: ReportingWindow,
    pub metrics: DashboardMetrics,
    pub top_services: Vec<TopService>,
    pub revenue_series: Vec<SeriesPoint>,
    pub attendance_series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum InsightError {
    #[error("Unknown range filter: {0}")]
    UnknownRange(String),

    #[error("The custom range requires a date parameter")]
    MissingCustomDate,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<InsightError> for AppError {
    fn from(err: InsightError) -> Self {
        match err {
            InsightError::UnknownRange(_) | InsightError::MissingCustomDate => {
                AppError::BadRequest(err.to_string())
            }
            InsightError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
