// libs/insight-cell/src/services/dashboard.rs
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::tenancy;
use shared_models::domain::{Appointment, AppointmentRow, Patient};

use crate::models::{
    ChartSeries, DashboardMetrics, DashboardReport, InsightError, RangeKind, ReportingWindow,
    SeriesPoint, TopService,
};

/// Rows without a resolvable service reference group under this label.
pub const UNRESOLVED_SERVICE_LABEL: &str = "Other services";

/// Label of the placeholder point an empty multi-day series collapses to.
pub const NO_DATA_LABEL: &str = "No data";

/// Hours pre-seeded into single-day series so quiet mornings still chart.
const BUSINESS_HOURS: RangeInclusive<u32> = 8..=20;

const DAY_MILLIS: i64 = 86_400_000;

#[derive(Debug, Deserialize)]
struct ServiceNameRow {
    id: Uuid,
    name: String,
}

pub struct DashboardService {
    supabase: SupabaseClient,
}

impl DashboardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Compute the full dashboard payload for one range selection. Fetches
    /// the tenant's collections once, then derives metrics, deltas, ranking
    /// and both chart series from the same normalized rows.
    pub async fn report(
        &self,
        user_id: &str,
        auth_token: &str,
        kind: RangeKind,
        custom_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<DashboardReport, InsightError> {
        let window = resolve_window(kind, today, custom_date)?;

        let clinic_id = tenancy::resolve_clinic_id(&self.supabase, user_id, auth_token)
            .await
            .map_err(|e| InsightError::DatabaseError(e.to_string()))?;

        let (rows, patients, services) = tokio::try_join!(
            self.fetch_collection::<AppointmentRow>("appointments", "select=*", clinic_id, auth_token),
            self.fetch_collection::<Patient>("patients", "is_active=eq.true", clinic_id, auth_token),
            self.fetch_collection::<ServiceNameRow>("services", "select=id,name", clinic_id, auth_token),
        )?;

        let appointments: Vec<Appointment> =
            rows.into_iter().filter_map(Appointment::from_row).collect();
        let names: HashMap<Uuid, String> =
            services.into_iter().map(|s| (s.id, s.name)).collect();

        debug!(
            "Dashboard report over {} appointments, {} patients for clinic {:?}",
            appointments.len(),
            patients.len(),
            clinic_id
        );

        let metrics = compute_metrics(&appointments, &patients, &window);
        let current = in_window(&appointments, &window);
        let top_services = top_services(&current, &names);
        let series = chart_series(&current, &window);

        Ok(DashboardReport {
            range: window,
            metrics,
            top_services,
            revenue_series: series.revenue,
            attendance_series: series.attendance,
        })
    }

    async fn fetch_collection<T: DeserializeOwned>(
        &self,
        table: &str,
        extra: &str,
        clinic_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<T>, InsightError> {
        let path = match clinic_id {
            Some(clinic) => format!("/rest/v1/{}?clinic_id=eq.{}&{}", table, clinic, extra),
            None => format!("/rest/v1/{}?{}", table, extra),
        };

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| InsightError::DatabaseError(e.to_string()))
    }
}

// ==============================================================================
// PURE AGGREGATION
// ==============================================================================

pub fn resolve_window(
    kind: RangeKind,
    today: NaiveDate,
    custom_date: Option<NaiveDate>,
) -> Result<ReportingWindow, InsightError> {
    let window = match kind {
        RangeKind::Today => single_day(today),
        RangeKind::Yesterday => single_day(today - Duration::days(1)),
        RangeKind::Last7Days => trailing(today, 7),
        RangeKind::Last30Days => trailing(today, 30),
        RangeKind::All => all_time(),
        RangeKind::Custom => single_day(custom_date.ok_or(InsightError::MissingCustomDate)?),
    };
    Ok(window)
}

/// Previous period of equal length, immediately before the window. Length is
/// rounded up to whole days so a one-day window always compares against the
/// day before it.
pub fn previous_window(window: &ReportingWindow) -> ReportingWindow {
    let span = window.end - window.start;
    let days = ((span.num_milliseconds() + DAY_MILLIS - 1) / DAY_MILLIS).max(1);
    let shift = Duration::days(days);

    ReportingWindow {
        start: window.start - shift,
        end: window.end - shift,
        single_day: window.single_day,
    }
}

pub fn percent_delta(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Non-canceled appointments starting inside the window.
pub fn in_window<'a>(rows: &'a [Appointment], window: &ReportingWindow) -> Vec<&'a Appointment> {
    rows.iter()
        .filter(|a| !a.is_canceled() && a.start >= window.start && a.start <= window.end)
        .collect()
}

pub fn compute_metrics(
    appointments: &[Appointment],
    patients: &[Patient],
    window: &ReportingWindow,
) -> DashboardMetrics {
    let previous = previous_window(window);

    let current_rows = in_window(appointments, window);
    let previous_rows = in_window(appointments, &previous);

    let revenue: f64 = current_rows.iter().map(|a| a.price).sum();
    let previous_revenue: f64 = previous_rows.iter().map(|a| a.price).sum();

    let new_patients = patients_created_in(patients, window);
    let previous_new_patients = patients_created_in(patients, &previous);

    DashboardMetrics {
        revenue,
        appointments: current_rows.len(),
        new_patients,
        revenue_pct: percent_delta(revenue, previous_revenue),
        appointments_pct: percent_delta(current_rows.len() as f64, previous_rows.len() as f64),
        new_patients_pct: percent_delta(new_patients as f64, previous_new_patients as f64),
    }
}

fn patients_created_in(patients: &[Patient], window: &ReportingWindow) -> usize {
    patients
        .iter()
        .filter(|p| {
            p.created_at
                .map(|created| created >= window.start && created <= window.end)
                .unwrap_or(false)
        })
        .count()
}

/// Display label an appointment groups under: every resolvable service name
/// joined with `" + "`, or the shared fallback when nothing resolves.
pub fn service_label(appointment: &Appointment, names: &HashMap<Uuid, String>) -> String {
    let resolved: Vec<&str> = appointment
        .service_ids
        .iter()
        .filter_map(|id| names.get(id))
        .map(String::as_str)
        .collect();

    if resolved.is_empty() {
        UNRESOLVED_SERVICE_LABEL.to_string()
    } else {
        resolved.join(" + ")
    }
}

/// Group by resolved label, rank by visit count, keep the top five. Ties
/// break alphabetically so the ranking is stable.
pub fn top_services(rows: &[&Appointment], names: &HashMap<Uuid, String>) -> Vec<TopService> {
    let mut groups: HashMap<String, (usize, f64)> = HashMap::new();
    for appointment in rows {
        let entry = groups.entry(service_label(appointment, names)).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += appointment.price;
    }

    let mut ranking: Vec<TopService> = groups
        .into_iter()
        .map(|(name, (count, revenue))| TopService { name, count, revenue })
        .collect();
    ranking.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranking.truncate(5);
    ranking
}

/// Revenue and attendance series over the same buckets: hours for a single
/// day (business hours pre-seeded at zero), calendar dates otherwise.
pub fn chart_series(rows: &[&Appointment], window: &ReportingWindow) -> ChartSeries {
    if window.single_day {
        let mut buckets: BTreeMap<u32, (f64, usize)> =
            BUSINESS_HOURS.map(|hour| (hour, (0.0, 0))).collect();
        for appointment in rows {
            let entry = buckets.entry(appointment.start.hour()).or_insert((0.0, 0));
            entry.0 += appointment.price;
            entry.1 += 1;
        }
        series_from(buckets.into_iter().map(|(hour, sums)| (format!("{}:00", hour), sums)))
    } else {
        let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for appointment in rows {
            let entry = buckets.entry(appointment.local_date()).or_insert((0.0, 0));
            entry.0 += appointment.price;
            entry.1 += 1;
        }

        if buckets.is_empty() {
            return ChartSeries {
                revenue: vec![no_data_point()],
                attendance: vec![no_data_point()],
            };
        }

        series_from(
            buckets
                .into_iter()
                .map(|(date, sums)| (date.format("%d/%m").to_string(), sums)),
        )
    }
}

fn series_from(buckets: impl Iterator<Item = (String, (f64, usize))>) -> ChartSeries {
    let mut revenue = Vec::new();
    let mut attendance = Vec::new();
    for (label, (bucket_revenue, count)) in buckets {
        revenue.push(SeriesPoint {
            label: label.clone(),
            value: bucket_revenue,
        });
        attendance.push(SeriesPoint {
            label,
            value: count as f64,
        });
    }
    ChartSeries { revenue, attendance }
}

fn no_data_point() -> SeriesPoint {
    SeriesPoint {
        label: NO_DATA_LABEL.to_string(),
        value: 0.0,
    }
}

fn single_day(date: NaiveDate) -> ReportingWindow {
    ReportingWindow {
        start: day_start(date),
        end: day_end(date),
        single_day: true,
    }
}

fn trailing(today: NaiveDate, days: i64) -> ReportingWindow {
    ReportingWindow {
        start: day_start(today - Duration::days(days)),
        end: day_end(today),
        single_day: false,
    }
}

fn all_time() -> ReportingWindow {
    let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN);
    let end = NaiveDate::from_ymd_opt(2100, 1, 1).unwrap_or(NaiveDate::MAX);
    ReportingWindow {
        start: day_start(start),
        end: day_start(end),
        single_day: false,
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn day_end(date: NaiveDate) -> DateTime<Utc> {
    let last = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN));
    Utc.from_utc_datetime(&last)
}
