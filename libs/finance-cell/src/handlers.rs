// libs/finance-cell/src/handlers.rs
use std::sync::Arc;

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
use shared_models::domain::PaymentStatus;
use shared_models::error::AppError;

use crate::models::{
    parse_payment_status, DateFilter, FinanceError, LedgerEntry, LedgerQuery,
    UpdatePaymentStatusRequest,
};
use crate::services::{export, ledger, LedgerService};

fn parse_filters(query: &LedgerQuery) -> Result<(DateFilter, Option<PaymentStatus>), FinanceError> {
    let date = match query.date.as_deref() {
        None => DateFilter::All,
        Some(token) => DateFilter::from_token(token)
            .ok_or_else(|| FinanceError::UnknownDateFilter(token.to_string()))?,
    };

    let payment_status = match query.payment_status.as_deref() {
        None | Some("all") => None,
        Some(token) => Some(
            parse_payment_status(token)
                .ok_or_else(|| FinanceError::UnknownPaymentStatus(token.to_string()))?,
        ),
    };

    Ok((date, payment_status))
}

#[axum::debug_handler]
pub async fn list_ledger(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Value>, AppError> {
    debug!("Ledger request from user {}", user.id);

    let (date, payment_status) = parse_filters(&query).map_err(AppError::from)?;
    let service = LedgerService::new(&config);
    let snapshot = service
        .load_snapshot(&user.id, auth.token())
        .await
        .map_err(AppError::from)?;

    let mut filtered = ledger::filter_entries(
        &snapshot.appointments,
        date,
        query.collaborator,
        payment_status,
        query.search.as_deref(),
        &snapshot.patient_names,
        Utc::now().date_naive(),
    );
    ledger::sort_entries(&mut filtered);

    let totals = ledger::ledger_totals(&filtered);
    let page_info = ledger::resolve_page(filtered.len(), query.page.unwrap_or(1));
    let entries: Vec<LedgerEntry> = ledger::page_slice(&filtered, &page_info)
        .iter()
        .map(|a| {
            ledger::ledger_entry(
                a,
                &snapshot.patient_names,
                &snapshot.collaborator_names,
                &snapshot.service_names,
            )
        })
        .collect();

    Ok(Json(json!({
        "entries": entries,
        "totals": totals,
        "pagination": page_info,
    })))
}

#[axum::debug_handler]
pub async fn update_payment_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<UpdatePaymentStatusRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Payment status change for entry {} from user {}",
        entry_id, user.id
    );

    let status = parse_payment_status(&request.payment_status).ok_or_else(|| {
        AppError::from(FinanceError::UnknownPaymentStatus(
            request.payment_status.clone(),
        ))
    })?;

    let service = LedgerService::new(&config);
    let entry = service
        .set_payment_status(entry_id, status, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "entry": entry,
    })))
}

#[axum::debug_handler]
pub async fn export_ledger(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<LedgerQuery>,
) -> Result<Response, AppError> {
    info!("Financial report export requested by user {}", user.id);

    let (date, payment_status) = parse_filters(&query).map_err(AppError::from)?;
    let service = LedgerService::new(&config);
    let snapshot = service
        .load_snapshot(&user.id, auth.token())
        .await
        .map_err(AppError::from)?;

    // The report covers the whole filtered set, not one page.
    let mut filtered = ledger::filter_entries(
        &snapshot.appointments,
        date,
        query.collaborator,
        payment_status,
        query.search.as_deref(),
        &snapshot.patient_names,
        Utc::now().date_naive(),
    );
    ledger::sort_entries(&mut filtered);

    let entries: Vec<LedgerEntry> = filtered
        .iter()
        .map(|a| {
            ledger::ledger_entry(
                a,
                &snapshot.patient_names,
                &snapshot.collaborator_names,
                &snapshot.service_names,
            )
        })
        .collect();

    let bytes = export::export_csv(&entries).map_err(AppError::from)?;
    let filename = export::export_filename(Utc::now().date_naive());
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];

    Ok((headers, bytes).into_response())
}
