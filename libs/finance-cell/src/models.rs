// libs/finance-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::domain::PaymentStatus;
use shared_models::error::AppError;

/// Day-granular date filter over the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Last7Days,
    Last30Days,
}

impl DateFilter {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "all" => Some(Self::All),
            "today" => Some(Self::Today),
            "last7days" => Some(Self::Last7Days),
            "last30days" => Some(Self::Last30Days),
            _ => None,
        }
    }
}

/// Strict parse for client-supplied payment statuses. Unlike the lenient
/// wire-format fallback, an unknown token here is a caller error.
pub fn parse_payment_status(token: &str) -> Option<PaymentStatus> {
    match token {
        "paid" => Some(PaymentStatus::Paid),
        "pending" => Some(PaymentStatus::Pending),
        "canceled" | "cancelled" => Some(PaymentStatus::Canceled),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerQuery {
    pub date: Option<String>,
    pub collaborator: Option<Uuid>,
    pub payment_status: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: String,
}

/// One ledger row with every reference already resolved to display text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub date: String,
    pub time: String,
    pub patient: String,
    pub professional: String,
    pub service: String,
    pub price: f64,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct LedgerTotals {
    pub total: f64,
    pub received: f64,
    pub pending: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub total_pages: usize,
    pub shown_from: usize,
    pub shown_to: usize,
    pub total: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FinanceError {
    #[error("Unknown date filter: {0}")]
    UnknownDateFilter(String),

    #[error("Unknown payment status: {0}")]
    UnknownPaymentStatus(String),

    #[error("Ledger entry not found")]
    NotFound,

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<FinanceError> for AppError {
    fn from(err: FinanceError) -> Self {
        match err {
            FinanceError::UnknownDateFilter(_) | FinanceError::UnknownPaymentStatus(_) => {
                AppError::BadRequest(err.to_string())
            }
            FinanceError::NotFound => AppError::NotFound(err.to_string()),
            FinanceError::ExportFailed(msg) => AppError::Internal(msg),
            FinanceError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
