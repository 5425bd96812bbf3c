// libs/finance-cell/src/services/export.rs
use chrono::NaiveDate;
use csv::WriterBuilder;

use shared_models::domain::PaymentStatus;

use crate::models::{FinanceError, LedgerEntry};

/// UTF-8 byte-order mark so spreadsheet apps pick the right encoding.
pub const BOM: &[u8] = b"\xef\xbb\xbf";

const EXPORT_HEADERS: [&str; 7] = [
    "Date",
    "Time",
    "Patient",
    "Professional",
    "Service",
    "Amount",
    "Payment Status",
];

pub fn payment_status_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Paid => "Paid",
        PaymentStatus::Pending => "Pending",
        PaymentStatus::Canceled => "Canceled",
    }
}

pub fn export_filename(today: NaiveDate) -> String {
    format!("financial_report_{}.csv", today.format("%Y-%m-%d"))
}

/// Semicolon-delimited report over the filtered, sorted ledger, in the same
/// order the table shows.
pub fn export_csv(entries: &[LedgerEntry]) -> Result<Vec<u8>, FinanceError> {
    let mut writer = WriterBuilder::new().delimiter(b';').from_writer(Vec::new());

    writer
        .write_record(EXPORT_HEADERS)
        .map_err(|e| FinanceError::ExportFailed(e.to_string()))?;

    for entry in entries {
        let amount = format!("{:.2}", entry.price);
        writer
            .write_record([
                entry.date.as_str(),
                entry.time.as_str(),
                entry.patient.as_str(),
                entry.professional.as_str(),
                entry.service.as_str(),
                amount.as_str(),
                payment_status_label(entry.payment_status),
            ])
            .map_err(|e| FinanceError::ExportFailed(e.to_string()))?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| FinanceError::ExportFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(BOM.len() + body.len());
    out.extend_from_slice(BOM);
    out.extend_from_slice(&body);
    Ok(out)
}
