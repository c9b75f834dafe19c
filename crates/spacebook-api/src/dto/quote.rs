//! Quote (installment) DTOs and the per-reservation export

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spacebook_core::models::{Installment, ReservationBundle};
use spacebook_core::AppError;

/// Export format
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Grouped JSON inside the usual envelope
    #[default]
    Json,
    /// Flat CSV download, one row per quote
    Csv,
}

impl ExportFormat {
    /// Get content type header value
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json; charset=utf-8",
        }
    }

    /// Get file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteListResponse {
    pub quotes: Vec<Installment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotePaidResponse {
    pub quote: Installment,
    pub message: &'static str,
}

/// Same shape as `Date.prototype.toISOString`
fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ==================== JSON export ====================

#[derive(Debug, Clone, Serialize)]
pub struct ExportUser {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSpace {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price_per_hour: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReservation {
    pub id: i32,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration: i32,
    pub user: ExportUser,
    pub space: ExportSpace,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuote {
    pub id: i32,
    pub reservation_id: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub paid: bool,
    pub paid_at: Option<String>,
}

/// `{ reservation, quotes }` document for `format=json`
#[derive(Debug, Clone, Serialize)]
pub struct ReservationExport {
    pub reservation: ExportReservation,
    pub quotes: Vec<ExportQuote>,
}

impl From<ReservationBundle> for ReservationExport {
    fn from(bundle: ReservationBundle) -> Self {
        let r = bundle.reservation;
        let quotes = bundle
            .installments
            .into_iter()
            .map(|q| ExportQuote {
                id: q.id,
                reservation_id: r.id,
                due_date: q.due_date,
                amount: q.amount,
                paid: q.paid,
                paid_at: q.paid_at.map(iso_timestamp),
            })
            .collect();

        Self {
            reservation: ExportReservation {
                id: r.id,
                date: r.date,
                start_time: r.start_time.format("%H:%M").to_string(),
                duration: r.duration,
                user: ExportUser {
                    id: bundle.user.id,
                    name: bundle.user.name,
                    email: bundle.user.email,
                },
                space: ExportSpace {
                    id: bundle.space.id,
                    name: bundle.space.name,
                    description: bundle.space.description,
                    price_per_hour: bundle.space.price_per_hour,
                },
            },
            quotes,
        }
    }
}

// ==================== CSV export ====================

/// Column order of the CSV export
pub const CSV_HEADERS: [&str; 15] = [
    "reservationId",
    "reservationDate",
    "startTime",
    "durationHours",
    "userId",
    "userName",
    "userEmail",
    "spaceId",
    "spaceName",
    "spacePricePerHour",
    "quoteId",
    "dueDate",
    "amount",
    "paid",
    "paidAt",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One CSV line: the reservation columns repeated for every quote
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    reservation_id: i32,
    reservation_date: NaiveDate,
    start_time: &'a str,
    duration_hours: i32,
    user_id: i32,
    user_name: &'a str,
    user_email: &'a str,
    space_id: i32,
    space_name: &'a str,
    space_price_per_hour: Decimal,
    quote_id: i32,
    due_date: NaiveDate,
    amount: Decimal,
    paid: bool,
    paid_at: String,
}

/// `quotes-reservation-{id}.csv`
pub fn export_filename(reservation_id: i32, format: ExportFormat) -> String {
    format!("quotes-reservation-{}.{}", reservation_id, format.extension())
}

/// Render the bundle as a UTF-8 CSV with BOM and CRLF line endings.
///
/// The header line is always written, even when the reservation has no
/// quotes.
pub fn render_csv(bundle: &ReservationBundle) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(UTF8_BOM.to_vec());

    let csv_err = |e: csv::Error| AppError::Serialization(e.to_string());

    writer.write_record(CSV_HEADERS).map_err(csv_err)?;

    let r = &bundle.reservation;
    let start_time = r.start_time.format("%H:%M").to_string();
    for q in &bundle.installments {
        writer
            .serialize(CsvRow {
                reservation_id: r.id,
                reservation_date: r.date,
                start_time: &start_time,
                duration_hours: r.duration,
                user_id: bundle.user.id,
                user_name: &bundle.user.name,
                user_email: &bundle.user.email,
                space_id: bundle.space.id,
                space_name: &bundle.space.name,
                space_price_per_hour: bundle.space.price_per_hour,
                quote_id: q.id,
                due_date: q.due_date,
                amount: q.amount,
                paid: q.paid,
                paid_at: q.paid_at.map(iso_timestamp).unwrap_or_default(),
            })
            .map_err(csv_err)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Serialization(e.to_string()))
}
