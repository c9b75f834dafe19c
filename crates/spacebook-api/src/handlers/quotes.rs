//! Quote (installment) handlers

use crate::dto::quote::{
    export_filename, render_csv, ExportFormat, ExportQuery, QuoteListResponse, QuotePaidResponse,
    ReservationExport,
};
use crate::dto::positive_id;
use crate::error::ApiError;
use crate::response::{RequestContext, REQUEST_ID_HEADER};
use crate::state::AppState;
use actix_web::{http::header, web, HttpResponse};
use spacebook_auth::AuthenticatedUser;
use spacebook_core::AppError;
use tracing::{info, instrument};

/// Quotes of an owned reservation; empty when the caller does not own it
///
/// GET /api/quotes/by-reservation/{reservationId}
#[instrument(skip(state, ctx, user), fields(user_id = user.user_id))]
pub async fn list_by_reservation(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let reservation_id = positive_id(path.into_inner(), "reservationId")?;
    let quotes = state
        .ledger
        .list_by_reservation(reservation_id, user.user_id)
        .await?;

    Ok(ctx.ok(QuoteListResponse { quotes }))
}

/// Export a reservation with its quotes
///
/// GET /api/quotes/by-reservation/{reservationId}/export?format=json|csv
#[instrument(skip(state, ctx, user), fields(user_id = user.user_id))]
pub async fn export_by_reservation(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    query: web::Query<ExportQuery>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let reservation_id = positive_id(path.into_inner(), "reservationId")?;
    let bundle = state
        .reservations
        .find_bundle(reservation_id, user.user_id)
        .await?
        .ok_or(AppError::ReservationNotFound(reservation_id))?;

    info!(
        reservation_id,
        format = ?query.format,
        quotes = bundle.installments.len(),
        "Exporting reservation quotes"
    );

    match query.format {
        ExportFormat::Json => Ok(ctx.ok(ReservationExport::from(bundle))),
        ExportFormat::Csv => {
            let body = render_csv(&bundle)?;
            Ok(HttpResponse::Ok()
                .content_type(ExportFormat::Csv.content_type())
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!(
                        "attachment; filename=\"{}\"",
                        export_filename(reservation_id, ExportFormat::Csv)
                    ),
                ))
                .insert_header((REQUEST_ID_HEADER, ctx.request_id().to_string()))
                .body(body))
        }
    }
}

/// Mark a quote as paid; paying twice keeps the first payment time
///
/// PATCH /api/quotes/{id}/pay
#[instrument(skip(state, ctx, user), fields(user_id = user.user_id))]
pub async fn pay(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let quote_id = positive_id(path.into_inner(), "id")?;
    let quote = state.ledger.mark_paid(quote_id, user.user_id).await?;

    Ok(ctx.ok(QuotePaidResponse {
        quote,
        message: "quote_paid",
    }))
}

/// Configure quote routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/quotes")
            .route(
                "/by-reservation/{reservation_id}/export",
                web::get().to(export_by_reservation),
            )
            .route(
                "/by-reservation/{reservation_id}",
                web::get().to(list_by_reservation),
            )
            .route("/{id}/pay", web::patch().to(pay)),
    );
}
