//! Reservation handlers
//!
//! Creation and rescheduling go through the admission engine; reads and
//! cancellations are scoped to the owner.

use crate::dto::reservation::{ReservationBody, ReservationListResponse, ReservationResponse};
use crate::dto::{check, positive_id, PaginationParams};
use crate::error::ApiError;
use crate::response::{Message, RequestContext};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use spacebook_auth::{AdminUser, AuthenticatedUser};
use spacebook_core::AppError;
use tracing::{debug, instrument};

/// Every reservation (admin only)
///
/// GET /api/reservations
#[instrument(skip(state, ctx, _admin))]
pub async fn list_reservations(
    state: web::Data<AppState>,
    ctx: RequestContext,
    query: web::Query<PaginationParams>,
    _admin: AdminUser,
) -> Result<HttpResponse, ApiError> {
    check(&*query, "Pagination")?;
    let page = query.pagination();

    let (reservations, total) = state
        .reservations
        .list_all(page.limit(), page.offset())
        .await?;

    Ok(ctx.ok(ReservationListResponse {
        reservations,
        pagination: Some(query.metadata(total)),
    }))
}

/// Reservations of the caller
///
/// GET /api/reservations/me
#[instrument(skip(state, ctx, user), fields(user_id = user.user_id))]
pub async fn my_reservations(
    state: web::Data<AppState>,
    ctx: RequestContext,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let reservations = state.reservations.list_by_user(user.user_id).await?;
    debug!(count = reservations.len(), "Listed own reservations");

    Ok(ctx.ok(ReservationListResponse {
        reservations,
        pagination: None,
    }))
}

/// GET /api/reservations/{id}
#[instrument(skip(state, ctx, user), fields(user_id = user.user_id))]
pub async fn get_reservation(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let reservation_id = positive_id(path.into_inner(), "id")?;
    let reservation = state
        .reservations
        .find_owned(reservation_id, user.user_id)
        .await?
        .ok_or(AppError::ReservationNotFound(reservation_id))?;

    Ok(ctx.ok(ReservationResponse { reservation }))
}

/// Admit a new reservation
///
/// POST /api/reservations
#[instrument(skip(state, ctx, user, body), fields(user_id = user.user_id))]
pub async fn create_reservation(
    state: web::Data<AppState>,
    ctx: RequestContext,
    user: AuthenticatedUser,
    body: web::Json<ReservationBody>,
) -> Result<HttpResponse, ApiError> {
    check(&*body, "Reservation")?;
    let request = body.into_inner().into_request()?;

    let result = state
        .engine
        .create_reservation(user.user_id, request)
        .await?;

    Ok(ctx.created(result))
}

/// Reschedule an owned reservation
///
/// PUT /api/reservations/{id}
#[instrument(skip(state, ctx, user, body), fields(user_id = user.user_id))]
pub async fn update_reservation(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    user: AuthenticatedUser,
    body: web::Json<ReservationBody>,
) -> Result<HttpResponse, ApiError> {
    check(&*body, "Reservation")?;
    let reservation_id = positive_id(path.into_inner(), "id")?;
    let request = body.into_inner().into_request()?;

    let result = state
        .engine
        .update_reservation(reservation_id, user.user_id, request)
        .await?;

    Ok(ctx.ok(result))
}

/// Cancel an owned reservation together with its quotes
///
/// DELETE /api/reservations/{id}
#[instrument(skip(state, ctx, user), fields(user_id = user.user_id))]
pub async fn cancel_reservation(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let reservation_id = positive_id(path.into_inner(), "id")?;

    if !state
        .engine
        .cancel_reservation(reservation_id, user.user_id)
        .await?
    {
        return Err(AppError::ReservationNotFound(reservation_id).into());
    }

    Ok(ctx.ok(Message::new("reservation_removed")))
}

/// Configure reservation routes; `/me` is registered before `/{id}`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reservations")
            .route("", web::get().to(list_reservations))
            .route("", web::post().to(create_reservation))
            .route("/me", web::get().to(my_reservations))
            .route("/{id}", web::get().to(get_reservation))
            .route("/{id}", web::put().to(update_reservation))
            .route("/{id}", web::delete().to(cancel_reservation)),
    );
}
