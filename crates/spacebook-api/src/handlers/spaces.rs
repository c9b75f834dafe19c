//! Space handlers
//!
//! Any authenticated user may browse spaces; only admins create, edit or
//! remove them.

use crate::dto::space::{
    CreateSpaceRequest, SortDir, SpaceListResponse, SpaceQuery, SpaceResponse, UpdateSpaceRequest,
};
use crate::dto::{check, positive_id};
use crate::error::ApiError;
use crate::response::{Message, RequestContext};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use spacebook_auth::{AdminUser, AuthenticatedUser};
use spacebook_core::traits::Repository;
use spacebook_core::AppError;
use tracing::{debug, info, instrument};

/// List spaces with optional name search
///
/// GET /api/spaces?page=1&limit=10&search=sala&sortDir=DESC
#[instrument(skip(state, ctx, _user))]
pub async fn list_spaces(
    state: web::Data<AppState>,
    ctx: RequestContext,
    query: web::Query<SpaceQuery>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    check(&*query, "Space query")?;

    let (spaces, total) = state
        .spaces
        .search(
            query.search.as_deref(),
            query.sort_dir == SortDir::Desc,
            query.limit,
            query.offset(),
        )
        .await?;
    debug!(count = spaces.len(), total, "Listed spaces");

    Ok(ctx.ok(SpaceListResponse {
        spaces,
        pagination: query.metadata(total),
    }))
}

/// GET /api/spaces/{id}
#[instrument(skip(state, ctx, _user))]
pub async fn get_space(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let space_id = positive_id(path.into_inner(), "id")?;
    let space = state
        .spaces
        .find_by_id(space_id)
        .await?
        .ok_or(AppError::SpaceNotFound(space_id))?;

    Ok(ctx.ok(SpaceResponse { space }))
}

/// POST /api/spaces
#[instrument(skip(state, ctx, admin, req), fields(admin_id = admin.user_id))]
pub async fn create_space(
    state: web::Data<AppState>,
    ctx: RequestContext,
    admin: AdminUser,
    req: web::Json<CreateSpaceRequest>,
) -> Result<HttpResponse, ApiError> {
    check(&*req, "Space creation")?;

    let space = state.spaces.create(&req.into_inner().into_space()?).await?;
    info!(space_id = space.id, name = %space.name, "Space created");

    Ok(ctx.created(SpaceResponse { space }))
}

/// Partial update
///
/// PUT /api/spaces/{id}
#[instrument(skip(state, ctx, admin, req), fields(admin_id = admin.user_id))]
pub async fn update_space(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    admin: AdminUser,
    req: web::Json<UpdateSpaceRequest>,
) -> Result<HttpResponse, ApiError> {
    check(&*req, "Space update")?;
    let space_id = positive_id(path.into_inner(), "id")?;
    let changes = req.into_inner().into_changes()?;

    let mut space = state
        .spaces
        .find_by_id(space_id)
        .await?
        .ok_or(AppError::SpaceNotFound(space_id))?;
    space.apply(changes);

    let space = state.spaces.update(&space).await?;
    info!(space_id, "Space updated");

    Ok(ctx.ok(SpaceResponse { space }))
}

/// Remove a space; its reservations and quotes go with it
///
/// DELETE /api/spaces/{id}
#[instrument(skip(state, ctx, admin), fields(admin_id = admin.user_id))]
pub async fn delete_space(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    admin: AdminUser,
) -> Result<HttpResponse, ApiError> {
    let space_id = positive_id(path.into_inner(), "id")?;

    if !state.spaces.delete(space_id).await? {
        return Err(AppError::SpaceNotFound(space_id).into());
    }
    info!(space_id, "Space removed");

    Ok(ctx.ok(Message::new("space_removed")))
}

/// Configure space routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/spaces")
            .route("", web::get().to(list_spaces))
            .route("", web::post().to(create_space))
            .route("/{id}", web::get().to(get_space))
            .route("/{id}", web::put().to(update_space))
            .route("/{id}", web::delete().to(delete_space)),
    );
}
