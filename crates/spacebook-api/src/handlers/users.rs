//! User management handlers

use crate::dto::user::{CreateUserRequest, UpdateUserRequest, UserListResponse, UserResponse};
use crate::dto::{check, positive_id, PaginationParams};
use crate::error::ApiError;
use crate::response::{Message, RequestContext};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use spacebook_auth::{AdminUser, AuthenticatedUser};
use spacebook_core::AppError;
use tracing::{debug, info, instrument};

/// List users (admin only)
///
/// GET /api/users
#[instrument(skip(state, ctx, _admin))]
pub async fn list_users(
    state: web::Data<AppState>,
    ctx: RequestContext,
    query: web::Query<PaginationParams>,
    _admin: AdminUser,
) -> Result<HttpResponse, ApiError> {
    check(&*query, "Pagination")?;
    let page = query.pagination();

    let (users, total) = state.accounts.list(page.limit(), page.offset()).await?;
    debug!(count = users.len(), total, "Listed users");

    Ok(ctx.ok(UserListResponse {
        users,
        pagination: query.metadata(total),
    }))
}

/// Profile of the caller
///
/// GET /api/users/me
#[instrument(skip(state, ctx, user), fields(user_id = user.user_id))]
pub async fn me(
    state: web::Data<AppState>,
    ctx: RequestContext,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let user = state.accounts.get(user.user_id).await?;
    Ok(ctx.ok(UserResponse {
        message: None,
        user,
    }))
}

/// Get a user by id (admin only)
///
/// GET /api/users/{id}
#[instrument(skip(state, ctx, _admin))]
pub async fn get_user(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    _admin: AdminUser,
) -> Result<HttpResponse, ApiError> {
    let user_id = positive_id(path.into_inner(), "id")?;
    let user = state.accounts.get(user_id).await?;
    Ok(ctx.ok(UserResponse {
        message: None,
        user,
    }))
}

/// Create a user with any role (admin only)
///
/// POST /api/users
#[instrument(skip(state, ctx, admin, req), fields(admin_id = admin.user_id))]
pub async fn create_user(
    state: web::Data<AppState>,
    ctx: RequestContext,
    admin: AdminUser,
    req: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    check(&*req, "User creation")?;

    let (account, role) = req.into_inner().into_parts();
    let user = state.accounts.create_user(account, role).await?;
    info!(user_id = user.id, role = %user.role, "User created by admin");

    Ok(ctx.created(UserResponse {
        message: Some("user_created"),
        user,
    }))
}

/// Update a user; callers may update themselves, admins anyone
///
/// PUT /api/users/{id}
#[instrument(skip(state, ctx, actor, req), fields(actor_id = actor.user_id))]
pub async fn update_user(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    actor: AuthenticatedUser,
    req: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    check(&*req, "User update")?;
    let user_id = positive_id(path.into_inner(), "id")?;

    let user = state
        .accounts
        .update(user_id, actor.user_id, actor.role, req.into_inner().into())
        .await?;

    Ok(ctx.ok(UserResponse {
        message: Some("user_updated"),
        user,
    }))
}

/// Delete a user and, by cascade, their reservations
///
/// DELETE /api/users/{id}
#[instrument(skip(state, ctx, actor), fields(actor_id = actor.user_id))]
pub async fn delete_user(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<i32>,
    actor: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let user_id = positive_id(path.into_inner(), "id")?;

    if !state
        .accounts
        .delete(user_id, actor.user_id, actor.role)
        .await?
    {
        return Err(AppError::UserNotFound(user_id.to_string()).into());
    }

    Ok(ctx.ok(Message::new("user_deleted")))
}

/// Configure user routes; `/me` is registered before `/{id}`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(list_users))
            .route("", web::post().to(create_user))
            .route("/me", web::get().to(me))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}", web::delete().to(delete_user)),
    );
}
