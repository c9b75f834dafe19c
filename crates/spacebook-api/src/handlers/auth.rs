//! Authentication handlers
//!
//! Registration and login. Every other route authenticates with the bearer
//! token issued here.

use crate::dto::auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::dto::check;
use crate::error::ApiError;
use crate::response::RequestContext;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::{debug, info, instrument};

/// Register a new account with the `user` role
///
/// POST /api/auth/register
#[instrument(skip(state, ctx, req))]
pub async fn register(
    state: web::Data<AppState>,
    ctx: RequestContext,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    check(&*req, "Registration")?;
    debug!(request_id = ctx.request_id(), "Processing registration");

    let user = state.accounts.register(req.into_inner().into()).await?;
    info!(user_id = user.id, "Registration successful");

    Ok(ctx.created(RegisterResponse {
        message: "registered",
        user,
    }))
}

/// Exchange credentials for a bearer token
///
/// POST /api/auth/login
#[instrument(skip(state, ctx, req))]
pub async fn login(
    state: web::Data<AppState>,
    ctx: RequestContext,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    check(&*req, "Login")?;

    let result = state.accounts.login(&req.email, &req.password).await?;
    Ok(ctx.ok(LoginResponse::from(result)))
}

/// Configure authentication routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login)),
    );
}
