//! Actix-web request extractors
//!
//! `AuthenticatedUser` validates the bearer token; `AdminUser` additionally
//! requires the admin role.

use crate::jwt::JwtService;
use crate::Claims;
use actix_web::{dev::Payload, http::StatusCode, web, FromRequest, HttpRequest, HttpResponse};
use futures::future::{ready, Ready};
use serde_json::json;
use spacebook_core::models::UserRole;
use spacebook_core::AppError;
use std::fmt;
use tracing::{debug, warn};

/// Rejection produced by the extractors, rendered with the API error shape
#[derive(Debug)]
pub struct AuthRejection(pub AppError);

impl fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl actix_web::ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(json!({
            "error": {
                "status": status.as_u16(),
                "code": self.0.error_code(),
                "message": self.0.to_string(),
            }
        }))
    }
}

/// Extract the bearer token from the Authorization header
fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authenticated user extractor
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use spacebook_auth::AuthenticatedUser;
///
/// async fn me(user: AuthenticatedUser) -> HttpResponse {
///     HttpResponse::Ok().json(serde_json::json!({ "id": user.user_id }))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: String,
    pub role: UserRole,
    /// Full claims from the JWT token
    pub claims: Claims,
}

impl AuthenticatedUser {
    /// Check if user has admin privileges
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this user may act on the account `user_id`
    pub fn can_manage(&self, user_id: i32) -> bool {
        self.user_id == user_id || self.is_admin()
    }

    fn authenticate(req: &HttpRequest) -> Result<Self, AuthRejection> {
        let jwt_service = req.app_data::<web::Data<JwtService>>().ok_or_else(|| {
            warn!("JwtService not found in app data");
            AuthRejection(AppError::Unauthorized(
                "Authentication service not configured".to_string(),
            ))
        })?;

        let token = bearer_token(req).ok_or_else(|| {
            debug!("No authentication token found in request");
            AuthRejection(AppError::Unauthorized(
                "No authentication token provided".to_string(),
            ))
        })?;

        let claims = jwt_service.verify(token).map_err(|e| {
            warn!(error = %e, "Token validation failed");
            AuthRejection(e)
        })?;

        let user_id = claims
            .user_id()
            .ok_or_else(|| AuthRejection(AppError::InvalidToken("Malformed subject".into())))?;

        debug!(user_id, role = %claims.role, "User authenticated");

        Ok(AuthenticatedUser {
            user_id,
            email: claims.email.clone(),
            role: claims.role,
            claims,
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AuthRejection;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::authenticate(req))
    }
}

/// Admin user extractor; non-admins get `403 Forbidden`
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl std::ops::Deref for AdminUser {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AdminUser {
    type Error = AuthRejection;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = AuthenticatedUser::authenticate(req).and_then(|user| {
            if user.is_admin() {
                Ok(AdminUser(user))
            } else {
                warn!(user_id = user.user_id, "User attempted admin access without privileges");
                Err(AuthRejection(AppError::Forbidden))
            }
        });
        ready(result)
    }
}
