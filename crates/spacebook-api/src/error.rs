//! Transport mapping for domain errors
//!
//! `AppError` knows nothing about HTTP. [`ApiError`] wraps it and owns the
//! status table, so every handler can return `Result<_, ApiError>` and use
//! `?` on service calls.

use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::{header, StatusCode},
    HttpRequest, HttpResponse, ResponseError,
};
use serde_json::json;
use spacebook_core::AppError;
use std::fmt;
use tracing::{error, warn};

/// Seconds a client should wait before retrying a 503
pub const RETRY_AFTER_SECS: u32 = 5;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ApiError {
    /// HTTP status for a domain error
    pub fn status_for(err: &AppError) -> StatusCode {
        match err {
            // 400 Bad Request
            AppError::InvalidHours { .. }
            | AppError::Validation(_)
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::InvalidCredentials
            | AppError::TokenExpired
            | AppError::InvalidToken(_)
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::SpaceNotFound(_)
            | AppError::ReservationNotFound(_)
            | AppError::InstallmentNotFound(_)
            | AppError::UserNotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::OverlappedReservation
            | AppError::InstallmentsPaid(_)
            | AppError::EmailInUse(_) => StatusCode::CONFLICT,

            // 503 Service Unavailable, retryable
            AppError::Transient(_) | AppError::ExchangeRateUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to clients; server-side details stay in the logs
    fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "internal_error".to_string(),
            StatusCode::SERVICE_UNAVAILABLE => self.0.error_code().to_string(),
            _ => self.0.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        Self::status_for(&self.0)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if status.is_server_error() {
            error!(code = self.0.error_code(), error = %self.0, "Request failed");
        } else {
            warn!(code = self.0.error_code(), error = %self.0, "Request rejected");
        }

        let mut response = HttpResponse::build(status);
        if self.0.is_retryable() {
            response.insert_header((header::RETRY_AFTER, RETRY_AFTER_SECS.to_string()));
        }

        response.json(json!({
            "error": {
                "status": status.as_u16(),
                "code": self.0.error_code(),
                "message": self.public_message(),
            }
        }))
    }
}

/// Malformed JSON bodies become 400 validation errors
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError(AppError::Validation(err.to_string())).into()
}

/// Non-numeric path ids become 400 validation errors
pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError(AppError::Validation(err.to_string())).into()
}

/// Bad query strings become 400 validation errors
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError(AppError::Validation(err.to_string())).into()
}
