//! API layer for Spacebook
//!
//! HTTP handlers for accounts, spaces, reservations and their installment
//! quotes, plus the response envelope and the transport error mapping.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod dto;
pub mod error;
pub mod handlers;
pub mod response;
pub mod state;

use actix_web::web;

pub use error::ApiError;
pub use response::{ApiResponse, RequestContext, REQUEST_ID_HEADER};
pub use state::{AppState, Repositories};

pub use handlers::{
    configure_auth, configure_health, configure_quotes, configure_reservations,
    configure_spaces, configure_users,
};

/// Mount every route under `/api`.
///
/// Expects `web::Data<AppState>` and `web::Data<JwtService>` to be
/// registered as app data.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .service(
            web::scope("/api")
                .configure(configure_health)
                .configure(configure_auth)
                .configure(configure_users)
                .configure(configure_spaces)
                .configure(configure_reservations)
                .configure(configure_quotes),
        );
}
