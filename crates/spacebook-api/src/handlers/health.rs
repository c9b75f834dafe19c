//! Liveness endpoint

use crate::response::RequestContext;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// GET /api/health
pub async fn health(ctx: RequestContext) -> HttpResponse {
    ctx.ok(json!({
        "status": "ok",
        "service": "spacebook",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Configure health routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
