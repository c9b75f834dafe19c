//! Response envelope
//!
//! Successful responses are wrapped as `{ "data": ..., "meta": {...} }`. The
//! request id comes from `x-request-id` when the client sends one and is
//! echoed back on the response.

use actix_web::{dev::Payload, http::StatusCode, FromRequest, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use futures::future::{ready, Ready};
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Envelope metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub path: String,
    pub method: String,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ResponseMeta,
}

/// `{ "message": ... }` payload for deletes and similar acknowledgements
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: &'static str,
}

impl Message {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Per-request facts needed to build the envelope
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    path: String,
    method: String,
    started: Instant,
}

impl RequestContext {
    pub fn capture(req: &HttpRequest) -> Self {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());

        Self {
            request_id,
            path,
            method: req.method().to_string(),
            started: Instant::now(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            path: self.path.clone(),
            method: self.method.clone(),
            request_id: self.request_id.clone(),
            timestamp: Utc::now(),
            response_time_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    /// Wrap `data` in the envelope with the given status
    pub fn respond<T: Serialize>(&self, status: StatusCode, data: T) -> HttpResponse {
        HttpResponse::build(status)
            .insert_header((REQUEST_ID_HEADER, self.request_id.clone()))
            .json(ApiResponse {
                data,
                meta: self.meta(),
            })
    }

    pub fn ok<T: Serialize>(&self, data: T) -> HttpResponse {
        self.respond(StatusCode::OK, data)
    }

    pub fn created<T: Serialize>(&self, data: T) -> HttpResponse {
        self.respond(StatusCode::CREATED, data)
    }
}

impl FromRequest for RequestContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(RequestContext::capture(req)))
    }
}
