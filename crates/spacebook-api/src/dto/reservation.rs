//! Reservation DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use spacebook_core::models::Reservation;
use spacebook_core::traits::PaginationMeta;
use spacebook_core::AppError;
use spacebook_services::pricing::parse_start_time;
use spacebook_services::ReservationRequest;
use validator::Validate;

/// Body of `POST /reservations` and `PUT /reservations/{id}`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReservationBody {
    #[validate(range(min = 1, message = "spaceId must be a positive integer"))]
    pub space_id: i32,

    /// `YYYY-MM-DD`
    pub date: NaiveDate,

    /// `HH:MM`, 24h
    #[validate(length(equal = 5, message = "startTime must be HH:MM"))]
    pub start_time: String,

    /// Whole hours
    #[validate(range(min = 1, message = "duration must be at least one hour"))]
    pub duration: i32,

    /// Number of monthly installments
    #[validate(range(min = 1, message = "cuotas must be at least 1"))]
    pub cuotas: Option<u32>,
}

impl ReservationBody {
    pub fn into_request(self) -> Result<ReservationRequest, AppError> {
        Ok(ReservationRequest {
            space_id: self.space_id,
            date: self.date,
            start_time: parse_start_time(&self.start_time)?,
            duration: self.duration,
            installments: self.cuotas,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationResponse {
    pub reservation: Reservation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationListResponse {
    pub reservations: Vec<Reservation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}
