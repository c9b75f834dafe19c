//! Common DTOs used across the API

use serde::{Deserialize, Deserializer};
use spacebook_core::traits::{Pagination, PaginationMeta};
use spacebook_core::AppError;
use tracing::warn;
use validator::Validate;

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,

    /// Items per page
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,
}

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_limit() -> i64 {
    10
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PaginationParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    /// Create pagination metadata
    pub fn metadata(&self, total: i64) -> PaginationMeta {
        PaginationMeta::new(total, self.page, self.limit)
    }
}

/// Run `validator` checks, mapping failures to `AppError::Validation`
pub fn check<T: Validate>(value: &T, what: &str) -> Result<(), AppError> {
    value.validate().map_err(|e| {
        warn!("{} validation failed: {}", what, e);
        AppError::Validation(e.to_string())
    })
}

/// Path ids must be positive
pub fn positive_id(id: i32, what: &str) -> Result<i32, AppError> {
    if id > 0 {
        Ok(id)
    } else {
        Err(AppError::Validation(format!("{} must be a positive integer", what)))
    }
}

/// Tell an absent field apart from an explicit `null`.
///
/// Used with `#[serde(default)]`: absent gives `None`, `null` gives
/// `Some(None)`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
