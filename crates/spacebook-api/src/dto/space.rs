//! Space DTOs

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spacebook_core::models::{Space, SpaceChanges};
use spacebook_core::traits::PaginationMeta;
use spacebook_core::AppError;
use spacebook_services::pricing::round2;
use validator::Validate;

use super::common::{default_limit, default_page, double_option};

fn non_negative_price(price: Decimal) -> Result<Decimal, AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation(
            "pricePerHour must be zero or greater".to_string(),
        ));
    }
    Ok(round2(price))
}

/// Space creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpaceRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// Price per hour in VES
    pub price_per_hour: Decimal,
}

impl CreateSpaceRequest {
    pub fn into_space(self) -> Result<Space, AppError> {
        let now = Utc::now();
        Ok(Space {
            id: 0,
            name: self.name.trim().to_string(),
            description: self.description,
            price_per_hour: non_negative_price(self.price_per_hour)?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial space update; `description: null` clears the description
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpaceRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub price_per_hour: Option<Decimal>,
}

impl UpdateSpaceRequest {
    pub fn into_changes(self) -> Result<SpaceChanges, AppError> {
        Ok(SpaceChanges {
            name: self.name.map(|n| n.trim().to_string()),
            description: self.description,
            price_per_hour: self.price_per_hour.map(non_negative_price).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SortDir {
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

/// `GET /spaces` query string
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpaceQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,

    /// Case-insensitive substring of the name
    #[validate(length(max = 120))]
    pub search: Option<String>,

    #[serde(default)]
    pub sort_dir: SortDir,
}

impl SpaceQuery {
    pub fn metadata(&self, total: i64) -> PaginationMeta {
        PaginationMeta::new(total, self.page, self.limit)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpaceResponse {
    pub space: Space,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpaceListResponse {
    pub spaces: Vec<Space>,
    pub pagination: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_negative_price_is_rejected() {
        let req: CreateSpaceRequest =
            serde_json::from_str(r#"{"name":"Sala","pricePerHour":-1}"#).unwrap();
        assert!(matches!(req.into_space(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_price_is_rounded_to_cents() {
        let req: CreateSpaceRequest =
            serde_json::from_str(r#"{"name":" Sala A ","pricePerHour":"50.005"}"#).unwrap();
        let space = req.into_space().unwrap();
        assert_eq!(space.name, "Sala A");
        assert_eq!(space.price_per_hour, dec!(50.01));
    }

    #[test]
    fn test_update_can_clear_description() {
        let req: UpdateSpaceRequest = serde_json::from_str(r#"{"description":null}"#).unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.description, Some(None));
        assert!(changes.name.is_none());
    }

    #[test]
    fn test_sort_dir_accepts_both_cases() {
        let q: SpaceQuery = serde_json::from_str(r#"{"sortDir":"desc"}"#).unwrap();
        assert_eq!(q.sort_dir, SortDir::Desc);
        let q: SpaceQuery = serde_json::from_str(r#"{"sortDir":"DESC"}"#).unwrap();
        assert_eq!(q.sort_dir, SortDir::Desc);
        let q: SpaceQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.sort_dir, SortDir::Asc);
        assert_eq!(q.limit, 10);
    }
}
