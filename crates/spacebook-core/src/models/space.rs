//! Space model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A rentable unit priced per hour in the base currency (VES)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Always >= 0, two decimal places
    pub price_per_hour: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a space; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct SpaceChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price_per_hour: Option<Decimal>,
}

impl Space {
    /// Apply a partial update in place
    pub fn apply(&mut self, changes: SpaceChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(price) = changes.price_per_hour {
            self.price_per_hour = price;
        }
    }
}
