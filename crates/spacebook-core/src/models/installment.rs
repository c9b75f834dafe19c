//! Installment model
//!
//! Installments are stored in the `quotes` table and exposed as "quotes" on
//! the wire, matching the vocabulary customers already know.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One scheduled payment of a reservation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: i32,
    pub reservation_id: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub paid: bool,
    /// Set exactly once, on the false -> true transition
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installment {
    /// Mark as paid. Returns false when it was already paid, leaving it untouched.
    pub fn settle(&mut self, at: DateTime<Utc>) -> bool {
        if self.paid {
            return false;
        }
        self.paid = true;
        self.paid_at = Some(at);
        self.updated_at = at;
        true
    }
}

/// Schedule entry produced by the pricing utilities before persistence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentDraft {
    pub due_date: NaiveDate,
    pub amount: Decimal,
}
