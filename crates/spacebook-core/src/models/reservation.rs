//! Reservation model
//!
//! A reservation books one space for one user on a calendar date, starting at
//! a wall-clock minute and lasting a whole number of hours.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{Installment, Space, UserInfo};

/// Persisted reservation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub space_id: i32,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// Whole hours, always > 0
    pub duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Minute interval occupied on its date
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.duration)
    }

    /// Locking scope this reservation lives in
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.space_id, self.date)
    }
}

/// `HH:MM` wire format for start times; seconds are accepted on input
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(D::Error::custom)
    }
}

/// Validated fields of a reservation about to be inserted or rescheduled
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationDraft {
    pub user_id: i32,
    pub space_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration: i32,
}

impl ReservationDraft {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.duration)
    }

    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.space_id, self.date)
    }
}

/// Half-open minute interval `[start, end)` within a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: i64,
    pub end: i64,
}

impl TimeSlot {
    pub fn new(start_time: NaiveTime, duration_hours: i32) -> Self {
        let start = i64::from(start_time.hour()) * 60 + i64::from(start_time.minute());
        Self {
            start,
            end: start + i64::from(duration_hours) * 60,
        }
    }

    /// Strict half-open intersection; touching intervals do not overlap
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Serialization scope for admissions: one space on one calendar date
///
/// Ordered so that a transaction needing several keys can take them in a
/// fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub space_id: i32,
    pub date: NaiveDate,
}

impl SlotKey {
    pub fn new(space_id: i32, date: NaiveDate) -> Self {
        Self { space_id, date }
    }

    /// Second half of the two-key advisory lock (days since 0001-01-01)
    pub fn date_key(&self) -> i32 {
        self.date.num_days_from_ce()
    }
}

/// Everything needed to export one reservation with its installments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationBundle {
    pub reservation: Reservation,
    pub user: UserInfo,
    pub space: Space,
    pub installments: Vec<Installment>,
}
