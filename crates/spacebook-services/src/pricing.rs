//! Time and pricing utilities
//!
//! Pure functions only. Money is `Decimal` in the base currency (VES) and is
//! rounded half-up to two places exactly once, on the final figure.

use crate::constants::{CLOSE_HOUR, MONEY_SCALE, OPEN_HOUR, WEEKEND_FACTOR};
use chrono::{Datelike, Months, NaiveDate, NaiveTime, Timelike, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};
use spacebook_core::config::BookingConfig;
use spacebook_core::models::InstallmentDraft;
use spacebook_core::{AppError, AppResult};

/// Round half-up (away from zero) to two decimal places.
///
/// The result always carries a scale of 2, so `100` comes back as `100.00`.
pub fn round2(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Parse a 24h `HH:MM` wall-clock time. Seconds are not accepted.
pub fn parse_start_time(value: &str) -> AppResult<NaiveTime> {
    let well_formed = value.len() == 5
        && value.as_bytes()[2] == b':'
        && value
            .bytes()
            .enumerate()
            .all(|(i, b)| i == 2 || b.is_ascii_digit());
    if !well_formed {
        return Err(AppError::Validation(format!(
            "startTime must be HH:MM, got {:?}",
            value
        )));
    }

    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| AppError::Validation(format!("startTime {:?} is not a valid time", value)))
}

/// Saturday or Sunday.
///
/// A `NaiveDate` carries no zone, so this is the weekday of the calendar
/// date as written, the same answer UTC would give.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Schedule `total` as `count` monthly installments starting on `start`.
///
/// Installment `i` is due `i` calendar months after `start`, clamped to the
/// end of shorter months (Jan 31 -> Feb 29 -> Mar 31). Every installment is
/// `round2(total / count)` except the last, which absorbs the rounding
/// remainder so the schedule always sums to `total`.
pub fn build_installments(
    total: Decimal,
    count: u32,
    start: NaiveDate,
) -> AppResult<Vec<InstallmentDraft>> {
    if count == 0 {
        return Err(AppError::Validation(
            "installment count must be at least 1".to_string(),
        ));
    }

    let per = round2(total / Decimal::from(count));
    let mut schedule = Vec::with_capacity(count as usize);
    let mut allocated = Decimal::ZERO;

    for i in 0..count {
        let due_date = start.checked_add_months(Months::new(i)).ok_or_else(|| {
            AppError::InvalidInput(format!("due date {} months after {} overflows", i, start))
        })?;
        let amount = if i + 1 == count { total - allocated } else { per };
        allocated += amount;
        schedule.push(InstallmentDraft { due_date, amount });
    }

    Ok(schedule)
}

/// Convert a VES amount to USD at `rate` VES per USD
pub fn to_usd(total_ves: Decimal, rate: Decimal) -> AppResult<Decimal> {
    if rate <= Decimal::ZERO {
        return Err(AppError::ExchangeRateUnavailable(format!(
            "unusable rate {}",
            rate
        )));
    }
    Ok(round2(total_ves / rate))
}

/// Configurable booking rules
#[derive(Debug, Clone, PartialEq)]
pub struct PricingPolicy {
    pub open_hour: u32,
    pub close_hour: u32,
    pub weekend_factor: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            open_hour: OPEN_HOUR,
            close_hour: CLOSE_HOUR,
            weekend_factor: WEEKEND_FACTOR,
        }
    }
}

impl From<&BookingConfig> for PricingPolicy {
    fn from(config: &BookingConfig) -> Self {
        Self {
            open_hour: config.open_hour,
            close_hour: config.close_hour,
            weekend_factor: config.weekend_factor,
        }
    }
}

impl PricingPolicy {
    /// True iff the start hour is at or after opening and
    /// `start hour + duration` does not pass closing.
    ///
    /// Only the hour of `start` is considered, so 21:30 for one hour passes.
    pub fn is_within_allowed_hours(&self, start: NaiveTime, duration_hours: i32) -> bool {
        if duration_hours <= 0 {
            return false;
        }
        let hour = i64::from(start.hour());
        hour >= i64::from(self.open_hour)
            && hour + i64::from(duration_hours) <= i64::from(self.close_hour)
    }

    /// Multiplier applied on `date`
    pub fn factor_for(&self, date: NaiveDate) -> Decimal {
        if is_weekend(date) {
            self.weekend_factor
        } else {
            Decimal::ONE
        }
    }

    /// `round2(base_per_hour * duration_hours * factor)`
    pub fn calculate_total_price(
        &self,
        base_per_hour: Decimal,
        duration_hours: i32,
        date: NaiveDate,
    ) -> Decimal {
        round2(base_per_hour * Decimal::from(duration_hours) * self.factor_for(date))
    }

    /// The `InvalidHours` error for this policy's window
    pub fn invalid_hours(&self) -> AppError {
        AppError::InvalidHours {
            open: self.open_hour,
            close: self.close_hour,
        }
    }
}
