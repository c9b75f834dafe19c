//! Business logic services for Spacebook
//!
//! This crate decides whether a booking may be admitted, prices it and keeps
//! its installment ledger.
//!
//! # Services
//!
//! - `pricing` - allowed hours, weekend surcharge, totals and schedules
//! - `AvailabilityChecker` - overlap detection inside a locked slot
//! - `ReservationEngine` - create/update/cancel, each one atomic
//! - `InstallmentLedger` - listing and paying installments
//! - `AccountService` - registration, login and account management
//!
//! Services own `Arc`s to their collaborators and are shared the same way.

pub mod accounts;
pub mod admission;
pub mod availability;
pub mod ledger;
pub mod pricing;

pub use accounts::{AccountChanges, AccountService, LoginResult, NewAccount};
pub use admission::{CalculationDetails, ReservationEngine, ReservationRequest, ReservationResult};
pub use availability::AvailabilityChecker;
pub use ledger::InstallmentLedger;
pub use pricing::PricingPolicy;

/// Business logic constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Default first bookable hour
    pub const OPEN_HOUR: u32 = 8;

    /// Default hour every booking must end by
    pub const CLOSE_HOUR: u32 = 22;

    /// Saturday and Sunday surcharge
    pub const WEEKEND_FACTOR: Decimal = dec!(1.2);

    /// Money is kept to two decimal places everywhere
    pub const MONEY_SCALE: u32 = 2;
}
