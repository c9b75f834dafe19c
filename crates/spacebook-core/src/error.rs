//! Domain errors
//!
//! `AppError` is the closed set of failures the domain can report. It carries
//! no transport concerns: the HTTP status table lives in the API crate.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    // Booking
    #[error("Space not found: {0}")]
    SpaceNotFound(i32),

    #[error("Requested slot is outside the allowed hours ({open:02}:00-{close:02}:00)")]
    InvalidHours { open: u32, close: u32 },

    #[error("Requested slot overlaps an existing reservation")]
    OverlappedReservation,

    #[error("Reservation not found: {0}")]
    ReservationNotFound(i32),

    #[error("Exchange rate unavailable: {0}")]
    ExchangeRateUnavailable(String),

    // Ledger
    #[error("Installment not found: {0}")]
    InstallmentNotFound(i32),

    #[error("Reservation {0} has paid installments and cannot be rescheduled")]
    InstallmentsPaid(i32),

    // Accounts
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Email already registered: {0}")]
    EmailInUse(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: insufficient permissions")]
    Forbidden,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    // Request shape
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Storage
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Temporary storage contention: {0}")]
    Transient(String),

    // Process
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Stable snake_case key clients can match on
    pub fn error_code(&self) -> &'static str {
        use AppError::*;

        match self {
            SpaceNotFound(_) => "space_not_found",
            InvalidHours { .. } => "invalid_hours",
            OverlappedReservation => "overlapped_reservation",
            ReservationNotFound(_) => "reservation_not_found",
            ExchangeRateUnavailable(_) => "exchange_rate_unavailable",
            InstallmentNotFound(_) => "not_found",
            InstallmentsPaid(_) => "installments_paid",
            UserNotFound(_) => "user_not_found",
            EmailInUse(_) => "email_in_use",
            InvalidCredentials => "invalid_credentials",
            TokenExpired => "token_expired",
            InvalidToken(_) => "invalid_token",
            Unauthorized(_) => "unauthorized",
            Forbidden => "forbidden",
            PasswordHash(_) => "password_error",
            Validation(_) => "validation_error",
            InvalidInput(_) => "invalid_input",
            Database(_) => "database_error",
            Pool(_) => "pool_error",
            Transaction(_) => "transaction_error",
            Transient(_) => "temporarily_unavailable",
            Config(_) => "config_error",
            Serialization(_) => "serialization_error",
        }
    }

    /// Whether a client may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Transient(_) | AppError::ExchangeRateUnavailable(_)
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
