//! Spacebook Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the Spacebook booking backend. It includes:
//!
//! - Domain models (User, Space, Reservation, Installment)
//! - Repository, admission-store and rate-provider traits
//! - The closed `AppError` taxonomy
//! - Application configuration
//! - An injectable clock

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
