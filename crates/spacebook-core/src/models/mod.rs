//! Domain models for Spacebook
//!
//! This module contains all the core domain entities used throughout the application.

mod installment;
mod reservation;
mod space;
mod user;

pub use installment::*;
pub use reservation::*;
pub use space::*;
pub use user::*;
