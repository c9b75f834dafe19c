//! Data Transfer Objects (DTOs) for API requests and responses

pub mod auth;
pub mod common;
pub mod quote;
pub mod reservation;
pub mod space;
pub mod user;

pub use auth::*;
pub use common::*;
pub use quote::*;
pub use reservation::*;
pub use space::*;
pub use user::*;
