//! HTTP request handlers

pub mod auth;
pub mod health;
pub mod quotes;
pub mod reservations;
pub mod spaces;
pub mod users;

pub use auth::configure as configure_auth;
pub use health::configure as configure_health;
pub use quotes::configure as configure_quotes;
pub use reservations::configure as configure_reservations;
pub use spaces::configure as configure_spaces;
pub use users::configure as configure_users;
