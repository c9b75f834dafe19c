//! Rate provider implementations

mod fixed;
mod http;

pub use fixed::FixedRateProvider;
pub use http::HttpRateProvider;
