//! Rate provider failures

use spacebook_core::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} returned no usable VES rate")]
    MissingRate { url: String },

    #[error("rate {0} is not positive")]
    NonPositive(String),

    #[error("no rate endpoint configured")]
    NoEndpoints,

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Client(msg) => AppError::Config(msg),
            other => AppError::ExchangeRateUnavailable(other.to_string()),
        }
    }
}
