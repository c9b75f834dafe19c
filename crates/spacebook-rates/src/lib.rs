//! Spacebook Exchange Rates
//!
//! VES per USD conversion for reservation pricing:
//!
//! - `ExchangeRateCache`: one process-wide snapshot with a TTL, refreshed by
//!   at most one caller at a time
//! - `FixedRateProvider`: a configured constant
//! - `HttpRateProvider`: public JSON endpoints tried in order

pub mod cache;
pub mod error;
pub mod providers;

pub use cache::{ExchangeRateCache, FallbackPolicy, RateSnapshot, RateSource};
pub use error::ProviderError;
pub use providers::{FixedRateProvider, HttpRateProvider};

use spacebook_core::config::{ExchangeRateConfig, RateFallback, RateProviderKind};
use spacebook_core::{AppResult, Clock};
use std::sync::Arc;
use std::time::Duration;

/// Build the cache described by the `exchange_rate` config section
pub fn cache_from_config(
    config: &ExchangeRateConfig,
    clock: Arc<dyn Clock>,
) -> AppResult<ExchangeRateCache> {
    let provider: Arc<dyn spacebook_core::traits::RateProvider> = match config.provider {
        RateProviderKind::Fixed => Arc::new(FixedRateProvider::new(config.fixed_rate)),
        RateProviderKind::Http => Arc::new(HttpRateProvider::new(
            config.http_urls.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )?),
    };

    let fallback = match config.fallback {
        RateFallback::Fail => FallbackPolicy::Fail,
        RateFallback::Fixed => FallbackPolicy::Fixed(config.fixed_rate),
    };

    Ok(ExchangeRateCache::new(
        provider,
        clock,
        Duration::from_secs(config.ttl_secs),
        fallback,
    ))
}
