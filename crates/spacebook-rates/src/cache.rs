//! Exchange-rate cache
//!
//! Holds one `{rate, fetched_at}` snapshot. Readers take the fast path under
//! a read lock; on a miss exactly one caller refreshes while the others wait
//! for it and then reuse its result. Prices may therefore use a rate up to
//! one TTL old.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use spacebook_core::{traits::RateProvider, AppError, AppResult, Clock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Behaviour when the provider fails on a cache miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Return `AppError::ExchangeRateUnavailable`
    Fail,
    /// Cache and return this rate, logging a warning
    Fixed(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Provider,
    Fallback,
}

/// Cached rate and when it was obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    pub rate: Decimal,
    pub fetched_at: DateTime<Utc>,
    pub source: RateSource,
}

pub struct ExchangeRateCache {
    provider: Arc<dyn RateProvider>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    fallback: FallbackPolicy,
    current: RwLock<Option<RateSnapshot>>,
    refresh: Mutex<()>,
}

impl ExchangeRateCache {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            provider,
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            fallback,
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Current VES per USD rate
    pub async fn get_rate(&self) -> AppResult<Decimal> {
        Ok(self.snapshot().await?.rate)
    }

    /// Current snapshot, refreshing it if it is missing or older than the TTL
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn snapshot(&self) -> AppResult<RateSnapshot> {
        if let Some(fresh) = self.fresh() {
            return Ok(fresh);
        }

        let _refreshing = self.refresh.lock().await;

        // whoever held the lock before us may already have refreshed
        if let Some(fresh) = self.fresh() {
            return Ok(fresh);
        }

        let snapshot = match self.provider.fetch_rate().await {
            Ok(rate) => {
                info!(%rate, "Exchange rate refreshed");
                RateSnapshot {
                    rate,
                    fetched_at: self.clock.now(),
                    source: RateSource::Provider,
                }
            }
            Err(err) => match self.fallback {
                FallbackPolicy::Fail => {
                    warn!("Exchange rate provider failed: {}", err);
                    return Err(match err {
                        AppError::ExchangeRateUnavailable(_) => err,
                        other => AppError::ExchangeRateUnavailable(other.to_string()),
                    });
                }
                FallbackPolicy::Fixed(rate) => {
                    warn!(%rate, "Exchange rate provider failed, using fixed fallback: {}", err);
                    RateSnapshot {
                        rate,
                        fetched_at: self.clock.now(),
                        source: RateSource::Fallback,
                    }
                }
            },
        };

        *self.current.write() = Some(snapshot);
        Ok(snapshot)
    }

    /// Drop the cached snapshot so the next read refreshes
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }

    fn fresh(&self) -> Option<RateSnapshot> {
        let now = self.clock.now();
        self.current
            .read()
            .filter(|s| now.signed_duration_since(s.fetched_at) < self.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use spacebook_core::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts calls and answers with a growing rate
    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateProvider for CountingProvider {
        async fn fetch_rate(&self) -> AppResult<Decimal> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(AppError::ExchangeRateUnavailable("offline".into()));
            }
            Ok(dec!(100) + Decimal::from(n as u64))
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn cache_with(
        provider: Arc<CountingProvider>,
        clock: Arc<ManualClock>,
        fallback: FallbackPolicy,
    ) -> ExchangeRateCache {
        ExchangeRateCache::new(provider, clock, Duration::from_secs(3600), fallback)
    }

    #[tokio::test]
    async fn test_hit_within_ttl_does_not_refetch() {
        let provider = Arc::new(CountingProvider::new());
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(provider.clone(), clock.clone(), FallbackPolicy::Fail);

        let first = cache.get_rate().await.unwrap();
        clock.advance(chrono::Duration::minutes(59));
        let second = cache.get_rate().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_expiry_triggers_one_refresh() {
        let provider = Arc::new(CountingProvider::new());
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(provider.clone(), clock.clone(), FallbackPolicy::Fail);

        assert_eq!(cache.get_rate().await.unwrap(), dec!(101));
        clock.advance(chrono::Duration::hours(1));
        assert_eq!(cache.get_rate().await.unwrap(), dec!(102));
        assert_eq!(cache.get_rate().await.unwrap(), dec!(102));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let provider = Arc::new(CountingProvider {
            delay: Duration::from_millis(50),
            ..CountingProvider::new()
        });
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(cache_with(
            provider.clone(),
            clock,
            FallbackPolicy::Fail,
        ));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_rate().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), dec!(101));
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_without_fallback_is_unavailable() {
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..CountingProvider::new()
        });
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(provider, clock, FallbackPolicy::Fail);

        let err = cache.get_rate().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "exchange_rate_unavailable");
    }

    #[tokio::test]
    async fn test_failure_with_fixed_fallback() {
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..CountingProvider::new()
        });
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(
            provider.clone(),
            clock,
            FallbackPolicy::Fixed(dec!(150.5)),
        );

        let snapshot = cache.snapshot().await.unwrap();
        assert_eq!(snapshot.rate, dec!(150.5));
        assert_eq!(snapshot.source, RateSource::Fallback);

        // the fallback is cached like any other value
        cache.get_rate().await.unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let provider = Arc::new(CountingProvider::new());
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(provider.clone(), clock, FallbackPolicy::Fail);

        cache.get_rate().await.unwrap();
        cache.invalidate();
        cache.get_rate().await.unwrap();
        assert_eq!(provider.calls(), 2);
    }
}
