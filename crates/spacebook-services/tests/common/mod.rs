//! Shared fixtures for the service integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spacebook_core::models::{Space, User, UserRole};
use spacebook_core::traits::{RateProvider, Repository};
use spacebook_core::{AppError, AppResult, ManualClock};
use spacebook_db::MemoryStore;
use spacebook_rates::{ExchangeRateCache, FallbackPolicy};
use spacebook_services::{
    InstallmentLedger, PricingPolicy, ReservationEngine, ReservationRequest,
};

pub const RATE: Decimal = dec!(150.5);

/// Fixed-rate provider that counts calls and can be switched to failing
#[derive(Default)]
pub struct CountingProvider {
    pub calls: AtomicUsize,
    pub failing: bool,
}

impl CountingProvider {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for CountingProvider {
    async fn fetch_rate(&self) -> AppResult<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            Err(AppError::ExchangeRateUnavailable("provider down".into()))
        } else {
            Ok(RATE)
        }
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

pub struct Harness {
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub provider: Arc<CountingProvider>,
    pub engine: Arc<ReservationEngine>,
    pub ledger: InstallmentLedger,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(MemoryStore::new(), CountingProvider::default())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self::build(store, CountingProvider::default())
    }

    pub fn with_provider(provider: CountingProvider) -> Self {
        Self::build(MemoryStore::new(), provider)
    }

    fn build(store: MemoryStore, provider: CountingProvider) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap(),
        ));
        let provider = Arc::new(provider);
        let rates = Arc::new(ExchangeRateCache::new(
            provider.clone(),
            clock.clone(),
            Duration::from_secs(3600),
            FallbackPolicy::Fail,
        ));
        let shared = Arc::new(store.clone());
        let engine = Arc::new(ReservationEngine::new(
            shared.clone(),
            rates,
            shared.clone(),
            PricingPolicy::default(),
            24,
        ));
        let ledger = InstallmentLedger::new(shared, clock.clone());

        Self {
            store,
            clock,
            provider,
            engine,
            ledger,
        }
    }

    pub async fn user(&self, email: &str) -> i32 {
        let now = Utc::now();
        let user = User {
            id: 0,
            name: "Guest".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        };
        Repository::<User, i32>::create(&self.store, &user)
            .await
            .unwrap()
            .id
    }

    pub async fn space(&self, price_per_hour: Decimal) -> i32 {
        let now = Utc::now();
        let space = Space {
            id: 0,
            name: "Sala Caracas".into(),
            description: None,
            price_per_hour,
            created_at: now,
            updated_at: now,
        };
        Repository::<Space, i32>::create(&self.store, &space)
            .await
            .unwrap()
            .id
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monday
pub fn weekday() -> NaiveDate {
    date(2024, 1, 8)
}

/// Saturday
pub fn saturday() -> NaiveDate {
    date(2024, 1, 6)
}

pub fn request(space_id: i32, day: NaiveDate, h: u32, m: u32, duration: i32) -> ReservationRequest {
    ReservationRequest {
        space_id,
        date: day,
        start_time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
        duration,
        installments: None,
    }
}
