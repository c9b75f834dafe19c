//! Benchmarks for the admission hot path
//!
//! Run with: cargo bench --package spacebook-services
//!
//! Pricing and overlap checks are measured in isolation; the admission
//! benchmark drives the engine over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal_macros::dec;
use spacebook_core::models::{Reservation, Space, TimeSlot};
use spacebook_core::traits::Repository;
use spacebook_core::SystemClock;
use spacebook_db::MemoryStore;
use spacebook_rates::{ExchangeRateCache, FallbackPolicy, FixedRateProvider};
use spacebook_services::availability::has_overlap;
use spacebook_services::pricing::build_installments;
use spacebook_services::{PricingPolicy, ReservationEngine, ReservationRequest};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
}

fn reservation(id: i32, start_minute: u32) -> Reservation {
    let now = Utc::now();
    Reservation {
        id,
        user_id: 1,
        space_id: 1,
        date: monday(),
        start_time: NaiveTime::from_hms_opt(8 + start_minute / 60, start_minute % 60, 0).unwrap(),
        duration: 1,
        created_at: now,
        updated_at: now,
    }
}

fn bench_total_price(c: &mut Criterion) {
    let policy = PricingPolicy::default();
    let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();

    c.bench_function("calculate_total_price_weekend", |b| {
        b.iter(|| policy.calculate_total_price(black_box(dec!(33.335)), black_box(3), saturday));
    });
}

fn bench_installments(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_installments");

    for count in [2u32, 12, 24] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| build_installments(black_box(dec!(333.33)), count, monday()));
        });
    }

    group.finish();
}

fn bench_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("has_overlap");
    let candidate = TimeSlot::new(NaiveTime::from_hms_opt(21, 0, 0).unwrap(), 1);

    for size in [4usize, 14, 64] {
        // back-to-back hours that never reach the candidate
        let booked: Vec<Reservation> = (0..size)
            .map(|i| reservation(i as i32, (i as u32 % 13) * 60))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &booked, |b, booked| {
            b.iter(|| has_overlap(black_box(candidate), booked));
        });
    }

    group.finish();
}

fn bench_admission(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let rates = Arc::new(ExchangeRateCache::new(
        Arc::new(FixedRateProvider::new(dec!(150.5))),
        Arc::new(SystemClock),
        Duration::from_secs(3600),
        FallbackPolicy::Fail,
    ));
    let engine = ReservationEngine::new(
        store.clone(),
        rates,
        store.clone(),
        PricingPolicy::default(),
        24,
    );

    let now = Utc::now();
    let space = rt
        .block_on(Repository::<Space, i32>::create(
            store.as_ref(),
            &Space {
                id: 0,
                name: "Bench".into(),
                description: None,
                price_per_hour: dec!(50),
                created_at: now,
                updated_at: now,
            },
        ))
        .unwrap();

    // one fresh date per iteration keeps every admission conflict free
    let mut day = 0u64;
    let engine = &engine;
    c.bench_function("admit_and_cancel", |b| {
        b.to_async(&rt).iter(|| {
            day += 1;
            let req = ReservationRequest {
                space_id: space.id,
                date: monday() + chrono::Days::new(day),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                duration: 2,
                installments: Some(3),
            };
            async move {
                let result = engine.create_reservation(1, req).await.unwrap();
                engine
                    .cancel_reservation(result.reservation_id, 1)
                    .await
                    .unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_total_price,
    bench_installments,
    bench_overlap,
    bench_admission
);
criterion_main!(benches);
