//! End-to-end admission tests over the in-memory store

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use common::*;
use futures::future::join_all;
use rust_decimal_macros::dec;
use spacebook_core::models::SlotKey;
use spacebook_core::traits::{
    AdmissionTx, BookingStore, InstallmentRepository, ReservationRepository,
};
use spacebook_core::{AppError, Clock};
use spacebook_db::MemoryStore;
use spacebook_rates::RateSource;

#[tokio::test]
async fn test_weekday_booking_is_priced_without_surcharge() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    let result = h
        .engine
        .create_reservation(user, request(space, weekday(), 9, 0, 3))
        .await
        .unwrap();

    assert_eq!(result.total_ves, dec!(150.00));
    assert_eq!(result.total_usd, dec!(1.00));
    assert!(result.installments.is_none());

    let details = &result.calculation_details;
    assert_eq!(details.base_per_hour, dec!(50));
    assert_eq!(details.duration_hours, 3);
    assert!(!details.weekend_applied);
    assert_eq!(details.factor, dec!(1));
    assert_eq!(details.exchange_rate, RATE);
    assert_eq!(details.rate_source, RateSource::Provider);

    let stored = h.store.find_owned(result.reservation_id, user).await.unwrap();
    assert_eq!(stored, Some(result.reservation));
}

#[tokio::test]
async fn test_weekend_surcharge() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(100)).await;

    let result = h
        .engine
        .create_reservation(user, request(space, saturday(), 10, 0, 2))
        .await
        .unwrap();

    assert_eq!(result.total_ves, dec!(240.00));
    assert!(result.calculation_details.weekend_applied);
    assert_eq!(result.calculation_details.factor, dec!(1.2));
}

#[tokio::test]
async fn test_overlapping_booking_is_rejected() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let luis = h.user("luis@example.com").await;
    let space = h.space(dec!(50)).await;

    h.engine
        .create_reservation(ana, request(space, weekday(), 9, 0, 3))
        .await
        .unwrap();

    let err = h
        .engine
        .create_reservation(luis, request(space, weekday(), 10, 0, 2))
        .await
        .unwrap_err();
    assert_eq!(err, AppError::OverlappedReservation);
    assert_eq!(err.error_code(), "overlapped_reservation");

    let booked = h.store.reservations_on(SlotKey::new(space, weekday()));
    assert_eq!(booked.len(), 1);
}

#[tokio::test]
async fn test_adjacent_bookings_and_other_days_are_allowed() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;
    let other_space = h.space(dec!(80)).await;

    h.engine
        .create_reservation(user, request(space, weekday(), 9, 0, 3))
        .await
        .unwrap();

    // ends exactly when the first one starts / starts when it ends
    h.engine
        .create_reservation(user, request(space, weekday(), 8, 0, 1))
        .await
        .unwrap();
    h.engine
        .create_reservation(user, request(space, weekday(), 12, 0, 2))
        .await
        .unwrap();

    // same hours elsewhere
    h.engine
        .create_reservation(user, request(other_space, weekday(), 9, 0, 3))
        .await
        .unwrap();
    h.engine
        .create_reservation(user, request(space, date(2024, 1, 9), 9, 0, 3))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_booking_past_closing_is_rejected() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    let err = h
        .engine
        .create_reservation(user, request(space, weekday(), 21, 0, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidHours { open: 8, close: 22 }));

    let err = h
        .engine
        .create_reservation(user, request(space, weekday(), 7, 0, 2))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_hours");

    // last admissible slot
    h.engine
        .create_reservation(user, request(space, weekday(), 20, 0, 2))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_space_is_checked_before_hours() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;

    let err = h
        .engine
        .create_reservation(user, request(999, weekday(), 23, 0, 5))
        .await
        .unwrap_err();
    assert_eq!(err, AppError::SpaceNotFound(999));
}

#[tokio::test]
async fn test_installments_sum_to_total() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(333.33)).await;

    let mut req = request(space, date(2024, 1, 31), 9, 0, 1);
    req.installments = Some(4);
    let result = h.engine.create_reservation(user, req).await.unwrap();

    assert_eq!(result.total_ves, dec!(333.33));
    let installments = result.installments.unwrap();
    assert_eq!(installments.len(), 4);

    let amounts: Vec<_> = installments.iter().map(|i| i.amount).collect();
    assert_eq!(amounts, vec![dec!(83.33), dec!(83.33), dec!(83.33), dec!(83.34)]);
    let sum: rust_decimal::Decimal = amounts.iter().sum();
    assert_eq!(sum, result.total_ves);

    let due: Vec<_> = installments.iter().map(|i| i.due_date).collect();
    assert_eq!(
        due,
        vec![
            date(2024, 1, 31),
            date(2024, 2, 29),
            date(2024, 3, 31),
            date(2024, 4, 30)
        ]
    );

    let stored = h.store.list_by_reservation(result.reservation_id).await.unwrap();
    assert_eq!(stored, installments);
}

#[tokio::test]
async fn test_single_installment_stores_none() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    let mut req = request(space, weekday(), 9, 0, 1);
    req.installments = Some(1);
    let result = h.engine.create_reservation(user, req).await.unwrap();

    assert!(result.installments.is_none());
    assert!(h
        .store
        .list_by_reservation(result.reservation_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_installment_count_limits() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    let mut req = request(space, weekday(), 9, 0, 1);
    req.installments = Some(0);
    let err = h.engine.create_reservation(user, req.clone()).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    req.installments = Some(25);
    let err = h.engine.create_reservation(user, req).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_rate_is_cached_for_an_hour() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    h.engine
        .create_reservation(user, request(space, weekday(), 9, 0, 1))
        .await
        .unwrap();
    h.clock.advance(chrono::Duration::minutes(59));
    h.engine
        .create_reservation(user, request(space, weekday(), 10, 0, 1))
        .await
        .unwrap();
    assert_eq!(h.provider.calls(), 1);

    h.clock.advance(chrono::Duration::minutes(2));
    let result = h
        .engine
        .create_reservation(user, request(space, weekday(), 11, 0, 1))
        .await
        .unwrap();
    assert_eq!(h.provider.calls(), 2);
    assert_eq!(result.calculation_details.rate_fetched_at, h.clock.now());
}

#[tokio::test]
async fn test_rate_failure_rolls_back_everything() {
    let h = Harness::with_provider(CountingProvider::failing());
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    let mut req = request(space, weekday(), 9, 0, 2);
    req.installments = Some(3);
    let err = h.engine.create_reservation(user, req).await.unwrap_err();

    assert!(matches!(err, AppError::ExchangeRateUnavailable(_)));
    assert!(err.is_retryable());
    assert!(h.store.reservations_on(SlotKey::new(space, weekday())).is_empty());
    assert!(h.store.list_by_user(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lock_wait_timeout_is_transient() {
    let store = MemoryStore::with_lock_timeout(Duration::from_millis(50));
    let h = Harness::with_store(store);
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    let mut blocker = h.store.begin().await.unwrap();
    blocker
        .lock_slot(SlotKey::new(space, weekday()))
        .await
        .unwrap();

    let err = h
        .engine
        .create_reservation(user, request(space, weekday(), 9, 0, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Transient(_)));
    assert!(err.is_retryable());

    drop(blocker);
    h.engine
        .create_reservation(user, request(space, weekday(), 9, 0, 1))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_for_one_slot_admit_exactly_one() {
    let h = Harness::new();
    let space = h.space(dec!(50)).await;
    let mut users = Vec::new();
    for i in 0..8 {
        users.push(h.user(&format!("guest{}@example.com", i)).await);
    }

    let handles = users.into_iter().map(|user| {
        let engine = Arc::clone(&h.engine);
        tokio::spawn(async move {
            engine
                .create_reservation(user, request(space, weekday(), 9, 0, 2))
                .await
        })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1);
    for rejected in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(rejected, &AppError::OverlappedReservation);
    }
    assert_eq!(h.store.reservations_on(SlotKey::new(space, weekday())).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_committed_reservations_never_overlap() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    // every half hour from 08:00 to 19:30, three hours each
    let handles = (0..24).map(|i| {
        let engine = Arc::clone(&h.engine);
        let (hour, minute) = (8 + i / 2, (i % 2) * 30);
        tokio::spawn(async move {
            engine
                .create_reservation(user, request(space, weekday(), hour, minute, 3))
                .await
        })
    });
    for joined in join_all(handles).await {
        match joined.unwrap() {
            Ok(_) | Err(AppError::OverlappedReservation) => {}
            Err(AppError::InvalidHours { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let booked = h.store.reservations_on(SlotKey::new(space, weekday()));
    assert!(!booked.is_empty());
    for (i, a) in booked.iter().enumerate() {
        assert!(a.start_time.hour() >= 8);
        assert!(a.start_time.hour() as i32 + a.duration <= 22);
        for b in booked.iter().skip(i + 1) {
            assert!(!a.slot().overlaps(&b.slot()), "{:?} overlaps {:?}", a, b);
        }
    }
}

#[tokio::test]
async fn test_reschedule_may_overlap_itself() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    let created = h
        .engine
        .create_reservation(user, request(space, weekday(), 9, 0, 2))
        .await
        .unwrap();

    let updated = h
        .engine
        .update_reservation(
            created.reservation_id,
            user,
            request(space, weekday(), 10, 0, 3),
        )
        .await
        .unwrap();

    assert_eq!(updated.reservation_id, created.reservation_id);
    assert_eq!(updated.total_ves, dec!(150.00));
    let booked = h.store.reservations_on(SlotKey::new(space, weekday()));
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].duration, 3);
    assert_eq!(booked[0].created_at, created.reservation.created_at);
}

#[tokio::test]
async fn test_reschedule_into_taken_slot_keeps_original() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let luis = h.user("luis@example.com").await;
    let space = h.space(dec!(50)).await;

    h.engine
        .create_reservation(ana, request(space, weekday(), 14, 0, 2))
        .await
        .unwrap();
    let mine = h
        .engine
        .create_reservation(luis, request(space, weekday(), 9, 0, 2))
        .await
        .unwrap();

    let err = h
        .engine
        .update_reservation(mine.reservation_id, luis, request(space, weekday(), 13, 0, 2))
        .await
        .unwrap_err();
    assert_eq!(err, AppError::OverlappedReservation);

    let stored = h
        .store
        .find_owned(mine.reservation_id, luis)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, mine.reservation);
}

#[tokio::test]
async fn test_reschedule_requires_ownership() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let luis = h.user("luis@example.com").await;
    let space = h.space(dec!(50)).await;

    let created = h
        .engine
        .create_reservation(ana, request(space, weekday(), 9, 0, 2))
        .await
        .unwrap();

    let err = h
        .engine
        .update_reservation(created.reservation_id, luis, request(space, weekday(), 15, 0, 1))
        .await
        .unwrap_err();
    assert_eq!(err, AppError::ReservationNotFound(created.reservation_id));

    let err = h
        .engine
        .update_reservation(4242, ana, request(space, weekday(), 15, 0, 1))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "reservation_not_found");
}

#[tokio::test]
async fn test_reschedule_replaces_installments() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(100)).await;

    let mut req = request(space, weekday(), 9, 0, 3);
    req.installments = Some(3);
    let created = h.engine.create_reservation(user, req).await.unwrap();
    let id = created.reservation_id;
    assert_eq!(h.store.list_by_reservation(id).await.unwrap().len(), 3);

    let mut req = request(space, saturday(), 9, 0, 1);
    req.installments = Some(2);
    let updated = h.engine.update_reservation(id, user, req).await.unwrap();
    let stored = h.store.list_by_reservation(id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(Some(stored), updated.installments);
    assert_eq!(updated.total_ves, dec!(120.00));

    h.engine
        .update_reservation(id, user, request(space, saturday(), 9, 0, 1))
        .await
        .unwrap();
    assert!(h.store.list_by_reservation(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reschedule_to_another_day_frees_the_old_slot() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let luis = h.user("luis@example.com").await;
    let space = h.space(dec!(50)).await;

    let created = h
        .engine
        .create_reservation(ana, request(space, weekday(), 9, 0, 2))
        .await
        .unwrap();
    h.engine
        .update_reservation(created.reservation_id, ana, request(space, saturday(), 9, 0, 2))
        .await
        .unwrap();

    h.engine
        .create_reservation(luis, request(space, weekday(), 9, 0, 2))
        .await
        .unwrap();
    assert_eq!(h.store.reservations_on(SlotKey::new(space, saturday())).len(), 1);
}

#[tokio::test]
async fn test_cancel_removes_reservation_and_installments() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let luis = h.user("luis@example.com").await;
    let space = h.space(dec!(50)).await;

    let mut req = request(space, weekday(), 9, 0, 2);
    req.installments = Some(2);
    let created = h.engine.create_reservation(ana, req).await.unwrap();
    let id = created.reservation_id;

    assert!(!h.engine.cancel_reservation(id, luis).await.unwrap());
    assert!(h.engine.cancel_reservation(id, ana).await.unwrap());
    assert!(!h.engine.cancel_reservation(id, ana).await.unwrap());

    assert!(h.store.find_owned(id, ana).await.unwrap().is_none());
    assert!(h.store.list_by_reservation(id).await.unwrap().is_empty());

    // the slot is free again
    h.engine
        .create_reservation(luis, request(space, weekday(), 9, 0, 2))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_result_serializes_for_clients() {
    let h = Harness::new();
    let user = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;

    let mut req = request(space, weekday(), 9, 0, 2);
    req.installments = Some(2);
    let result = h.engine.create_reservation(user, req).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["reservationId"], result.reservation_id);
    assert_eq!(json["totalVES"], "100.00");
    assert_eq!(json["totalUSD"], "0.66");
    assert_eq!(json["installments"].as_array().unwrap().len(), 2);
    assert_eq!(json["calculationDetails"]["weekendApplied"], false);
    assert_eq!(json["calculationDetails"]["rateSource"], "provider");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reschedule_and_bookings_on_one_day_all_complete() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let space = h.space(dec!(50)).await;
    let mine = h
        .engine
        .create_reservation(ana, request(space, weekday(), 9, 0, 1))
        .await
        .unwrap();

    let mut guests = Vec::new();
    for i in 0..6 {
        guests.push(h.user(&format!("guest{}@example.com", i)).await);
    }

    let mut handles = vec![{
        let engine = Arc::clone(&h.engine);
        let id = mine.reservation_id;
        tokio::spawn(async move {
            engine
                .update_reservation(id, ana, request(space, weekday(), 10, 0, 1))
                .await
                .map(|r| r.reservation_id)
        })
    }];
    for (i, guest) in guests.into_iter().enumerate() {
        let engine = Arc::clone(&h.engine);
        handles.push(tokio::spawn(async move {
            engine
                .create_reservation(guest, request(space, weekday(), 12 + i as u32, 0, 1))
                .await
                .map(|r| r.reservation_id)
        }));
    }

    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    let booked = h.store.reservations_on(SlotKey::new(space, weekday()));
    assert_eq!(booked.len(), 7);
    assert_eq!(booked[0].id, mine.reservation_id);
    assert_eq!(booked[0].start_time.hour(), 10);
}
