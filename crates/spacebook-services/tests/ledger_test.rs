//! Installment ledger tests over the in-memory store

mod common;

use chrono::Duration;
use common::*;
use rust_decimal_macros::dec;
use spacebook_core::{AppError, Clock};

async fn booked_with_installments(h: &Harness, user: i32, count: u32) -> i32 {
    let space = h.space(dec!(100)).await;
    let mut req = request(space, date(2024, 1, 15), 9, 0, 3);
    req.installments = Some(count);
    h.engine
        .create_reservation(user, req)
        .await
        .unwrap()
        .reservation_id
}

#[tokio::test]
async fn test_owner_lists_installments_by_due_date() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let reservation = booked_with_installments(&h, ana, 3).await;

    let listed = h.ledger.list_by_reservation(reservation, ana).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.windows(2).all(|w| w[0].due_date <= w[1].due_date));
    assert_eq!(listed[0].due_date, date(2024, 1, 15));
    assert_eq!(listed[2].due_date, date(2024, 3, 15));
    assert!(listed.iter().all(|q| q.amount == dec!(100.00) && !q.paid));
}

#[tokio::test]
async fn test_other_users_see_an_empty_list() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let luis = h.user("luis@example.com").await;
    let reservation = booked_with_installments(&h, ana, 3).await;

    assert!(h
        .ledger
        .list_by_reservation(reservation, luis)
        .await
        .unwrap()
        .is_empty());
    assert!(h.ledger.list_by_reservation(9999, ana).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_paying_twice_keeps_first_timestamp() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let reservation = booked_with_installments(&h, ana, 2).await;
    let first = h.ledger.list_by_reservation(reservation, ana).await.unwrap()[0].clone();

    let paid = h.ledger.mark_paid(first.id, ana).await.unwrap();
    assert!(paid.paid);
    assert_eq!(paid.paid_at, Some(h.clock.now()));

    h.clock.advance(Duration::days(3));
    let again = h.ledger.mark_paid(first.id, ana).await.unwrap();
    assert_eq!(again, paid);

    let listed = h.ledger.list_by_reservation(reservation, ana).await.unwrap();
    assert!(listed[0].paid);
    assert!(!listed[1].paid);
    assert_eq!(listed[0].paid_at, paid.paid_at);
}

#[tokio::test]
async fn test_paying_someone_elses_installment_is_not_found() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let luis = h.user("luis@example.com").await;
    let reservation = booked_with_installments(&h, ana, 2).await;
    let first = h.ledger.list_by_reservation(reservation, ana).await.unwrap()[0].clone();

    let err = h.ledger.mark_paid(first.id, luis).await.unwrap_err();
    assert_eq!(err, AppError::InstallmentNotFound(first.id));
    assert_eq!(err.error_code(), "not_found");

    let err = h.ledger.mark_paid(777, ana).await.unwrap_err();
    assert_eq!(err, AppError::InstallmentNotFound(777));

    let listed = h.ledger.list_by_reservation(reservation, ana).await.unwrap();
    assert!(listed.iter().all(|q| !q.paid));
}

#[tokio::test]
async fn test_paid_installments_block_rescheduling() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let space = h.space(dec!(100)).await;

    let mut req = request(space, date(2024, 1, 15), 9, 0, 3);
    req.installments = Some(3);
    let created = h.engine.create_reservation(ana, req.clone()).await.unwrap();
    let first = created.installments.unwrap()[0].clone();
    let paid = h.ledger.mark_paid(first.id, ana).await.unwrap();

    let mut moved = request(space, date(2024, 1, 16), 10, 0, 2);
    moved.installments = Some(2);
    let err = h
        .engine
        .update_reservation(created.reservation_id, ana, moved)
        .await
        .unwrap_err();
    assert_eq!(err, AppError::InstallmentsPaid(created.reservation_id));

    let listed = h
        .ledger
        .list_by_reservation(created.reservation_id, ana)
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0], paid);
    assert!(listed[1..].iter().all(|q| !q.paid));

    let stored = h.store.reservations_on(created.reservation.slot_key());
    assert_eq!(stored, vec![created.reservation]);
}

#[tokio::test]
async fn test_unpaid_installments_are_rebuilt_on_reschedule() {
    let h = Harness::new();
    let ana = h.user("ana@example.com").await;
    let space = h.space(dec!(100)).await;

    let mut req = request(space, date(2024, 1, 15), 9, 0, 3);
    req.installments = Some(3);
    let created = h.engine.create_reservation(ana, req.clone()).await.unwrap();
    let old_ids: Vec<i32> = created.installments.unwrap().iter().map(|q| q.id).collect();

    h.engine
        .update_reservation(created.reservation_id, ana, req)
        .await
        .unwrap();

    let listed = h
        .ledger
        .list_by_reservation(created.reservation_id, ana)
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|q| !q.paid && !old_ids.contains(&q.id)));
}
