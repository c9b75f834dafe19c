//! PostgreSQL admission transactions
//!
//! Every admission runs in one transaction that first takes
//! `pg_advisory_xact_lock(space_id, date_key)` for each slot it touches, in
//! ascending key order. Two admissions for the same space and date therefore
//! run one after the other, while different slots never wait on each other.
//!
//! Row locks always come after the advisory locks: the space row
//! (`FOR SHARE`), then reservation rows (`FOR UPDATE`), then quote rows.
//! The slot's existing rows are read `FOR UPDATE` so a concurrent
//! cancellation cannot slip between the overlap check and the write.
//! Cancellation locks a single reservation row and never waits on a slot
//! lock, so it cannot close a cycle with an admission.

use crate::errors::{foreign_key_constraint, storage_error};
use crate::repositories::installment_repo::{InstallmentRow, INSTALLMENT_COLUMNS};
use crate::repositories::reservation_repo::{ReservationRow, RESERVATION_COLUMNS};
use crate::repositories::space_repo::SpaceRow;
use async_trait::async_trait;
use spacebook_core::{
    models::{Installment, InstallmentDraft, Reservation, ReservationDraft, SlotKey, Space},
    traits::{AdmissionTx, BookingStore},
    AppError, AppResult,
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

/// Admission store backed by PostgreSQL
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgBookingStore {
    /// `lock_timeout_ms` bounds every lock wait inside an admission
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> AppResult<Box<dyn AdmissionTx>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Transaction(format!("Failed to start transaction: {}", e)))?;

        // SET does not take bind parameters; the value is a plain integer
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout_ms
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("set lock timeout", e))?;

        Ok(Box::new(PgAdmissionTx { tx }))
    }
}

/// One open admission transaction; rolled back on drop unless committed
pub struct PgAdmissionTx {
    tx: Transaction<'static, Postgres>,
}

const USER_FKEY: &str = "reservations_user_id_fkey";

/// Map a failed reservation write, naming the missing parent row
fn reservation_write_error(context: &str, draft: &ReservationDraft, err: sqlx::Error) -> AppError {
    match foreign_key_constraint(&err) {
        Some(USER_FKEY) => AppError::UserNotFound(draft.user_id.to_string()),
        Some(_) => AppError::SpaceNotFound(draft.space_id),
        None => storage_error(context, err),
    }
}

#[async_trait]
impl AdmissionTx for PgAdmissionTx {
    async fn find_space(&mut self, space_id: i32) -> AppResult<Option<Space>> {
        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(
            r#"
            SELECT id, name, description, price_per_hour, created_at, updated_at
            FROM spaces
            WHERE id = $1
            FOR SHARE
            "#,
        )
        .bind(space_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| storage_error("find space", e))?;

        Ok(row.map(Into::into))
    }

    async fn find_owned_reservation(
        &mut self,
        id: i32,
        user_id: i32,
    ) -> AppResult<Option<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservations WHERE id = $1 AND user_id = $2",
            RESERVATION_COLUMNS
        );
        let row = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| storage_error("find reservation", e))?;

        Ok(row.map(Into::into))
    }

    async fn find_owned_reservation_for_update(
        &mut self,
        id: i32,
        user_id: i32,
    ) -> AppResult<Option<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservations WHERE id = $1 AND user_id = $2 FOR UPDATE",
            RESERVATION_COLUMNS
        );
        let row = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| storage_error("lock reservation", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn lock_slot(&mut self, key: SlotKey) -> AppResult<()> {
        debug!("Acquiring slot lock");

        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(key.space_id)
            .bind(key.date_key())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| storage_error("acquire slot lock", e))?;

        Ok(())
    }

    async fn reservations_in_slot(
        &mut self,
        key: SlotKey,
        exclude: Option<i32>,
    ) -> AppResult<Vec<Reservation>> {
        let query = format!(
            r#"
            SELECT {} FROM reservations
            WHERE space_id = $1 AND date = $2 AND ($3::int IS NULL OR id <> $3)
            ORDER BY start_time
            FOR UPDATE
            "#,
            RESERVATION_COLUMNS
        );
        let rows = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&query)
            .bind(key.space_id)
            .bind(key.date)
            .bind(exclude)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| storage_error("read slot reservations", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_reservation(&mut self, draft: &ReservationDraft) -> AppResult<Reservation> {
        let query = format!(
            r#"
            INSERT INTO reservations (user_id, space_id, date, start_time, duration)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );
        let row = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&query)
            .bind(draft.user_id)
            .bind(draft.space_id)
            .bind(draft.date)
            .bind(draft.start_time)
            .bind(draft.duration)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| reservation_write_error("insert reservation", draft, e))?;

        Ok(row.into())
    }

    async fn update_reservation(
        &mut self,
        id: i32,
        draft: &ReservationDraft,
    ) -> AppResult<Reservation> {
        let query = format!(
            r#"
            UPDATE reservations
            SET space_id = $3, date = $4, start_time = $5, duration = $6, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );
        let row = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&query)
            .bind(id)
            .bind(draft.user_id)
            .bind(draft.space_id)
            .bind(draft.date)
            .bind(draft.start_time)
            .bind(draft.duration)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| reservation_write_error("update reservation", draft, e))?;

        row.map(Into::into).ok_or(AppError::ReservationNotFound(id))
    }

    async fn lock_installments(&mut self, reservation_id: i32) -> AppResult<Vec<Installment>> {
        let query = format!(
            "SELECT {} FROM quotes WHERE reservation_id = $1 ORDER BY due_date, id FOR UPDATE",
            INSTALLMENT_COLUMNS
        );
        let rows = sqlx::query_as::<sqlx::Postgres, InstallmentRow>(&query)
            .bind(reservation_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| storage_error("lock quotes", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn replace_installments(
        &mut self,
        reservation_id: i32,
        drafts: &[InstallmentDraft],
    ) -> AppResult<Vec<Installment>> {
        sqlx::query("DELETE FROM quotes WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| storage_error("clear quotes", e))?;

        let query = format!(
            r#"
            INSERT INTO quotes (reservation_id, due_date, amount, paid)
            VALUES ($1, $2, $3, FALSE)
            RETURNING {}
            "#,
            INSTALLMENT_COLUMNS
        );

        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let row = sqlx::query_as::<sqlx::Postgres, InstallmentRow>(&query)
                .bind(reservation_id)
                .bind(draft.due_date)
                .bind(draft.amount)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| storage_error("insert quote", e))?;
            created.push(row.into());
        }

        Ok(created)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            if crate::errors::is_transient(&e) {
                storage_error("commit admission", e)
            } else {
                AppError::Transaction(format!("Failed to commit transaction: {}", e))
            }
        })
    }
}
