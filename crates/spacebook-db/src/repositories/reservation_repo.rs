//! Reservation repository implementation
//!
//! Read paths and owner-scoped cancellation. Inserts and reschedules happen
//! inside `PgBookingStore` transactions so they can hold the slot lock.

use super::installment_repo::InstallmentRow;
use super::space_repo::SpaceRow;
use crate::errors::storage_error;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use spacebook_core::{
    models::{Reservation, ReservationBundle, UserInfo, UserRole},
    traits::ReservationRepository,
    AppResult,
};
use sqlx::PgPool;
use tracing::{debug, info, instrument};

pub(crate) const RESERVATION_COLUMNS: &str =
    "id, user_id, space_id, date, start_time, duration, created_at, updated_at";

/// PostgreSQL implementation of ReservationRepository
pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    /// Create a new reservation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    #[instrument(skip(self))]
    async fn find_owned(&self, id: i32, user_id: i32) -> AppResult<Option<Reservation>> {
        debug!("Finding reservation {} for user {}", id, user_id);

        let query = format!(
            "SELECT {} FROM reservations WHERE id = $1 AND user_id = $2",
            RESERVATION_COLUMNS
        );
        let row = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("find reservation", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        let query = format!(
            r#"
            SELECT {} FROM reservations
            WHERE user_id = $1
            ORDER BY date DESC, start_time DESC, id DESC
            "#,
            RESERVATION_COLUMNS
        );
        let rows = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("list reservations by user", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_all(&self, limit: i64, offset: i64) -> AppResult<(Vec<Reservation>, i64)> {
        let query = format!(
            r#"
            SELECT {} FROM reservations
            ORDER BY date DESC, start_time DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
            RESERVATION_COLUMNS
        );
        let rows = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("list reservations", e))?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reservations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("count reservations", e))?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn delete_owned(&self, id: i32, user_id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("delete reservation", e))?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Reservation {} cancelled by user {}", id, user_id);
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn find_bundle(&self, id: i32, user_id: i32) -> AppResult<Option<ReservationBundle>> {
        let Some(reservation) = self.find_owned(id, user_id).await? else {
            return Ok(None);
        };

        let user: Option<(i32, String, String, String)> =
            sqlx::query_as("SELECT id, name, email, role FROM users WHERE id = $1")
                .bind(reservation.user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error("find bundle user", e))?;

        let space = sqlx::query_as::<sqlx::Postgres, SpaceRow>(
            r#"
            SELECT id, name, description, price_per_hour, created_at, updated_at
            FROM spaces WHERE id = $1
            "#,
        )
        .bind(reservation.space_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("find bundle space", e))?;

        let installments = sqlx::query_as::<sqlx::Postgres, InstallmentRow>(
            r#"
            SELECT id, reservation_id, due_date, amount, paid, paid_at, created_at, updated_at
            FROM quotes
            WHERE reservation_id = $1
            ORDER BY due_date ASC, id ASC
            "#,
        )
        .bind(reservation.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("find bundle quotes", e))?;

        // both sides are cascaded, so a missing parent means a concurrent delete
        let (Some((uid, name, email, role)), Some(space)) = (user, space) else {
            return Ok(None);
        };

        Ok(Some(ReservationBundle {
            reservation,
            user: UserInfo {
                id: uid,
                name,
                email,
                role: UserRole::from_str(&role).unwrap_or_default(),
            },
            space: space.into(),
            installments: installments.into_iter().map(Into::into).collect(),
        }))
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReservationRow {
    id: i32,
    user_id: i32,
    space_id: i32,
    date: NaiveDate,
    start_time: NaiveTime,
    duration: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            id: row.id,
            user_id: row.user_id,
            space_id: row.space_id,
            date: row.date,
            start_time: row.start_time,
            duration: row.duration,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_delete_owned_rejects_foreign_user() {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/spacebook".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        let repo = PgReservationRepository::new(pool);

        assert!(!repo.delete_owned(i32::MAX, i32::MAX).await.unwrap());
    }
}
