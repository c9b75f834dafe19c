//! Installment repository implementation
//!
//! Installments live in the `quotes` table.

use crate::errors::storage_error;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use spacebook_core::{models::Installment, traits::InstallmentRepository, AppResult};
use sqlx::PgPool;
use tracing::{debug, instrument};

pub(crate) const INSTALLMENT_COLUMNS: &str =
    "id, reservation_id, due_date, amount, paid, paid_at, created_at, updated_at";

/// PostgreSQL implementation of InstallmentRepository
pub struct PgInstallmentRepository {
    pool: PgPool,
}

impl PgInstallmentRepository {
    /// Create a new installment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstallmentRepository for PgInstallmentRepository {
    #[instrument(skip(self))]
    async fn reservation_owner(&self, reservation_id: i32) -> AppResult<Option<i32>> {
        let owner: Option<(i32,)> =
            sqlx::query_as("SELECT user_id FROM reservations WHERE id = $1")
                .bind(reservation_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error("find reservation owner", e))?;

        Ok(owner.map(|(id,)| id))
    }

    #[instrument(skip(self))]
    async fn list_by_reservation(&self, reservation_id: i32) -> AppResult<Vec<Installment>> {
        let query = format!(
            r#"
            SELECT {} FROM quotes
            WHERE reservation_id = $1
            ORDER BY due_date ASC, id ASC
            "#,
            INSTALLMENT_COLUMNS
        );
        let rows = sqlx::query_as::<sqlx::Postgres, InstallmentRow>(&query)
            .bind(reservation_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("list quotes", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_with_owner(&self, installment_id: i32) -> AppResult<Option<(Installment, i32)>> {
        let row = sqlx::query_as::<sqlx::Postgres, OwnedInstallmentRow>(
            r#"
            SELECT q.id, q.reservation_id, q.due_date, q.amount, q.paid, q.paid_at,
                   q.created_at, q.updated_at, r.user_id AS owner_id
            FROM quotes q
            JOIN reservations r ON r.id = q.reservation_id
            WHERE q.id = $1
            "#,
        )
        .bind(installment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("find quote", e))?;

        Ok(row.map(|r| {
            let owner = r.owner_id;
            (r.installment.into(), owner)
        }))
    }

    #[instrument(skip(self))]
    async fn mark_paid(
        &self,
        installment_id: i32,
        paid_at: DateTime<Utc>,
    ) -> AppResult<Option<Installment>> {
        debug!("Marking quote {} as paid", installment_id);

        // the paid = FALSE guard keeps paid_at from moving on a second call
        let query = format!(
            r#"
            UPDATE quotes
            SET paid = TRUE, paid_at = $2, updated_at = $2
            WHERE id = $1 AND paid = FALSE
            RETURNING {}
            "#,
            INSTALLMENT_COLUMNS
        );
        let row = sqlx::query_as::<sqlx::Postgres, InstallmentRow>(&query)
            .bind(installment_id)
            .bind(paid_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("mark quote paid", e))?;

        Ok(row.map(Into::into))
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct InstallmentRow {
    id: i32,
    reservation_id: i32,
    due_date: NaiveDate,
    amount: Decimal,
    paid: bool,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InstallmentRow> for Installment {
    fn from(row: InstallmentRow) -> Self {
        Installment {
            id: row.id,
            reservation_id: row.reservation_id,
            due_date: row.due_date,
            amount: row.amount,
            paid: row.paid,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OwnedInstallmentRow {
    #[sqlx(flatten)]
    installment: InstallmentRow,
    owner_id: i32,
}
