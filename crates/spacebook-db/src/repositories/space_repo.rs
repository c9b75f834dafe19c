//! Space repository implementation

use crate::errors::storage_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use spacebook_core::{
    models::Space,
    traits::{Repository, SpaceRepository},
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, instrument};

/// PostgreSQL implementation of SpaceRepository
pub struct PgSpaceRepository {
    pool: PgPool,
}

impl PgSpaceRepository {
    /// Create a new space repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Space, i32> for PgSpaceRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Space>> {
        debug!("Finding space by id: {}", id);

        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(
            r#"
            SELECT id, name, description, price_per_hour, created_at, updated_at
            FROM spaces
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("find space", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Space>> {
        let (spaces, _) = self.search(None, false, limit, offset).await?;
        Ok(spaces)
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM spaces")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("count spaces", e))?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity), fields(name = %entity.name))]
    async fn create(&self, entity: &Space) -> AppResult<Space> {
        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(
            r#"
            INSERT INTO spaces (name, description, price_per_hour)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, price_per_hour, created_at, updated_at
            "#,
        )
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(entity.price_per_hour)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("create space", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity), fields(id = entity.id))]
    async fn update(&self, entity: &Space) -> AppResult<Space> {
        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(
            r#"
            UPDATE spaces
            SET name = $2,
                description = $3,
                price_per_hour = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, price_per_hour, created_at, updated_at
            "#,
        )
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(entity.price_per_hour)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("update space", e))?;

        row.map(Into::into)
            .ok_or(AppError::SpaceNotFound(entity.id))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        // reservations and quotes go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM spaces WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("delete space", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SpaceRepository for PgSpaceRepository {
    #[instrument(skip(self))]
    async fn search(
        &self,
        name: Option<&str>,
        descending: bool,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Space>, i64)> {
        let pattern = name
            .filter(|n| !n.trim().is_empty())
            .map(|n| format!("%{}%", n.trim()));
        let direction = if descending { "DESC" } else { "ASC" };

        let query = format!(
            r#"
            SELECT id, name, description, price_per_hour, created_at, updated_at
            FROM spaces
            WHERE ($1::text IS NULL OR name ILIKE $1)
            ORDER BY id {}
            LIMIT $2 OFFSET $3
            "#,
            direction
        );

        let rows = sqlx::query_as::<sqlx::Postgres, SpaceRow>(&query)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("search spaces", e))?;

        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM spaces WHERE ($1::text IS NULL OR name ILIKE $1)")
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage_error("count spaces", e))?;

        debug!("Space search matched {} rows", total.0);
        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SpaceRow {
    id: i32,
    name: String,
    description: Option<String>,
    price_per_hour: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SpaceRow> for Space {
    fn from(row: SpaceRow) -> Self {
        Space {
            id: row.id,
            name: row.name,
            description: row.description,
            price_per_hour: row.price_per_hour,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
