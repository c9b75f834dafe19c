//! User repository implementation
//!
//! Provides PostgreSQL-backed storage for accounts and their credentials.

use crate::errors::{is_unique_violation, storage_error};
use async_trait::async_trait;
use spacebook_core::{
    models::{User, UserRole},
    traits::{Repository, UserRepository},
    AppError, AppResult,
};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{debug, instrument};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

/// PostgreSQL implementation of UserRepository
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse user role from string
    fn parse_role(s: &str) -> UserRole {
        UserRole::from_str(s).unwrap_or_default()
    }

    fn map_row(row: PgRow) -> User {
        User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            role: Self::parse_role(row.get("role")),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl Repository<User, i32> for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        debug!("Finding user by id: {}", id);

        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query(&query)
            .bind(id)
            .map(Self::map_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("find user", e))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<User>> {
        debug!("Finding all users with limit {} offset {}", limit, offset);

        let query = format!(
            "SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .map(Self::map_row)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("list users", e))
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("count users", e))?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &User) -> AppResult<User> {
        debug!("Creating user: {}", entity.email);

        let query = format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query(&query)
            .bind(&entity.name)
            .bind(&entity.email)
            .bind(&entity.password_hash)
            .bind(entity.role.to_string())
            .map(Self::map_row)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::EmailInUse(entity.email.clone())
                } else {
                    storage_error("create user", e)
                }
            })
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &User) -> AppResult<User> {
        debug!("Updating user: {}", entity.id);

        let query = format!(
            r#"
            UPDATE users
            SET name = $2,
                email = $3,
                password_hash = $4,
                role = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query(&query)
            .bind(entity.id)
            .bind(&entity.name)
            .bind(&entity.email)
            .bind(&entity.password_hash)
            .bind(entity.role.to_string())
            .map(Self::map_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::EmailInUse(entity.email.clone())
                } else {
                    storage_error("update user", e)
                }
            })?
            .ok_or_else(|| AppError::UserNotFound(entity.id.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting user: {}", id);

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("delete user", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        debug!("Finding user by email");

        let query = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );
        sqlx::query(&query)
            .bind(email)
            .map(Self::map_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("find user by email", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_defaults_to_user() {
        assert_eq!(PgUserRepository::parse_role("admin"), UserRole::Admin);
        assert_eq!(PgUserRepository::parse_role("unknown"), UserRole::User);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_find_by_email_case_insensitive() {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/spacebook".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        let repo = PgUserRepository::new(pool);

        let found = repo.find_by_email("NOBODY@EXAMPLE.COM").await.unwrap();
        assert!(found.is_none());
    }
}
