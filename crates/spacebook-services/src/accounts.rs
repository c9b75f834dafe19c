//! Account service
//!
//! Registration, login and self-or-admin account management.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use spacebook_auth::{JwtService, PasswordService};
use spacebook_core::models::{User, UserInfo, UserRole};
use spacebook_core::traits::UserRepository;
use spacebook_core::{AppError, AppResult};
use tracing::{debug, info, instrument, warn};

/// Fields needed to open an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Partial account update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

/// Issued token and the user it was issued for
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: PasswordService,
    jwt: Arc<JwtService>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: Arc<JwtService>) -> Self {
        Self {
            users,
            passwords: PasswordService::new(),
            jwt,
        }
    }

    /// Self-service sign up; always creates a regular user
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub async fn register(&self, account: NewAccount) -> AppResult<UserInfo> {
        self.create_with_role(account, UserRole::User).await
    }

    /// Admin-initiated account creation with an explicit role
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub async fn create_user(&self, account: NewAccount, role: UserRole) -> AppResult<UserInfo> {
        self.create_with_role(account, role).await
    }

    async fn create_with_role(&self, account: NewAccount, role: UserRole) -> AppResult<UserInfo> {
        let email = normalize_email(&account.email);
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(%email, "Registration rejected: email in use");
            return Err(AppError::EmailInUse(email));
        }

        let now = Utc::now();
        let user = User {
            id: 0,
            name: account.name.trim().to_string(),
            email,
            password_hash: self.passwords.hash_password(&account.password)?,
            role,
            created_at: now,
            updated_at: now,
        };

        let created = self.users.create(&user).await?;
        info!(user_id = created.id, %role, "User created");
        Ok(UserInfo::from(created))
    }

    /// Exchange credentials for a bearer token.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResult> {
        let email = normalize_email(email);
        let user = self.users.find_by_email(&email).await?.ok_or_else(|| {
            info!(%email, "Login failed: unknown email");
            AppError::InvalidCredentials
        })?;

        self.passwords
            .check_credentials(password, &user.password_hash)
            .inspect_err(|_| info!(user_id = user.id, "Login failed: wrong password"))?;

        let token = self.jwt.issue(user.id, &user.email, user.role)?;
        info!(user_id = user.id, role = %user.role, "Login successful");

        Ok(LoginResult {
            token,
            expires_in: self.jwt.ttl_secs(),
            user: UserInfo::from(user),
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: i32) -> AppResult<UserInfo> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserInfo::from)
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    /// Page of users and the total count
    #[instrument(skip(self))]
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<(Vec<UserInfo>, i64)> {
        let users = self.users.find_all(limit, offset).await?;
        let total = self.users.count().await?;
        debug!(returned = users.len(), total, "Listed users");
        Ok((users.into_iter().map(UserInfo::from).collect(), total))
    }

    /// Apply `changes` to `user_id` on behalf of `actor_id`.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the actor is the user or an admin, or when a
    ///   non-admin tries to change a role
    /// - `UserNotFound` if the user does not exist
    /// - `EmailInUse` if the new email belongs to another account
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        user_id: i32,
        actor_id: i32,
        actor_role: UserRole,
        changes: AccountChanges,
    ) -> AppResult<UserInfo> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        if !user.can_be_managed_by(actor_id, actor_role) {
            warn!(user_id, actor_id, "Update rejected: not self or admin");
            return Err(AppError::Forbidden);
        }

        if let Some(role) = changes.role {
            if role != user.role && !actor_role.is_admin() {
                warn!(user_id, actor_id, "Role change rejected: admin only");
                return Err(AppError::Forbidden);
            }
            user.role = role;
        }

        if let Some(name) = changes.name {
            user.name = name.trim().to_string();
        }

        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            if email != user.email {
                if let Some(other) = self.users.find_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(AppError::EmailInUse(email));
                    }
                }
                user.email = email;
            }
        }

        if let Some(password) = changes.password {
            user.password_hash = self.passwords.hash_password(&password)?;
        }

        user.updated_at = Utc::now();
        let updated = self.users.update(&user).await?;
        info!(user_id, actor_id, "User updated");
        Ok(UserInfo::from(updated))
    }

    /// Delete `user_id` and, by cascade, their reservations.
    ///
    /// Returns false when the user does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i32, actor_id: i32, actor_role: UserRole) -> AppResult<bool> {
        if user_id != actor_id && !actor_role.is_admin() {
            warn!(user_id, actor_id, "Delete rejected: not self or admin");
            return Err(AppError::Forbidden);
        }

        let removed = self.users.delete(user_id).await?;
        if removed {
            info!(user_id, actor_id, "User deleted");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
