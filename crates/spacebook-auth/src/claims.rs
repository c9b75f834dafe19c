//! Token claims

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use spacebook_core::models::UserRole;

/// `sub` carries the numeric user id as a string, as registered claims require.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,

    /// Email at the time of issue
    pub email: String,

    pub role: UserRole,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims valid for `ttl_secs` from now
    ///
    /// ```
    /// use spacebook_auth::Claims;
    /// use spacebook_core::models::UserRole;
    ///
    /// let claims = Claims::new(7, "ana@example.com", UserRole::User, 60);
    /// assert_eq!(claims.user_id(), Some(7));
    /// assert_eq!(claims.exp - claims.iat, 60);
    /// ```
    pub fn new(user_id: i32, email: &str, role: UserRole, ttl_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        }
    }

    /// Numeric user id, if `sub` holds one
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}
