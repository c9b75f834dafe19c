//! Bearer token signing and verification
//!
//! Tokens are HS256 JWTs whose subject is the numeric user id. Expiry is
//! enforced with zero leeway, so a token is rejected the second its `exp`
//! passes.

use crate::claims::Claims;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use spacebook_core::models::UserRole;
use spacebook_core::{AppError, AppResult};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct JwtService {
    ttl_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    /// ```
    /// use spacebook_auth::JwtService;
    ///
    /// let jwt = JwtService::new("my-secret-key", 7200);
    /// assert_eq!(jwt.ttl_secs(), 7200);
    /// ```
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            ttl_secs,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Lifetime of issued tokens, reported to clients as `expiresIn`
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Token for a signed-in user, valid for [`ttl_secs`](Self::ttl_secs)
    pub fn issue(&self, user_id: i32, email: &str, role: UserRole) -> AppResult<String> {
        debug!(user_id, %role, "Issuing token");
        self.sign(&Claims::new(user_id, email, role, self.ttl_secs))
    }

    pub fn sign(&self, claims: &Claims) -> AppResult<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::InvalidToken(format!("Token creation failed: {}", e)))
    }

    /// Claims of a token signed by this service
    ///
    /// # Errors
    ///
    /// `TokenExpired` once `exp` has passed, `InvalidToken` for anything else
    /// that fails to verify, including a subject that is not a user id.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => {
                    warn!(error = %e, "Rejected token");
                    AppError::InvalidToken(e.to_string())
                }
            })?
            .claims;

        if claims.user_id().is_none() {
            warn!(sub = %claims.sub, "Token subject is not a user id");
            return Err(AppError::InvalidToken("Malformed subject".to_string()));
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
