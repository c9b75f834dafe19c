//! Password hashing with Argon2id
//!
//! Hashes are stored in PHC string form (`$argon2id$v=19$...`), so the
//! parameters travel with each hash.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use spacebook_core::AppError;
use tracing::{debug, error};

/// Argon2 hashing service
#[derive(Debug, Clone, Default)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                AppError::PasswordHash(format!("Password hashing failed: {}", e))
            })
    }

    /// `Ok(false)` on a wrong password, `Err` only for a malformed hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "Stored password hash is malformed");
            AppError::PasswordHash(format!("Invalid password hash format: {}", e))
        })?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password mismatch");
                Ok(false)
            }
            Err(e) => Err(AppError::PasswordHash(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }

    /// Login check: any mismatch becomes `InvalidCredentials`
    pub fn check_credentials(&self, password: &str, hash: &str) -> Result<(), AppError> {
        match self.verify_password(password, hash) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::InvalidCredentials),
            // a corrupt hash must not reveal itself to the caller
            Err(_) => Err(AppError::InvalidCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_uses_argon2id() {
        let service = PasswordService::new();
        let hash = service.hash_password("secreto123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify_roundtrip_and_salting() {
        let service = PasswordService::new();
        let first = service.hash_password("secreto123").unwrap();
        let second = service.hash_password("secreto123").unwrap();

        assert_ne!(first, second);
        assert!(service.verify_password("secreto123", &first).unwrap());
        assert!(!service.verify_password("otro", &second).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        let service = PasswordService::new();
        assert!(matches!(
            service.verify_password("x", "not-a-hash"),
            Err(AppError::PasswordHash(_))
        ));
    }

    #[test]
    fn test_check_credentials() {
        let service = PasswordService::new();
        let hash = service.hash_password("contraseña").unwrap();

        assert!(service.check_credentials("contraseña", &hash).is_ok());
        assert_eq!(
            service.check_credentials("wrong", &hash),
            Err(AppError::InvalidCredentials)
        );
        assert_eq!(
            service.check_credentials("wrong", "garbage"),
            Err(AppError::InvalidCredentials)
        );
    }
}
