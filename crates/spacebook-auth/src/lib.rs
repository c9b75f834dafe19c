//! Authentication and authorization for Spacebook
//!
//! This crate provides JWT-based authentication, password hashing with Argon2,
//! and Actix-web extractors for role-based access control.
//!
//! # Examples
//!
//! ```no_run
//! use spacebook_auth::{Claims, JwtService, PasswordService};
//! use spacebook_core::models::UserRole;
//!
//! let jwt = JwtService::new("your-secret-key", 7200);
//! let token = jwt.issue(1, "ana@example.com", UserRole::User)?;
//! let claims: Claims = jwt.verify(&token)?;
//! assert_eq!(claims.user_id(), Some(1));
//!
//! let password_service = PasswordService::new();
//! let hash = password_service.hash_password("secure_password")?;
//! assert!(password_service.verify_password("secure_password", &hash)?);
//! # Ok::<(), spacebook_core::AppError>(())
//! ```

pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{AdminUser, AuthRejection, AuthenticatedUser};
pub use password::PasswordService;
