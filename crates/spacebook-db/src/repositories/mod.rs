//! Repository implementations
//!
//! Concrete implementations of the repository traits defined in
//! spacebook-core, using sqlx for PostgreSQL access.

pub mod installment_repo;
pub mod reservation_repo;
pub mod space_repo;
pub mod user_repo;

pub use installment_repo::PgInstallmentRepository;
pub use reservation_repo::PgReservationRepository;
pub use space_repo::PgSpaceRepository;
pub use user_repo::PgUserRepository;
