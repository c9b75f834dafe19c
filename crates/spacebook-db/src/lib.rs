//! Spacebook Database Layer
//!
//! This crate provides storage for the Spacebook booking backend. It includes:
//!
//! - Connection pool management and embedded migrations with sqlx
//! - PostgreSQL repository implementations for all domain entities
//! - `PgBookingStore`, the admission transaction serialized per (space, date)
//! - `MemoryStore`, an in-process implementation of every storage trait
//!   guarded by a keyed slot lock

pub mod booking_store;
mod errors;
pub mod memory;
pub mod pool;
pub mod repositories;
pub mod slot_locks;

pub use booking_store::PgBookingStore;
pub use memory::MemoryStore;
pub use pool::{create_pool, run_migrations};
pub use repositories::*;
pub use slot_locks::KeyedLocks;

// Re-export commonly used types
pub use spacebook_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
