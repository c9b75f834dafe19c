//! Common traits for repositories, stores and collaborators
//!
//! Defines abstractions for database access, the admission transaction and
//! the exchange-rate provider.

use crate::error::AppError;
use crate::models::{
    Installment, InstallmentDraft, Reservation, ReservationBundle, ReservationDraft, SlotKey,
    Space, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    /// Find entity by ID
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;

    /// Find all entities with pagination
    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<T>, AppError>;

    /// Count total entities
    async fn count(&self) -> Result<i64, AppError>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<T, AppError>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> Result<T, AppError>;

    /// Delete entity by ID
    async fn delete(&self, id: ID) -> Result<bool, AppError>;
}

/// User repository trait with specialized methods
#[async_trait]
pub trait UserRepository: Repository<User, i32> {
    /// Find user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
}

/// Space repository trait with specialized methods
#[async_trait]
pub trait SpaceRepository: Repository<Space, i32> {
    /// Case-insensitive name search, ordered by id
    async fn search(
        &self,
        name: Option<&str>,
        descending: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Space>, i64), AppError>;
}

/// Reservation reads and owner-scoped deletes
///
/// Writes that must respect the overlap invariant go through [`BookingStore`].
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Find a reservation only if `user_id` owns it
    async fn find_owned(&self, id: i32, user_id: i32) -> Result<Option<Reservation>, AppError>;

    /// All reservations of one user, newest date first
    async fn list_by_user(&self, user_id: i32) -> Result<Vec<Reservation>, AppError>;

    /// Every reservation, paginated
    async fn list_all(&self, limit: i64, offset: i64)
        -> Result<(Vec<Reservation>, i64), AppError>;

    /// Hard delete; false when missing or owned by someone else
    async fn delete_owned(&self, id: i32, user_id: i32) -> Result<bool, AppError>;

    /// Reservation joined with its user, space and installments
    async fn find_bundle(
        &self,
        id: i32,
        user_id: i32,
    ) -> Result<Option<ReservationBundle>, AppError>;
}

/// Installment persistence
#[async_trait]
pub trait InstallmentRepository: Send + Sync {
    /// Owner of the reservation, if it exists
    async fn reservation_owner(&self, reservation_id: i32) -> Result<Option<i32>, AppError>;

    /// Installments of a reservation ordered by due date, then id
    async fn list_by_reservation(&self, reservation_id: i32)
        -> Result<Vec<Installment>, AppError>;

    /// Installment together with the user owning its reservation
    async fn find_with_owner(
        &self,
        installment_id: i32,
    ) -> Result<Option<(Installment, i32)>, AppError>;

    /// Flip `paid` to true if it is still false.
    ///
    /// Returns `None` when the row was already paid (or vanished), in which
    /// case nothing was written.
    async fn mark_paid(
        &self,
        installment_id: i32,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Installment>, AppError>;
}

/// Transactional store used by the admission engine
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Open a new admission transaction
    async fn begin(&self) -> Result<Box<dyn AdmissionTx>, AppError>;
}

/// One atomic admission attempt.
///
/// Dropping the value without calling [`AdmissionTx::commit`] rolls back
/// every write made through it.
///
/// Locks are taken in one order by every caller: slot locks (ascending
/// [`SlotKey`]), then the space row, then reservation rows, then their
/// installment rows.
#[async_trait]
pub trait AdmissionTx: Send {
    async fn find_space(&mut self, space_id: i32) -> Result<Option<Space>, AppError>;

    /// Owned reservation as currently committed, without locking it
    async fn find_owned_reservation(
        &mut self,
        id: i32,
        user_id: i32,
    ) -> Result<Option<Reservation>, AppError>;

    /// Owned reservation, locked against concurrent reschedules and cancels.
    /// Callers must already hold the slot lock of the reservation.
    async fn find_owned_reservation_for_update(
        &mut self,
        id: i32,
        user_id: i32,
    ) -> Result<Option<Reservation>, AppError>;

    /// Block until no other transaction holds `key`; held until commit or
    /// rollback. Locking a key this transaction already holds returns at once.
    async fn lock_slot(&mut self, key: SlotKey) -> Result<(), AppError>;

    /// Reservations in `key`, optionally excluding one id
    async fn reservations_in_slot(
        &mut self,
        key: SlotKey,
        exclude: Option<i32>,
    ) -> Result<Vec<Reservation>, AppError>;

    async fn insert_reservation(
        &mut self,
        draft: &ReservationDraft,
    ) -> Result<Reservation, AppError>;

    async fn update_reservation(
        &mut self,
        id: i32,
        draft: &ReservationDraft,
    ) -> Result<Reservation, AppError>;

    /// Current installments of a reservation, locked against concurrent payment
    async fn lock_installments(
        &mut self,
        reservation_id: i32,
    ) -> Result<Vec<Installment>, AppError>;

    /// Delete the current installment set and insert `drafts` in its place
    async fn replace_installments(
        &mut self,
        reservation_id: i32,
        drafts: &[InstallmentDraft],
    ) -> Result<Vec<Installment>, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

/// Source of the VES per USD exchange rate
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetch a fresh rate; may fail or time out
    async fn fetch_rate(&self) -> Result<Decimal, AppError>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// Largest page size a client may request
    pub const MAX_PER_PAGE: i64 = 100;

    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };

        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10);
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 500);
        assert_eq!(p.per_page, 100);
    }

    #[test]
    fn test_pagination_meta() {
        assert_eq!(PaginationMeta::new(95, 1, 10).total_pages, 10);
        assert_eq!(PaginationMeta::new(101, 1, 10).total_pages, 11);
        assert_eq!(PaginationMeta::new(0, 1, 10).total_pages, 0);
    }
}
