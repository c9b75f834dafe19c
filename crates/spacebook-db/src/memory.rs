//! In-memory storage
//!
//! `MemoryStore` implements every storage trait without a database. Admission
//! transactions serialize on an in-process [`KeyedLocks`] keyed by
//! (space, date) and stage their writes, applying them in one step on commit.
//! It backs the integration tests and single-process deployments that do not
//! need durability.

use crate::slot_locks::KeyedLocks;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use spacebook_core::{
    models::{
        Installment, InstallmentDraft, Reservation, ReservationBundle, ReservationDraft, SlotKey,
        Space, User, UserInfo,
    },
    traits::{
        AdmissionTx, BookingStore, InstallmentRepository, Repository, ReservationRepository,
        SpaceRepository, UserRepository,
    },
    AppError, AppResult,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    spaces: BTreeMap<i32, Space>,
    reservations: BTreeMap<i32, Reservation>,
    installments: BTreeMap<i32, Installment>,
}

impl Tables {
    fn drop_reservation(&mut self, id: i32) {
        self.reservations.remove(&id);
        self.installments.retain(|_, q| q.reservation_id != id);
    }
}

struct Inner {
    tables: RwLock<Tables>,
    next_user: AtomicI32,
    next_space: AtomicI32,
    next_reservation: AtomicI32,
    next_installment: AtomicI32,
    slot_locks: KeyedLocks<SlotKey>,
    row_locks: KeyedLocks<i32>,
    lock_timeout: Duration,
}

/// Process-local implementation of all storage traits
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Lock waits longer than `lock_timeout` fail with `AppError::Transient`
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                next_user: AtomicI32::new(1),
                next_space: AtomicI32::new(1),
                next_reservation: AtomicI32::new(1),
                next_installment: AtomicI32::new(1),
                slot_locks: KeyedLocks::new(),
                row_locks: KeyedLocks::new(),
                lock_timeout,
            }),
        }
    }

    /// Every reservation on one space and date, ordered by start time
    pub fn reservations_on(&self, key: SlotKey) -> Vec<Reservation> {
        let tables = self.inner.tables.read();
        let mut found: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|r| r.slot_key() == key)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.start_time);
        found
    }
}

impl Inner {
    async fn lock_row(&self, id: i32) -> AppResult<OwnedMutexGuard<()>> {
        self.row_locks
            .acquire(id, self.lock_timeout)
            .await
            .ok_or_else(|| {
                warn!("Timed out waiting for reservation {} lock", id);
                AppError::Transient(format!("lock wait on reservation {} timed out", id))
            })
    }
}

// ==================== Users ====================

#[async_trait]
impl Repository<User, i32> for MemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.inner.tables.read().users.get(&id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<User>> {
        let tables = self.inner.tables.read();
        Ok(page(tables.users.values(), limit, offset))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.inner.tables.read().users.len() as i64)
    }

    async fn create(&self, entity: &User) -> AppResult<User> {
        let mut tables = self.inner.tables.write();
        if email_taken(&tables, &entity.email, None) {
            return Err(AppError::EmailInUse(entity.email.clone()));
        }

        let now = Utc::now();
        let user = User {
            id: self.inner.next_user.fetch_add(1, Ordering::SeqCst),
            created_at: now,
            updated_at: now,
            ..entity.clone()
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, entity: &User) -> AppResult<User> {
        let mut tables = self.inner.tables.write();
        if email_taken(&tables, &entity.email, Some(entity.id)) {
            return Err(AppError::EmailInUse(entity.email.clone()));
        }

        let stored = tables
            .users
            .get_mut(&entity.id)
            .ok_or_else(|| AppError::UserNotFound(entity.id.to_string()))?;
        *stored = User {
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..entity.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tables = self.inner.tables.write();
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        let owned: Vec<i32> = tables
            .reservations
            .values()
            .filter(|r| r.user_id == id)
            .map(|r| r.id)
            .collect();
        for reservation_id in owned {
            tables.drop_reservation(reservation_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.inner.tables.read();
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

fn email_taken(tables: &Tables, email: &str, except: Option<i32>) -> bool {
    tables
        .users
        .values()
        .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except)
}

fn page<'a, T: Clone + 'a>(items: impl Iterator<Item = &'a T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

// ==================== Spaces ====================

#[async_trait]
impl Repository<Space, i32> for MemoryStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Space>> {
        Ok(self.inner.tables.read().spaces.get(&id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Space>> {
        let tables = self.inner.tables.read();
        Ok(page(tables.spaces.values(), limit, offset))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.inner.tables.read().spaces.len() as i64)
    }

    async fn create(&self, entity: &Space) -> AppResult<Space> {
        let now = Utc::now();
        let space = Space {
            id: self.inner.next_space.fetch_add(1, Ordering::SeqCst),
            created_at: now,
            updated_at: now,
            ..entity.clone()
        };
        self.inner
            .tables
            .write()
            .spaces
            .insert(space.id, space.clone());
        Ok(space)
    }

    async fn update(&self, entity: &Space) -> AppResult<Space> {
        let mut tables = self.inner.tables.write();
        let stored = tables
            .spaces
            .get_mut(&entity.id)
            .ok_or(AppError::SpaceNotFound(entity.id))?;
        *stored = Space {
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..entity.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tables = self.inner.tables.write();
        if tables.spaces.remove(&id).is_none() {
            return Ok(false);
        }
        let booked: Vec<i32> = tables
            .reservations
            .values()
            .filter(|r| r.space_id == id)
            .map(|r| r.id)
            .collect();
        for reservation_id in booked {
            tables.drop_reservation(reservation_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl SpaceRepository for MemoryStore {
    async fn search(
        &self,
        name: Option<&str>,
        descending: bool,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Space>, i64)> {
        let needle = name
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty());
        let tables = self.inner.tables.read();

        let mut matched: Vec<&Space> = tables
            .spaces
            .values()
            .filter(|s| match &needle {
                Some(n) => s.name.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .collect();
        if descending {
            matched.reverse();
        }

        let total = matched.len() as i64;
        Ok((page(matched.into_iter(), limit, offset), total))
    }
}

// ==================== Reservations ====================

#[async_trait]
impl ReservationRepository for MemoryStore {
    async fn find_owned(&self, id: i32, user_id: i32) -> AppResult<Option<Reservation>> {
        let tables = self.inner.tables.read();
        Ok(tables
            .reservations
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        let tables = self.inner.tables.read();
        let mut owned: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            (b.date, b.start_time, b.id).cmp(&(a.date, a.start_time, a.id))
        });
        Ok(owned)
    }

    async fn list_all(&self, limit: i64, offset: i64) -> AppResult<(Vec<Reservation>, i64)> {
        let tables = self.inner.tables.read();
        let mut all: Vec<&Reservation> = tables.reservations.values().collect();
        all.sort_by(|a, b| {
            (b.date, b.start_time, b.id).cmp(&(a.date, a.start_time, a.id))
        });
        let total = all.len() as i64;
        Ok((page(all.into_iter(), limit, offset), total))
    }

    #[instrument(skip(self))]
    async fn delete_owned(&self, id: i32, user_id: i32) -> AppResult<bool> {
        let _row = self.inner.lock_row(id).await?;

        let mut tables = self.inner.tables.write();
        let owned = tables
            .reservations
            .get(&id)
            .map(|r| r.user_id == user_id)
            .unwrap_or(false);
        if owned {
            tables.drop_reservation(id);
            info!("Reservation {} cancelled by user {}", id, user_id);
        }
        Ok(owned)
    }

    async fn find_bundle(&self, id: i32, user_id: i32) -> AppResult<Option<ReservationBundle>> {
        let tables = self.inner.tables.read();
        let Some(reservation) = tables
            .reservations
            .get(&id)
            .filter(|r| r.user_id == user_id)
        else {
            return Ok(None);
        };
        let (Some(user), Some(space)) = (
            tables.users.get(&reservation.user_id),
            tables.spaces.get(&reservation.space_id),
        ) else {
            return Ok(None);
        };

        Ok(Some(ReservationBundle {
            reservation: reservation.clone(),
            user: UserInfo::from(user),
            space: space.clone(),
            installments: installments_of(&tables, id),
        }))
    }
}

fn installments_of(tables: &Tables, reservation_id: i32) -> Vec<Installment> {
    let mut found: Vec<Installment> = tables
        .installments
        .values()
        .filter(|q| q.reservation_id == reservation_id)
        .cloned()
        .collect();
    found.sort_by_key(|q| (q.due_date, q.id));
    found
}

// ==================== Installments ====================

#[async_trait]
impl InstallmentRepository for MemoryStore {
    async fn reservation_owner(&self, reservation_id: i32) -> AppResult<Option<i32>> {
        let tables = self.inner.tables.read();
        Ok(tables.reservations.get(&reservation_id).map(|r| r.user_id))
    }

    async fn list_by_reservation(&self, reservation_id: i32) -> AppResult<Vec<Installment>> {
        Ok(installments_of(&self.inner.tables.read(), reservation_id))
    }

    async fn find_with_owner(&self, installment_id: i32) -> AppResult<Option<(Installment, i32)>> {
        let tables = self.inner.tables.read();
        Ok(tables.installments.get(&installment_id).and_then(|q| {
            tables
                .reservations
                .get(&q.reservation_id)
                .map(|r| (q.clone(), r.user_id))
        }))
    }

    async fn mark_paid(
        &self,
        installment_id: i32,
        paid_at: chrono::DateTime<Utc>,
    ) -> AppResult<Option<Installment>> {
        let mut tables = self.inner.tables.write();
        Ok(tables
            .installments
            .get_mut(&installment_id)
            .and_then(|q| q.settle(paid_at).then(|| q.clone())))
    }
}

// ==================== Admission ====================

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn AdmissionTx>> {
        Ok(Box::new(MemoryAdmissionTx {
            inner: Arc::clone(&self.inner),
            held_slots: Vec::new(),
            guards: Vec::new(),
            staged: Vec::new(),
        }))
    }
}

enum Staged {
    Insert(Reservation),
    Update(Reservation),
    ReplaceInstallments {
        reservation_id: i32,
        installments: Vec<Installment>,
    },
}

/// Admission transaction over [`MemoryStore`]
///
/// Holds its lock guards until dropped, so the slot stays serialized through
/// commit. Staged writes are discarded if the value is dropped uncommitted.
pub struct MemoryAdmissionTx {
    inner: Arc<Inner>,
    held_slots: Vec<SlotKey>,
    guards: Vec<OwnedMutexGuard<()>>,
    staged: Vec<Staged>,
}

impl MemoryAdmissionTx {
    fn staged_reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.staged.iter().filter_map(|op| match op {
            Staged::Insert(r) | Staged::Update(r) => Some(r),
            Staged::ReplaceInstallments { .. } => None,
        })
    }
}

#[async_trait]
impl AdmissionTx for MemoryAdmissionTx {
    async fn find_space(&mut self, space_id: i32) -> AppResult<Option<Space>> {
        Ok(self.inner.tables.read().spaces.get(&space_id).cloned())
    }

    async fn find_owned_reservation(
        &mut self,
        id: i32,
        user_id: i32,
    ) -> AppResult<Option<Reservation>> {
        let tables = self.inner.tables.read();
        Ok(tables
            .reservations
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn find_owned_reservation_for_update(
        &mut self,
        id: i32,
        user_id: i32,
    ) -> AppResult<Option<Reservation>> {
        let guard = self.inner.lock_row(id).await?;
        self.guards.push(guard);

        let tables = self.inner.tables.read();
        Ok(tables
            .reservations
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn lock_slot(&mut self, key: SlotKey) -> AppResult<()> {
        if self.held_slots.contains(&key) {
            return Ok(());
        }
        debug!(space_id = key.space_id, date = %key.date, "Acquiring slot lock");
        let guard = self
            .inner
            .slot_locks
            .acquire(key, self.inner.lock_timeout)
            .await
            .ok_or_else(|| {
                warn!(space_id = key.space_id, date = %key.date, "Slot lock wait timed out");
                AppError::Transient(format!(
                    "lock wait on space {} for {} timed out",
                    key.space_id, key.date
                ))
            })?;
        self.guards.push(guard);
        self.held_slots.push(key);
        Ok(())
    }

    async fn reservations_in_slot(
        &mut self,
        key: SlotKey,
        exclude: Option<i32>,
    ) -> AppResult<Vec<Reservation>> {
        let mut found: BTreeMap<i32, Reservation> = {
            let tables = self.inner.tables.read();
            tables
                .reservations
                .values()
                .filter(|r| r.slot_key() == key)
                .map(|r| (r.id, r.clone()))
                .collect()
        };
        // our own staged writes win over the committed rows
        for staged in self.staged_reservations() {
            if staged.slot_key() == key {
                found.insert(staged.id, staged.clone());
            } else {
                found.remove(&staged.id);
            }
        }
        if let Some(id) = exclude {
            found.remove(&id);
        }
        Ok(found.into_values().collect())
    }

    async fn insert_reservation(&mut self, draft: &ReservationDraft) -> AppResult<Reservation> {
        let now = Utc::now();
        let reservation = Reservation {
            id: self.inner.next_reservation.fetch_add(1, Ordering::SeqCst),
            user_id: draft.user_id,
            space_id: draft.space_id,
            date: draft.date,
            start_time: draft.start_time,
            duration: draft.duration,
            created_at: now,
            updated_at: now,
        };
        self.staged.push(Staged::Insert(reservation.clone()));
        Ok(reservation)
    }

    async fn update_reservation(
        &mut self,
        id: i32,
        draft: &ReservationDraft,
    ) -> AppResult<Reservation> {
        let created_at = {
            let tables = self.inner.tables.read();
            tables
                .reservations
                .get(&id)
                .filter(|r| r.user_id == draft.user_id)
                .map(|r| r.created_at)
                .ok_or(AppError::ReservationNotFound(id))?
        };
        let reservation = Reservation {
            id,
            user_id: draft.user_id,
            space_id: draft.space_id,
            date: draft.date,
            start_time: draft.start_time,
            duration: draft.duration,
            created_at,
            updated_at: Utc::now(),
        };
        self.staged.push(Staged::Update(reservation.clone()));
        Ok(reservation)
    }

    async fn lock_installments(&mut self, reservation_id: i32) -> AppResult<Vec<Installment>> {
        // payments racing this transaction are caught again on commit
        Ok(installments_of(&self.inner.tables.read(), reservation_id))
    }

    async fn replace_installments(
        &mut self,
        reservation_id: i32,
        drafts: &[InstallmentDraft],
    ) -> AppResult<Vec<Installment>> {
        let now = Utc::now();
        let installments: Vec<Installment> = drafts
            .iter()
            .map(|d| Installment {
                id: self.inner.next_installment.fetch_add(1, Ordering::SeqCst),
                reservation_id,
                due_date: d.due_date,
                amount: d.amount,
                paid: false,
                paid_at: None,
                created_at: now,
                updated_at: now,
            })
            .collect();
        self.staged.push(Staged::ReplaceInstallments {
            reservation_id,
            installments: installments.clone(),
        });
        Ok(installments)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryAdmissionTx {
            inner,
            guards: _guards,
            staged,
            ..
        } = *self;
        let mut tables = inner.tables.write();

        // check every foreign key before touching anything
        for staged in &staged {
            match staged {
                Staged::Insert(r) | Staged::Update(r) => {
                    if matches!(staged, Staged::Update(_))
                        && !tables.reservations.contains_key(&r.id)
                    {
                        return Err(AppError::ReservationNotFound(r.id));
                    }
                    if !tables.users.contains_key(&r.user_id) {
                        return Err(AppError::UserNotFound(r.user_id.to_string()));
                    }
                    if !tables.spaces.contains_key(&r.space_id) {
                        return Err(AppError::SpaceNotFound(r.space_id));
                    }
                }
                Staged::ReplaceInstallments { reservation_id, .. } => {
                    let paid = tables
                        .installments
                        .values()
                        .any(|q| q.reservation_id == *reservation_id && q.paid);
                    if paid {
                        return Err(AppError::InstallmentsPaid(*reservation_id));
                    }
                }
            }
        }

        for staged in staged {
            match staged {
                Staged::Insert(r) | Staged::Update(r) => {
                    tables.reservations.insert(r.id, r);
                }
                Staged::ReplaceInstallments {
                    reservation_id,
                    installments,
                } => {
                    tables
                        .installments
                        .retain(|_, q| q.reservation_id != reservation_id);
                    for q in installments {
                        tables.installments.insert(q.id, q);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal_macros::dec;
    use spacebook_core::models::UserRole;

    fn user(email: &str) -> User {
        User {
            id: 0,
            name: "Test".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: UserRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn space(name: &str) -> Space {
        Space {
            id: 0,
            name: name.into(),
            description: None,
            price_per_hour: dec!(50.00),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn draft(user_id: i32, space_id: i32) -> ReservationDraft {
        ReservationDraft {
            user_id,
            space_id,
            date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration: 3,
        }
    }

    #[tokio::test]
    async fn test_unique_email() {
        let store = MemoryStore::new();
        Repository::<User, i32>::create(&store, &user("a@example.com")).await.unwrap();
        let err = Repository::<User, i32>::create(&store, &user("A@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "email_in_use");
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        let u = Repository::<User, i32>::create(&store, &user("a@example.com")).await.unwrap();
        let s = Repository::<Space, i32>::create(&store, &space("Sala")).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.lock_slot(draft(u.id, s.id).slot_key()).await.unwrap();
            tx.insert_reservation(&draft(u.id, s.id)).await.unwrap();
        }

        assert!(store.list_by_user(u.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_applies_reservation_and_installments() {
        let store = MemoryStore::new();
        let u = Repository::<User, i32>::create(&store, &user("a@example.com")).await.unwrap();
        let s = Repository::<Space, i32>::create(&store, &space("Sala")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let r = tx.insert_reservation(&draft(u.id, s.id)).await.unwrap();
        tx.replace_installments(
            r.id,
            &[InstallmentDraft {
                due_date: r.date,
                amount: dec!(150.00),
            }],
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.list_by_user(u.id).await.unwrap().len(), 1);
        assert_eq!(store.list_by_reservation(r.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_rejects_missing_space() {
        let store = MemoryStore::new();
        let u = Repository::<User, i32>::create(&store, &user("a@example.com")).await.unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_reservation(&draft(u.id, 42)).await.unwrap();
        assert_eq!(tx.commit().await, Err(AppError::SpaceNotFound(42)));
    }

    #[tokio::test]
    async fn test_commit_rejects_missing_user() {
        let store = MemoryStore::new();
        let s = Repository::<Space, i32>::create(&store, &space("Sala")).await.unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_reservation(&draft(77, s.id)).await.unwrap();
        assert_eq!(
            tx.commit().await,
            Err(AppError::UserNotFound("77".to_string()))
        );
    }

    #[tokio::test]
    async fn test_commit_keeps_paid_installments() {
        let store = MemoryStore::new();
        let u = Repository::<User, i32>::create(&store, &user("a@example.com")).await.unwrap();
        let s = Repository::<Space, i32>::create(&store, &space("Sala")).await.unwrap();
        let quote = InstallmentDraft {
            due_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            amount: dec!(75.00),
        };

        let mut tx = store.begin().await.unwrap();
        let r = tx.insert_reservation(&draft(u.id, s.id)).await.unwrap();
        let created = tx
            .replace_installments(r.id, &[quote.clone(), quote.clone()])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        // a payment lands while a reschedule is in flight
        let mut tx = store.begin().await.unwrap();
        tx.replace_installments(r.id, &[]).await.unwrap();
        store.mark_paid(created[0].id, Utc::now()).await.unwrap();
        assert_eq!(tx.commit().await, Err(AppError::InstallmentsPaid(r.id)));

        let stored = store.list_by_reservation(r.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[0].paid);
    }

    #[tokio::test]
    async fn test_relocking_a_held_slot_returns_immediately() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(20));
        let key = draft(1, 1).slot_key();

        let mut tx = store.begin().await.unwrap();
        tx.lock_slot(key).await.unwrap();
        tx.lock_slot(key).await.unwrap();
    }

    #[tokio::test]
    async fn test_slot_lock_times_out() {
        let store = MemoryStore::with_lock_timeout(Duration::from_millis(20));
        let key = draft(1, 1).slot_key();

        let mut first = store.begin().await.unwrap();
        first.lock_slot(key).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let err = second.lock_slot(key).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_deleting_space_cascades() {
        let store = MemoryStore::new();
        let u = Repository::<User, i32>::create(&store, &user("a@example.com")).await.unwrap();
        let s = Repository::<Space, i32>::create(&store, &space("Sala")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_reservation(&draft(u.id, s.id)).await.unwrap();
        tx.commit().await.unwrap();

        assert!(Repository::<Space, i32>::delete(&store, s.id).await.unwrap());
        assert!(store.list_by_user(u.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_spaces() {
        let store = MemoryStore::new();
        for name in ["Sala Azul", "Sala Roja", "Terraza"] {
            Repository::<Space, i32>::create(&store, &space(name)).await.unwrap();
        }

        let (found, total) = store.search(Some("sala"), true, 10, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(found[0].name, "Sala Roja");
    }
}
