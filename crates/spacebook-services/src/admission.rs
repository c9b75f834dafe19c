//! Reservation admission engine
//!
//! Admits, reschedules and cancels reservations. Every admission runs inside
//! one [`AdmissionTx`]:
//! - On update, find the caller's reservation
//! - Lock every (space, date) slot involved, in ascending order
//! - Resolve the space, then lock the reservation row on update
//! - Validate the requested hours and check for overlaps
//! - Price the booking and convert it to USD
//! - Persist the reservation and its installment schedule
//!
//! Any error returned before `commit` drops the transaction, which rolls
//! back every write made through it.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use spacebook_core::config::BookingConfig;
use spacebook_core::models::{Installment, Reservation, ReservationDraft, SlotKey, Space};
use spacebook_core::traits::{AdmissionTx, BookingStore, ReservationRepository};
use spacebook_core::{AppError, AppResult};
use spacebook_rates::{ExchangeRateCache, RateSource};
use tracing::{debug, info, instrument, warn};

use crate::availability::AvailabilityChecker;
use crate::pricing::{build_installments, is_weekend, to_usd, PricingPolicy};

/// Validated booking request, already tied to an authenticated user
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationRequest {
    pub space_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration: i32,
    /// Requested number of installments; `None` or 1 means pay in full
    pub installments: Option<u32>,
}

impl ReservationRequest {
    fn draft(&self, user_id: i32) -> ReservationDraft {
        ReservationDraft {
            user_id,
            space_id: self.space_id,
            date: self.date,
            start_time: self.start_time,
            duration: self.duration,
        }
    }

    fn installment_count(&self) -> u32 {
        self.installments.unwrap_or(1)
    }
}

/// Inputs needed to reproduce a price without recomputing it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationDetails {
    pub base_per_hour: Decimal,
    pub duration_hours: i32,
    pub weekend_applied: bool,
    pub factor: Decimal,
    pub date: NaiveDate,
    /// VES per USD
    pub exchange_rate: Decimal,
    pub rate_fetched_at: DateTime<Utc>,
    pub rate_source: RateSource,
}

/// Outcome of a successful create or update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResult {
    pub reservation_id: i32,
    pub reservation: Reservation,
    #[serde(rename = "totalVES")]
    pub total_ves: Decimal,
    #[serde(rename = "totalUSD")]
    pub total_usd: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<Vec<Installment>>,
    pub calculation_details: CalculationDetails,
}

struct Priced {
    total_ves: Decimal,
    total_usd: Decimal,
    details: CalculationDetails,
}

/// Reservation admission engine
pub struct ReservationEngine {
    store: Arc<dyn BookingStore>,
    rates: Arc<ExchangeRateCache>,
    reservations: Arc<dyn ReservationRepository>,
    policy: PricingPolicy,
    max_installments: u32,
}

impl ReservationEngine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        rates: Arc<ExchangeRateCache>,
        reservations: Arc<dyn ReservationRepository>,
        policy: PricingPolicy,
        max_installments: u32,
    ) -> Self {
        Self {
            store,
            rates,
            reservations,
            policy,
            max_installments,
        }
    }

    /// Build an engine from the `booking` configuration section
    pub fn from_config(
        store: Arc<dyn BookingStore>,
        rates: Arc<ExchangeRateCache>,
        reservations: Arc<dyn ReservationRepository>,
        config: &BookingConfig,
    ) -> Self {
        Self::new(
            store,
            rates,
            reservations,
            PricingPolicy::from(config),
            config.max_installments,
        )
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Admit a new reservation for `user_id`
    ///
    /// # Errors
    ///
    /// - `SpaceNotFound` if the space does not exist
    /// - `InvalidHours` if the slot falls outside the allowed window
    /// - `OverlappedReservation` if the slot is already taken
    /// - `ExchangeRateUnavailable` if no rate can be obtained
    /// - `Transient` if the slot lock could not be acquired in time
    #[instrument(skip(self), fields(space_id = req.space_id, date = %req.date))]
    pub async fn create_reservation(
        &self,
        user_id: i32,
        req: ReservationRequest,
    ) -> AppResult<ReservationResult> {
        self.check_installment_count(&req)?;

        let mut tx = self.store.begin().await?;
        tx.lock_slot(req.draft(user_id).slot_key()).await?;
        let space = self.resolve_space(tx.as_mut(), req.space_id).await?;
        let priced = self.admit(tx.as_mut(), &space, &req, None).await?;

        let draft = req.draft(user_id);
        let reservation = tx.insert_reservation(&draft).await?;
        let installments = self
            .schedule_installments(tx.as_mut(), &reservation, &req, &priced, false)
            .await?;

        tx.commit().await?;

        info!(
            reservation_id = reservation.id,
            user_id,
            total_ves = %priced.total_ves,
            total_usd = %priced.total_usd,
            "Reservation created"
        );

        Ok(ReservationResult {
            reservation_id: reservation.id,
            reservation,
            total_ves: priced.total_ves,
            total_usd: priced.total_usd,
            installments,
            calculation_details: priced.details,
        })
    }

    /// Reschedule a reservation owned by `user_id`
    ///
    /// The overlap check ignores the reservation itself. The previous
    /// installment schedule is replaced; a count of 1 (or none) leaves the
    /// reservation without installments.
    ///
    /// # Errors
    ///
    /// - `ReservationNotFound` when the reservation is missing or owned by
    ///   someone else
    /// - `InstallmentsPaid` when any installment has already been paid
    /// - `Transient` when the reservation was moved by a concurrent update
    /// - otherwise the same errors as
    ///   [`create_reservation`](Self::create_reservation)
    #[instrument(skip(self), fields(space_id = req.space_id, date = %req.date))]
    pub async fn update_reservation(
        &self,
        reservation_id: i32,
        user_id: i32,
        req: ReservationRequest,
    ) -> AppResult<ReservationResult> {
        self.check_installment_count(&req)?;

        let mut tx = self.store.begin().await?;

        let not_found = || {
            warn!(reservation_id, user_id, "Update rejected: reservation not found");
            AppError::ReservationNotFound(reservation_id)
        };

        let seen = tx
            .find_owned_reservation(reservation_id, user_id)
            .await?
            .ok_or_else(not_found)?;

        let mut keys: Vec<SlotKey> = vec![seen.slot_key(), req.draft(user_id).slot_key()];
        keys.sort();
        keys.dedup();
        for key in keys {
            tx.lock_slot(key).await?;
        }

        let space = self.resolve_space(tx.as_mut(), req.space_id).await?;

        let current = tx
            .find_owned_reservation_for_update(reservation_id, user_id)
            .await?
            .ok_or_else(not_found)?;
        if current.slot_key() != seen.slot_key() {
            warn!(reservation_id, "Update raced with another reschedule");
            return Err(AppError::Transient(format!(
                "reservation {} was rescheduled concurrently",
                reservation_id
            )));
        }

        let paid = tx
            .lock_installments(current.id)
            .await?
            .iter()
            .filter(|q| q.paid)
            .count();
        if paid > 0 {
            warn!(reservation_id, paid, "Update rejected: installments already paid");
            return Err(AppError::InstallmentsPaid(reservation_id));
        }

        let priced = self
            .admit(tx.as_mut(), &space, &req, Some(current.id))
            .await?;

        let draft = req.draft(user_id);
        let reservation = tx.update_reservation(current.id, &draft).await?;
        let installments = self
            .schedule_installments(tx.as_mut(), &reservation, &req, &priced, true)
            .await?;

        tx.commit().await?;

        info!(
            reservation_id = reservation.id,
            user_id,
            from_date = %current.date,
            to_date = %reservation.date,
            total_ves = %priced.total_ves,
            "Reservation updated"
        );

        Ok(ReservationResult {
            reservation_id: reservation.id,
            reservation,
            total_ves: priced.total_ves,
            total_usd: priced.total_usd,
            installments,
            calculation_details: priced.details,
        })
    }

    /// Delete a reservation owned by `user_id`, with its installments.
    ///
    /// Returns false when the reservation is missing or owned by someone else.
    #[instrument(skip(self))]
    pub async fn cancel_reservation(&self, reservation_id: i32, user_id: i32) -> AppResult<bool> {
        let removed = self
            .reservations
            .delete_owned(reservation_id, user_id)
            .await?;

        if removed {
            info!(reservation_id, user_id, "Reservation cancelled");
        } else {
            debug!(reservation_id, user_id, "Nothing to cancel");
        }
        Ok(removed)
    }

    fn check_installment_count(&self, req: &ReservationRequest) -> AppResult<()> {
        match req.installments {
            Some(0) => Err(AppError::Validation(
                "installment count must be at least 1".to_string(),
            )),
            Some(n) if n > self.max_installments => Err(AppError::Validation(format!(
                "installment count must not exceed {}",
                self.max_installments
            ))),
            _ => Ok(()),
        }
    }

    async fn resolve_space(&self, tx: &mut dyn AdmissionTx, space_id: i32) -> AppResult<Space> {
        tx.find_space(space_id).await?.ok_or_else(|| {
            warn!(space_id, "Admission rejected: space not found");
            AppError::SpaceNotFound(space_id)
        })
    }

    /// Hours, overlap and price checks shared by create and update.
    ///
    /// The slot lock taken here is held by `tx` until it commits or is dropped.
    async fn admit(
        &self,
        tx: &mut dyn AdmissionTx,
        space: &Space,
        req: &ReservationRequest,
        exclude: Option<i32>,
    ) -> AppResult<Priced> {
        if !self
            .policy
            .is_within_allowed_hours(req.start_time, req.duration)
        {
            warn!(
                start_time = %req.start_time,
                duration = req.duration,
                "Admission rejected: outside allowed hours"
            );
            return Err(self.policy.invalid_hours());
        }

        let draft = req.draft(0);
        let overlapped =
            AvailabilityChecker::check(tx, draft.slot_key(), draft.slot(), exclude).await?;
        if overlapped {
            warn!(
                space_id = space.id,
                date = %req.date,
                start_time = %req.start_time,
                duration = req.duration,
                "Admission rejected: overlapping reservation"
            );
            return Err(AppError::OverlappedReservation);
        }

        let total_ves =
            self.policy
                .calculate_total_price(space.price_per_hour, req.duration, req.date);
        let snapshot = self.rates.snapshot().await?;
        let total_usd = to_usd(total_ves, snapshot.rate)?;
        let factor = self.policy.factor_for(req.date);

        debug!(
            base = %space.price_per_hour,
            %factor,
            rate = %snapshot.rate,
            %total_ves,
            %total_usd,
            "Priced reservation"
        );

        let details = CalculationDetails {
            base_per_hour: space.price_per_hour,
            duration_hours: req.duration,
            weekend_applied: is_weekend(req.date),
            factor,
            date: req.date,
            exchange_rate: snapshot.rate,
            rate_fetched_at: snapshot.fetched_at,
            rate_source: snapshot.source,
        };

        Ok(Priced {
            total_ves,
            total_usd,
            details,
        })
    }

    async fn schedule_installments(
        &self,
        tx: &mut dyn AdmissionTx,
        reservation: &Reservation,
        req: &ReservationRequest,
        priced: &Priced,
        replace: bool,
    ) -> AppResult<Option<Vec<Installment>>> {
        let count = req.installment_count();
        if count <= 1 {
            if replace {
                tx.replace_installments(reservation.id, &[]).await?;
            }
            return Ok(None);
        }

        let drafts = build_installments(priced.total_ves, count, reservation.date)?;
        let installments = tx.replace_installments(reservation.id, &drafts).await?;
        debug!(
            reservation_id = reservation.id,
            count = installments.len(),
            "Installment schedule stored"
        );
        Ok(Some(installments))
    }
}
