//! Availability checking
//!
//! The overlap test itself is pure; [`AvailabilityChecker::check`] wraps it
//! with the slot lock so the answer stays true until the caller's
//! transaction ends.

use spacebook_core::models::{Reservation, SlotKey, TimeSlot};
use spacebook_core::traits::AdmissionTx;
use spacebook_core::AppResult;
use tracing::{debug, instrument};

/// True iff `candidate` intersects any reservation in `existing`.
///
/// Intervals are half-open, so back-to-back bookings do not overlap.
pub fn has_overlap(candidate: TimeSlot, existing: &[Reservation]) -> bool {
    existing
        .iter()
        .any(|r| candidate.overlaps(&r.slot()))
}

pub struct AvailabilityChecker;

impl AvailabilityChecker {
    /// Lock `key` inside `tx`, then test `candidate` against its reservations.
    ///
    /// `exclude` skips one reservation, used when rescheduling it.
    #[instrument(skip(tx), fields(space_id = key.space_id, date = %key.date))]
    pub async fn check(
        tx: &mut dyn AdmissionTx,
        key: SlotKey,
        candidate: TimeSlot,
        exclude: Option<i32>,
    ) -> AppResult<bool> {
        tx.lock_slot(key).await?;
        let booked = tx.reservations_in_slot(key, exclude).await?;
        let overlap = has_overlap(candidate, &booked);

        debug!(
            booked = booked.len(),
            start = candidate.start,
            end = candidate.end,
            overlap,
            "Checked slot availability"
        );
        Ok(overlap)
    }
}
