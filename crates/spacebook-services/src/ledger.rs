//! Installment ledger
//!
//! Read and settle the installments of a reservation on behalf of its owner.

use std::sync::Arc;

use spacebook_core::models::Installment;
use spacebook_core::traits::InstallmentRepository;
use spacebook_core::{AppError, AppResult, Clock};
use tracing::{debug, info, instrument, warn};

pub struct InstallmentLedger {
    repo: Arc<dyn InstallmentRepository>,
    clock: Arc<dyn Clock>,
}

impl InstallmentLedger {
    pub fn new(repo: Arc<dyn InstallmentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Installments of `reservation_id`, earliest due date first.
    ///
    /// Returns an empty list when the reservation does not exist or is owned
    /// by someone else, so callers cannot discover other users' ids.
    #[instrument(skip(self))]
    pub async fn list_by_reservation(
        &self,
        reservation_id: i32,
        user_id: i32,
    ) -> AppResult<Vec<Installment>> {
        match self.repo.reservation_owner(reservation_id).await? {
            Some(owner) if owner == user_id => {
                self.repo.list_by_reservation(reservation_id).await
            }
            _ => {
                debug!(reservation_id, user_id, "Reservation not visible to caller");
                Ok(Vec::new())
            }
        }
    }

    /// Mark an installment as paid.
    ///
    /// Paying an installment twice returns it unchanged, keeping the first
    /// `paid_at`.
    ///
    /// # Errors
    ///
    /// `InstallmentNotFound` if the installment does not exist or belongs to
    /// a reservation the caller does not own.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, installment_id: i32, user_id: i32) -> AppResult<Installment> {
        let (installment, owner) = self
            .repo
            .find_with_owner(installment_id)
            .await?
            .ok_or(AppError::InstallmentNotFound(installment_id))?;

        if owner != user_id {
            warn!(installment_id, user_id, "Payment rejected: not the owner");
            return Err(AppError::InstallmentNotFound(installment_id));
        }

        if installment.paid {
            debug!(installment_id, "Installment already paid");
            return Ok(installment);
        }

        match self.repo.mark_paid(installment_id, self.clock.now()).await? {
            Some(paid) => {
                info!(
                    installment_id,
                    reservation_id = paid.reservation_id,
                    amount = %paid.amount,
                    "Installment paid"
                );
                Ok(paid)
            }
            // Lost a race with another payment of the same installment
            None => self
                .repo
                .find_with_owner(installment_id)
                .await?
                .map(|(current, _)| current)
                .ok_or(AppError::InstallmentNotFound(installment_id)),
        }
    }
}
