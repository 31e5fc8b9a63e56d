use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::calculator::{CalculationError, RewardCalculator};
use super::domain::{
    Redemption, RedemptionId, RedemptionStatus, RewardCalculation, TransitionError, UserId,
    Voucher, VoucherId,
};
use super::events::{EventReceipt, RewardEvent};
use super::export::{self, ExportError};
use super::ledger::{LedgerError, LedgerSummary, RewardLedger};
use crate::config::RewardPolicyConfig;

static VOUCHER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static REDEMPTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_voucher_id() -> VoucherId {
    let id = VOUCHER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    VoucherId(format!("vch-{id:06}"))
}

fn next_redemption_id() -> RedemptionId {
    let id = REDEMPTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RedemptionId(format!("rdm-{id:06}"))
}

/// Body of a redemption request from the authenticated user.
#[derive(Debug, Clone, Deserialize)]
pub struct RedemptionRequest {
    pub amount_cents: i64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Per-user balance snapshot served on the profile endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardsProfile {
    pub user_id: UserId,
    pub issued_cents: i64,
    pub available_cents: i64,
    pub voucher_count: usize,
    pub redemption_count: usize,
}

/// Service composing the calculator and the ledger: voucher issuance,
/// redemption moderation, and sale-event crediting.
pub struct RewardService<L> {
    ledger: Arc<L>,
    calculator: RewardCalculator,
    // Moderation is a read-modify-write over the ledger; this lock keeps
    // concurrent approve/reject/mark-paid calls on the same redemption from
    // racing past the status check.
    moderation: Mutex<()>,
}

impl<L> RewardService<L>
where
    L: RewardLedger + 'static,
{
    pub fn new(ledger: Arc<L>, policy: RewardPolicyConfig) -> Self {
        Self {
            ledger,
            calculator: RewardCalculator::new(policy),
            moderation: Mutex::new(()),
        }
    }

    pub fn calculator(&self) -> &RewardCalculator {
        &self.calculator
    }

    /// Balance snapshot for the authenticated user.
    pub fn profile(&self, user: &UserId) -> Result<RewardsProfile, RewardServiceError> {
        let vouchers = self.ledger.vouchers_for_user(user)?;
        let redemptions = self.ledger.redemptions_for_user(user)?;

        Ok(RewardsProfile {
            user_id: user.clone(),
            issued_cents: vouchers.iter().map(|v| v.amount_cents).sum(),
            available_cents: vouchers.iter().map(Voucher::remaining_cents).sum(),
            voucher_count: vouchers.len(),
            redemption_count: redemptions.len(),
        })
    }

    /// Issue a voucher for the user. The amount must be positive cents.
    pub fn create_voucher(
        &self,
        user: &UserId,
        amount_cents: i64,
    ) -> Result<Voucher, RewardServiceError> {
        if amount_cents <= 0 {
            return Err(RewardServiceError::NonPositiveAmount);
        }

        let voucher = Voucher {
            id: next_voucher_id(),
            user_id: user.clone(),
            amount_cents,
            redeemed_cents: 0,
            issued_at: Utc::now(),
        };
        let stored = self.ledger.insert_voucher(voucher)?;
        info!(voucher = %stored.id.0, user = %user.0, cents = amount_cents, "voucher issued");
        Ok(stored)
    }

    /// Submit a redemption against the user's available balance. Funds are
    /// reserved immediately, oldest vouchers first; a rejection returns them.
    pub fn create_redemption(
        &self,
        user: &UserId,
        request: RedemptionRequest,
    ) -> Result<Redemption, RewardServiceError> {
        if request.amount_cents <= 0 {
            return Err(RewardServiceError::NonPositiveAmount);
        }

        let allocations = self.ledger.reserve(user, request.amount_cents)?;
        let now = Utc::now();
        let redemption = Redemption {
            id: next_redemption_id(),
            user_id: user.clone(),
            amount_cents: request.amount_cents,
            note: request.note,
            status: RedemptionStatus::Pending,
            provider_ref: None,
            allocations: allocations.clone(),
            created_at: now,
            updated_at: now,
        };

        match self.ledger.insert_redemption(redemption) {
            Ok(stored) => {
                info!(redemption = %stored.id.0, user = %user.0, "redemption submitted");
                Ok(stored)
            }
            Err(err) => {
                // Don't strand the reservation if the insert lost a race.
                self.ledger.release(&allocations)?;
                Err(err.into())
            }
        }
    }

    /// The caller's redemption history, newest first.
    pub fn my_redemptions(&self, user: &UserId) -> Result<Vec<Redemption>, RewardServiceError> {
        Ok(self.ledger.redemptions_for_user(user)?)
    }

    pub fn approve(&self, id: &RedemptionId) -> Result<Redemption, RewardServiceError> {
        let _guard = self.moderation_guard()?;
        let mut redemption = self.fetch_required(id)?;
        redemption.approve()?;
        self.ledger.update_redemption(redemption.clone())?;
        info!(redemption = %id.0, "redemption approved");
        Ok(redemption)
    }

    pub fn reject(&self, id: &RedemptionId) -> Result<Redemption, RewardServiceError> {
        let _guard = self.moderation_guard()?;
        let mut redemption = self.fetch_required(id)?;
        redemption.reject()?;
        self.ledger.release(&redemption.allocations)?;
        self.ledger.update_redemption(redemption.clone())?;
        info!(redemption = %id.0, "redemption rejected, funds released");
        Ok(redemption)
    }

    pub fn mark_paid(
        &self,
        id: &RedemptionId,
        provider_ref: &str,
    ) -> Result<Redemption, RewardServiceError> {
        let _guard = self.moderation_guard()?;
        let mut redemption = self.fetch_required(id)?;
        redemption.mark_paid(provider_ref)?;
        self.ledger.update_redemption(redemption.clone())?;
        info!(redemption = %id.0, "redemption marked paid");
        Ok(redemption)
    }

    pub fn admin_summary(&self) -> Result<LedgerSummary, RewardServiceError> {
        Ok(self.ledger.summary()?)
    }

    pub fn admin_redemptions(&self) -> Result<Vec<Redemption>, RewardServiceError> {
        Ok(self.ledger.all_redemptions()?)
    }

    /// Credit a completed sale. The sale margin runs through the calculator
    /// and the resulting reward is issued as a voucher. Delivery is
    /// at-least-once, so the event identity is recorded first and duplicates
    /// are acknowledged without crediting.
    pub fn ingest_event(&self, event: RewardEvent) -> Result<EventReceipt, RewardServiceError> {
        let calculation = RewardCalculation::for_margin(
            event.source_type.product_type(),
            event.amount_cents,
        );
        let output = self.calculator.compute(&calculation)?;

        if !self.ledger.record_event(event.key())? {
            debug!(source = %event.source_id, "duplicate reward event ignored");
            return Ok(EventReceipt {
                duplicate: true,
                credited_cents: 0,
                voucher_id: None,
            });
        }

        if output.customer_reward_cents == 0 {
            return Ok(EventReceipt {
                duplicate: false,
                credited_cents: 0,
                voucher_id: None,
            });
        }

        let voucher = self.create_voucher(&event.user_id, output.customer_reward_cents)?;
        Ok(EventReceipt {
            duplicate: false,
            credited_cents: voucher.amount_cents,
            voucher_id: Some(voucher.id),
        })
    }

    /// RFC-4180 CSV snapshot of the redemption ledger for offline audit.
    pub fn export_csv(&self) -> Result<String, RewardServiceError> {
        let redemptions = self.ledger.all_redemptions()?;
        Ok(export::redemptions_csv(&redemptions)?)
    }

    fn fetch_required(&self, id: &RedemptionId) -> Result<Redemption, RewardServiceError> {
        Ok(self
            .ledger
            .fetch_redemption(id)?
            .ok_or(LedgerError::NotFound)?)
    }

    fn moderation_guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, RewardServiceError> {
        self.moderation
            .lock()
            .map_err(|_| LedgerError::Unavailable("moderation mutex poisoned".to_string()).into())
    }
}

/// Error raised by the reward service.
#[derive(Debug, thiserror::Error)]
pub enum RewardServiceError {
    #[error(transparent)]
    Calculation(#[from] CalculationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("amount_cents must be a positive number of cents")]
    NonPositiveAmount,
    #[error(transparent)]
    Export(#[from] ExportError),
}
