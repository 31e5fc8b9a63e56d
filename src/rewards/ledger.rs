use std::collections::HashSet;
use std::sync::Mutex;

use serde::Serialize;

use super::domain::{Redemption, RedemptionId, RedemptionStatus, UserId, Voucher, VoucherDraw};
use super::events::EventKey;

/// Storage abstraction for the reward ledger so the service can be exercised
/// against an in-memory store in tests and swapped for a durable one later.
///
/// `reserve` and `release` move voucher balance atomically with respect to
/// other ledger calls; implementations must not let two reservations draw the
/// same cents.
pub trait RewardLedger: Send + Sync {
    fn insert_voucher(&self, voucher: Voucher) -> Result<Voucher, LedgerError>;
    fn vouchers_for_user(&self, user: &UserId) -> Result<Vec<Voucher>, LedgerError>;

    /// Reserve `amount_cents` against the user's open vouchers, oldest first.
    /// Fails with `InsufficientBalance` without drawing anything when the
    /// user's remaining balance cannot cover the amount.
    fn reserve(&self, user: &UserId, amount_cents: i64) -> Result<Vec<VoucherDraw>, LedgerError>;

    /// Return previously reserved cents to their vouchers.
    fn release(&self, draws: &[VoucherDraw]) -> Result<(), LedgerError>;

    fn insert_redemption(&self, redemption: Redemption) -> Result<Redemption, LedgerError>;
    fn update_redemption(&self, redemption: Redemption) -> Result<(), LedgerError>;
    fn fetch_redemption(&self, id: &RedemptionId) -> Result<Option<Redemption>, LedgerError>;

    /// A user's redemption history, newest first.
    fn redemptions_for_user(&self, user: &UserId) -> Result<Vec<Redemption>, LedgerError>;

    /// Every redemption in the ledger, newest first.
    fn all_redemptions(&self) -> Result<Vec<Redemption>, LedgerError>;

    /// Record an event identity. Returns `false` when the identity was
    /// already recorded, which callers treat as a duplicate delivery.
    fn record_event(&self, key: EventKey) -> Result<bool, LedgerError>;

    /// Aggregate view across the whole ledger, taken in one snapshot.
    fn summary(&self) -> Result<LedgerSummary, LedgerError>;
}

/// Error enumeration for ledger failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("insufficient balance: requested {requested_cents} cents, {available_cents} available")]
    InsufficientBalance {
        requested_cents: i64,
        available_cents: i64,
    },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Aggregate counters exposed on the admin summary endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub voucher_count: usize,
    pub issued_cents: i64,
    pub outstanding_cents: i64,
    pub pending_count: usize,
    pub pending_cents: i64,
    pub approved_count: usize,
    pub approved_cents: i64,
    pub rejected_count: usize,
    pub paid_count: usize,
    pub paid_cents: i64,
}

#[derive(Default)]
struct LedgerState {
    vouchers: Vec<Voucher>,
    redemptions: Vec<Redemption>,
    seen_events: HashSet<EventKey>,
}

/// Mutex-guarded in-memory ledger. The single lock is what serializes
/// concurrent moderation and reservation calls on the same records.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger mutex poisoned".to_string()))
    }
}

impl RewardLedger for InMemoryLedger {
    fn insert_voucher(&self, voucher: Voucher) -> Result<Voucher, LedgerError> {
        let mut state = self.lock()?;
        if state.vouchers.iter().any(|v| v.id == voucher.id) {
            return Err(LedgerError::Conflict);
        }
        state.vouchers.push(voucher.clone());
        Ok(voucher)
    }

    fn vouchers_for_user(&self, user: &UserId) -> Result<Vec<Voucher>, LedgerError> {
        let state = self.lock()?;
        Ok(state
            .vouchers
            .iter()
            .filter(|v| &v.user_id == user)
            .cloned()
            .collect())
    }

    fn reserve(&self, user: &UserId, amount_cents: i64) -> Result<Vec<VoucherDraw>, LedgerError> {
        let mut state = self.lock()?;

        let available_cents: i64 = state
            .vouchers
            .iter()
            .filter(|v| &v.user_id == user)
            .map(Voucher::remaining_cents)
            .sum();
        if available_cents < amount_cents {
            return Err(LedgerError::InsufficientBalance {
                requested_cents: amount_cents,
                available_cents,
            });
        }

        let mut remaining = amount_cents;
        let mut draws = Vec::new();
        for voucher in state
            .vouchers
            .iter_mut()
            .filter(|v| &v.user_id == user && v.remaining_cents() > 0)
        {
            if remaining == 0 {
                break;
            }
            let draw = remaining.min(voucher.remaining_cents());
            voucher.redeemed_cents += draw;
            remaining -= draw;
            draws.push(VoucherDraw {
                voucher_id: voucher.id.clone(),
                amount_cents: draw,
            });
        }
        Ok(draws)
    }

    fn release(&self, draws: &[VoucherDraw]) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        for draw in draws {
            let voucher = state
                .vouchers
                .iter_mut()
                .find(|v| v.id == draw.voucher_id)
                .ok_or(LedgerError::NotFound)?;
            voucher.redeemed_cents -= draw.amount_cents;
        }
        Ok(())
    }

    fn insert_redemption(&self, redemption: Redemption) -> Result<Redemption, LedgerError> {
        let mut state = self.lock()?;
        if state.redemptions.iter().any(|r| r.id == redemption.id) {
            return Err(LedgerError::Conflict);
        }
        state.redemptions.push(redemption.clone());
        Ok(redemption)
    }

    fn update_redemption(&self, redemption: Redemption) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        let slot = state
            .redemptions
            .iter_mut()
            .find(|r| r.id == redemption.id)
            .ok_or(LedgerError::NotFound)?;
        *slot = redemption;
        Ok(())
    }

    fn fetch_redemption(&self, id: &RedemptionId) -> Result<Option<Redemption>, LedgerError> {
        let state = self.lock()?;
        Ok(state.redemptions.iter().find(|r| &r.id == id).cloned())
    }

    fn redemptions_for_user(&self, user: &UserId) -> Result<Vec<Redemption>, LedgerError> {
        let state = self.lock()?;
        Ok(state
            .redemptions
            .iter()
            .rev()
            .filter(|r| &r.user_id == user)
            .cloned()
            .collect())
    }

    fn all_redemptions(&self) -> Result<Vec<Redemption>, LedgerError> {
        let state = self.lock()?;
        Ok(state.redemptions.iter().rev().cloned().collect())
    }

    fn record_event(&self, key: EventKey) -> Result<bool, LedgerError> {
        let mut state = self.lock()?;
        Ok(state.seen_events.insert(key))
    }

    fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        let state = self.lock()?;

        let mut summary = LedgerSummary {
            voucher_count: state.vouchers.len(),
            issued_cents: state.vouchers.iter().map(|v| v.amount_cents).sum(),
            outstanding_cents: state.vouchers.iter().map(Voucher::remaining_cents).sum(),
            pending_count: 0,
            pending_cents: 0,
            approved_count: 0,
            approved_cents: 0,
            rejected_count: 0,
            paid_count: 0,
            paid_cents: 0,
        };

        for redemption in &state.redemptions {
            match redemption.status {
                RedemptionStatus::Pending => {
                    summary.pending_count += 1;
                    summary.pending_cents += redemption.amount_cents;
                }
                RedemptionStatus::Approved => {
                    summary.approved_count += 1;
                    summary.approved_cents += redemption.amount_cents;
                }
                RedemptionStatus::Rejected => summary.rejected_count += 1,
                RedemptionStatus::Paid => {
                    summary.paid_count += 1;
                    summary.paid_cents += redemption.amount_cents;
                }
            }
        }

        Ok(summary)
    }
}
