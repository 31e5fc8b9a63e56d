//! Reward calculation, voucher/redemption ledger, moderation workflow, and
//! sale-event crediting.

pub mod calculator;
pub mod domain;
pub mod events;
pub mod export;
pub mod ledger;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use calculator::{CalculationError, RewardCalculator};
pub use domain::{
    AppliedPolicy, ProductType, Redemption, RedemptionId, RedemptionStatus, RewardCalculation,
    RewardOutput, TransitionError, UserId, Voucher, VoucherDraw, VoucherId,
};
pub use events::{EventKey, EventReceipt, RewardEvent, SourceType};
pub use export::ExportError;
pub use ledger::{InMemoryLedger, LedgerError, LedgerSummary, RewardLedger};
pub use router::rewards_router;
pub use service::{RedemptionRequest, RewardService, RewardServiceError, RewardsProfile};
