use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::config::RewardPolicyConfig;
use crate::rewards::domain::{Redemption, RedemptionId, UserId, Voucher, VoucherDraw};
use crate::rewards::events::{EventKey, RewardEvent, SourceType};
use crate::rewards::ledger::{InMemoryLedger, LedgerError, LedgerSummary, RewardLedger};
use crate::rewards::router::rewards_router;
use crate::rewards::service::{RedemptionRequest, RewardService};

pub(super) fn policy() -> RewardPolicyConfig {
    RewardPolicyConfig {
        tier_percent: 10,
        min_reward_cents: 0,
        max_reward_cents: 50_000,
        operating_buffer_cents: 50,
    }
}

pub(super) fn user(name: &str) -> UserId {
    UserId(name.to_string())
}

pub(super) fn build_service() -> (RewardService<InMemoryLedger>, Arc<InMemoryLedger>) {
    let ledger = Arc::new(InMemoryLedger::default());
    let service = RewardService::new(ledger.clone(), policy());
    (service, ledger)
}

pub(super) fn build_router() -> axum::Router {
    let (service, _) = build_service();
    rewards_router(Arc::new(service))
}

pub(super) fn sale_event(user: &UserId, source_id: &str, amount_cents: i64) -> RewardEvent {
    RewardEvent {
        user_id: user.clone(),
        source_type: SourceType::Dropship,
        source_id: source_id.to_string(),
        amount_cents,
        points: None,
    }
}

pub(super) fn redemption_request(amount_cents: i64) -> RedemptionRequest {
    RedemptionRequest {
        amount_cents,
        note: None,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Ledger double that fails every call, for error-path coverage.
pub(super) struct UnavailableLedger;

impl UnavailableLedger {
    fn down<T>() -> Result<T, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }
}

impl RewardLedger for UnavailableLedger {
    fn insert_voucher(&self, _voucher: Voucher) -> Result<Voucher, LedgerError> {
        Self::down()
    }

    fn vouchers_for_user(&self, _user: &UserId) -> Result<Vec<Voucher>, LedgerError> {
        Self::down()
    }

    fn reserve(&self, _user: &UserId, _amount_cents: i64) -> Result<Vec<VoucherDraw>, LedgerError> {
        Self::down()
    }

    fn release(&self, _draws: &[VoucherDraw]) -> Result<(), LedgerError> {
        Self::down()
    }

    fn insert_redemption(&self, _redemption: Redemption) -> Result<Redemption, LedgerError> {
        Self::down()
    }

    fn update_redemption(&self, _redemption: Redemption) -> Result<(), LedgerError> {
        Self::down()
    }

    fn fetch_redemption(&self, _id: &RedemptionId) -> Result<Option<Redemption>, LedgerError> {
        Self::down()
    }

    fn redemptions_for_user(&self, _user: &UserId) -> Result<Vec<Redemption>, LedgerError> {
        Self::down()
    }

    fn all_redemptions(&self) -> Result<Vec<Redemption>, LedgerError> {
        Self::down()
    }

    fn record_event(&self, _key: EventKey) -> Result<bool, LedgerError> {
        Self::down()
    }

    fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        Self::down()
    }
}
