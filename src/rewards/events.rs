use serde::{Deserialize, Serialize};

use super::domain::{ProductType, UserId, VoucherId};

/// Origin of a reward-triggering sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Affiliate,
    Dropship,
}

impl SourceType {
    pub const fn label(self) -> &'static str {
        match self {
            SourceType::Affiliate => "affiliate",
            SourceType::Dropship => "dropship",
        }
    }

    /// The product family a sale from this source settles under.
    pub const fn product_type(self) -> ProductType {
        match self {
            SourceType::Affiliate => ProductType::Affiliate,
            SourceType::Dropship => ProductType::Dropship,
        }
    }
}

/// An at-least-once delivered notification of a completed sale. The
/// `(source_type, source_id)` pair is the idempotency key: resent events are
/// acknowledged without crediting twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardEvent {
    pub user_id: UserId,
    pub source_type: SourceType,
    pub source_id: String,
    /// Sale margin in integer cents; the reward is computed from it.
    pub amount_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

impl RewardEvent {
    pub fn key(&self) -> EventKey {
        EventKey(format!("{}:{}", self.source_type.label(), self.source_id))
    }
}

/// Stable identity of a logical event, used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey(pub String);

/// Acknowledgement returned to event submitters. Duplicate deliveries are
/// accepted but carry no credit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventReceipt {
    pub duplicate: bool,
    pub credited_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher_id: Option<VoucherId>,
}
