use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for storefront customers. The value mirrors whatever the
/// identity layer puts in the `x-user-id` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for issued vouchers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoucherId(pub String);

/// Identifier wrapper for redemption requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RedemptionId(pub String);

/// Product families the storefront sells. Each family derives its net margin
/// from a different subset of the sale economics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Affiliate,
    Dropship,
    Physical,
    Consumable,
    Service,
    Digital,
    Custom,
    Multivendor,
}

impl ProductType {
    pub const fn label(self) -> &'static str {
        match self {
            ProductType::Affiliate => "affiliate",
            ProductType::Dropship => "dropship",
            ProductType::Physical => "physical",
            ProductType::Consumable => "consumable",
            ProductType::Service => "service",
            ProductType::Digital => "digital",
            ProductType::Custom => "custom",
            ProductType::Multivendor => "multivendor",
        }
    }

    /// Parse a wire/CLI label. Unknown labels are surfaced to the caller so
    /// they can raise the unsupported-type error with the offending value.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "affiliate" => Some(Self::Affiliate),
            "dropship" => Some(Self::Dropship),
            "physical" => Some(Self::Physical),
            "consumable" => Some(Self::Consumable),
            "service" => Some(Self::Service),
            "digital" => Some(Self::Digital),
            "custom" => Some(Self::Custom),
            "multivendor" => Some(Self::Multivendor),
            _ => None,
        }
    }
}

/// Sale economics submitted to the reward calculator. All monetary fields are
/// integer cents; which fields are required depends on the product type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardCalculation {
    pub product_type: ProductType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_fee_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_subsidy_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission_cents: Option<i64>,
    /// Defaults to 1.0 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_multiplier: Option<f64>,
}

impl RewardCalculation {
    pub fn for_margin(product_type: ProductType, margin_cents: i64) -> Self {
        Self {
            product_type,
            margin_cents: Some(margin_cents),
            sale_price_cents: None,
            cost_cents: None,
            payment_fee_cents: None,
            shipping_subsidy_cents: None,
            commission_cents: None,
            promo_multiplier: None,
        }
    }
}

/// Which policy levers touched the computed reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPolicy {
    pub tier_percent: u8,
    pub min_applied: bool,
    pub max_applied: bool,
    pub promo_multiplier: f64,
    pub operating_buffer_cents: i64,
}

/// Deterministic result of a reward calculation.
///
/// `customer_reward_cents` never exceeds the (non-negative) net margin, and at
/// most one of the clamp flags is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardOutput {
    pub net_margin_cents: i64,
    pub customer_reward_cents: i64,
    pub applied: AppliedPolicy,
}

/// A claimable reward balance issued to a user. Vouchers are drawn down by
/// redemptions, partially or in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub user_id: UserId,
    pub amount_cents: i64,
    pub redeemed_cents: i64,
    pub issued_at: DateTime<Utc>,
}

impl Voucher {
    pub fn remaining_cents(&self) -> i64 {
        self.amount_cents - self.redeemed_cents
    }
}

/// Portion of a redemption reserved against a specific voucher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherDraw {
    pub voucher_id: VoucherId,
    pub amount_cents: i64,
}

/// Lifecycle states for a redemption request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl RedemptionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RedemptionStatus::Pending => "pending",
            RedemptionStatus::Approved => "approved",
            RedemptionStatus::Rejected => "rejected",
            RedemptionStatus::Paid => "paid",
        }
    }
}

/// Raised when a moderation action does not match the redemption's state.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {action} a redemption in status '{status}'")]
    InvalidTransition {
        action: &'static str,
        status: &'static str,
    },
    #[error("provider reference must be non-empty")]
    MissingProviderRef,
}

/// A user request to convert reward balance into a payout.
///
/// Valid transitions: pending → approved → paid, or pending → rejected.
/// Rejected and paid are terminal; a paid redemption keeps its provider
/// reference and is otherwise immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    pub id: RedemptionId,
    pub user_id: UserId,
    pub amount_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub status: RedemptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_ref: Option<String>,
    pub allocations: Vec<VoucherDraw>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Redemption {
    pub fn approve(&mut self) -> Result<(), TransitionError> {
        self.transition_from_pending("approve", RedemptionStatus::Approved)
    }

    pub fn reject(&mut self) -> Result<(), TransitionError> {
        self.transition_from_pending("reject", RedemptionStatus::Rejected)
    }

    pub fn mark_paid(&mut self, provider_ref: &str) -> Result<(), TransitionError> {
        if provider_ref.trim().is_empty() {
            return Err(TransitionError::MissingProviderRef);
        }
        if self.status != RedemptionStatus::Approved {
            return Err(TransitionError::InvalidTransition {
                action: "mark paid",
                status: self.status.label(),
            });
        }
        self.status = RedemptionStatus::Paid;
        self.provider_ref = Some(provider_ref.trim().to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    fn transition_from_pending(
        &mut self,
        action: &'static str,
        next: RedemptionStatus,
    ) -> Result<(), TransitionError> {
        if self.status != RedemptionStatus::Pending {
            return Err(TransitionError::InvalidTransition {
                action,
                status: self.status.label(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
