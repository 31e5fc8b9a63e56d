mod margin;

use crate::config::RewardPolicyConfig;
use crate::rewards::domain::{AppliedPolicy, RewardCalculation, RewardOutput};

/// Validation and policy errors raised while computing a reward.
#[derive(Debug, thiserror::Error)]
pub enum CalculationError {
    #[error("missing required field '{field}' for product type '{product_type}'")]
    MissingField {
        field: &'static str,
        product_type: &'static str,
    },
    #[error("field '{field}' must be a non-negative amount in cents")]
    NegativeAmount { field: &'static str },
    #[error("promo multiplier must be a finite, non-negative number")]
    InvalidPromoMultiplier,
    #[error("unsupported product type '{0}'")]
    UnsupportedProductType(String),
}

/// Stateless calculator applying the reward policy to a sale's economics.
///
/// The pipeline: derive the product-type net margin, take the tier share
/// scaled by the promo multiplier, deduct the operating buffer, then clamp to
/// the configured floor and ceiling. The delivered reward never exceeds the
/// net margin and a non-positive margin yields no reward.
#[derive(Debug, Clone)]
pub struct RewardCalculator {
    policy: RewardPolicyConfig,
}

impl RewardCalculator {
    pub fn new(policy: RewardPolicyConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RewardPolicyConfig {
        &self.policy
    }

    pub fn compute(&self, calc: &RewardCalculation) -> Result<RewardOutput, CalculationError> {
        let promo_multiplier = calc.promo_multiplier.unwrap_or(1.0);
        if !promo_multiplier.is_finite() || promo_multiplier < 0.0 {
            return Err(CalculationError::InvalidPromoMultiplier);
        }

        let net_margin_cents = margin::net_margin_cents(calc)?;

        let mut applied = AppliedPolicy {
            tier_percent: self.policy.tier_percent,
            min_applied: false,
            max_applied: false,
            promo_multiplier,
            operating_buffer_cents: self.policy.operating_buffer_cents,
        };

        if net_margin_cents <= 0 {
            return Ok(RewardOutput {
                net_margin_cents,
                customer_reward_cents: 0,
                applied,
            });
        }

        // Integer tier share first; the float promo scale is the only
        // non-integer step and is floored straight back to cents.
        let tier_share = net_margin_cents * i64::from(self.policy.tier_percent) / 100;
        let scaled = (tier_share as f64 * promo_multiplier).floor() as i64;

        let pool = (scaled - self.policy.operating_buffer_cents).max(0);

        let clamped = if pool < self.policy.min_reward_cents {
            applied.min_applied = true;
            self.policy.min_reward_cents
        } else if pool > self.policy.max_reward_cents {
            applied.max_applied = true;
            self.policy.max_reward_cents
        } else {
            pool
        };

        Ok(RewardOutput {
            net_margin_cents,
            customer_reward_cents: clamped.min(net_margin_cents),
            applied,
        })
    }
}
