use super::CalculationError;
use crate::rewards::domain::{ProductType, RewardCalculation};

/// Derive the net margin in cents for the calculation's product type.
///
/// Affiliate, dropship, and custom sales report their margin directly.
/// Physical and multivendor sales subtract every cost leg from the sale
/// price. Consumable, service, and digital sales have no shipping or vendor
/// commission leg, so only cost and payment fee are subtracted when no
/// explicit margin is given. The result may be negative when a sale lost
/// money; the caller treats that as a zero reward pool.
pub(crate) fn net_margin_cents(calc: &RewardCalculation) -> Result<i64, CalculationError> {
    validate_non_negative(calc)?;

    let product_type = calc.product_type;
    match product_type {
        ProductType::Affiliate | ProductType::Dropship | ProductType::Custom => {
            require(calc.margin_cents, "margin_cents", product_type)
        }
        ProductType::Physical | ProductType::Multivendor => {
            let sale = require(calc.sale_price_cents, "sale_price_cents", product_type)?;
            let cost = require(calc.cost_cents, "cost_cents", product_type)?;
            Ok(sale
                - cost
                - calc.payment_fee_cents.unwrap_or(0)
                - calc.shipping_subsidy_cents.unwrap_or(0)
                - calc.commission_cents.unwrap_or(0))
        }
        ProductType::Consumable | ProductType::Service | ProductType::Digital => {
            if let Some(margin) = calc.margin_cents {
                return Ok(margin);
            }
            let sale = require(calc.sale_price_cents, "sale_price_cents", product_type)?;
            let cost = require(calc.cost_cents, "cost_cents", product_type)?;
            Ok(sale - cost - calc.payment_fee_cents.unwrap_or(0))
        }
    }
}

fn require(
    field: Option<i64>,
    name: &'static str,
    product_type: ProductType,
) -> Result<i64, CalculationError> {
    field.ok_or(CalculationError::MissingField {
        field: name,
        product_type: product_type.label(),
    })
}

fn validate_non_negative(calc: &RewardCalculation) -> Result<(), CalculationError> {
    let fields = [
        (calc.margin_cents, "margin_cents"),
        (calc.sale_price_cents, "sale_price_cents"),
        (calc.cost_cents, "cost_cents"),
        (calc.payment_fee_cents, "payment_fee_cents"),
        (calc.shipping_subsidy_cents, "shipping_subsidy_cents"),
        (calc.commission_cents, "commission_cents"),
    ];

    for (value, name) in fields {
        if matches!(value, Some(cents) if cents < 0) {
            return Err(CalculationError::NegativeAmount { field: name });
        }
    }
    Ok(())
}
