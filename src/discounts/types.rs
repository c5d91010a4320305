// Domain type definitions for discount rules

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Pricing semantics of a discount rule
///
/// The stored tag selects which calculation applies to the cart and which
/// optional fields of the rule are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountRuleType {
    /// Percentage of the subtotal, optionally capped by `max_discount`
    PercentageOff,

    /// Flat currency amount, never more than the subtotal
    FixedAmountOff,

    /// Discount `get_quantity` units for every `buy_quantity` units, in complete sets
    BuyXGetY,

    /// Waive shipping; carries no monetary discount of its own
    FreeShipping,

    /// Flat amount once the subtotal reaches `spend_threshold`
    SpendXGetYOff,
}

impl DiscountRuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountRuleType::PercentageOff => "PERCENTAGE_OFF",
            DiscountRuleType::FixedAmountOff => "FIXED_AMOUNT_OFF",
            DiscountRuleType::BuyXGetY => "BUY_X_GET_Y",
            DiscountRuleType::FreeShipping => "FREE_SHIPPING",
            DiscountRuleType::SpendXGetYOff => "SPEND_X_GET_Y_OFF",
        }
    }

    /// Whether `discount_value` must be supplied for this type
    pub fn requires_discount_value(&self) -> bool {
        matches!(
            self,
            DiscountRuleType::PercentageOff
                | DiscountRuleType::FixedAmountOff
                | DiscountRuleType::SpendXGetYOff
        )
    }
}

impl fmt::Display for DiscountRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DiscountRuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PERCENTAGE_OFF" => Ok(DiscountRuleType::PercentageOff),
            "FIXED_AMOUNT_OFF" => Ok(DiscountRuleType::FixedAmountOff),
            "BUY_X_GET_Y" => Ok(DiscountRuleType::BuyXGetY),
            "FREE_SHIPPING" => Ok(DiscountRuleType::FreeShipping),
            "SPEND_X_GET_Y_OFF" => Ok(DiscountRuleType::SpendXGetYOff),
            _ => Err(format!("Invalid discount rule type: {}", s)),
        }
    }
}
