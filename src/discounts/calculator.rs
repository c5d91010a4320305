// Discount Calculator
//
// Maps a stored rule onto a closed set of pricing semantics and computes the
// monetary discount each one grants a cart.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::discounts::{
    error::{DiscountError, DiscountResult},
    models::{CartSnapshot, DiscountRule},
    types::DiscountRuleType,
};

/// Pricing semantics of a rule, with the fields its calculation needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    PercentageOff {
        percent: Decimal,
        max_discount: Option<Decimal>,
    },
    FixedAmountOff {
        amount: Decimal,
    },
    BuyXGetY {
        buy_quantity: u32,
        get_quantity: u32,
        /// Percentage taken off each discounted unit
        get_discount: Decimal,
    },
    FreeShipping,
    SpendXGetYOff {
        spend_threshold: Decimal,
        amount: Decimal,
    },
}

impl TryFrom<&DiscountRule> for RuleKind {
    type Error = DiscountError;

    /// Fails when a field the rule type needs is missing or negative.
    /// Fields irrelevant to the type are ignored.
    fn try_from(rule: &DiscountRule) -> Result<Self, Self::Error> {
        let kind = match rule.rule_type {
            DiscountRuleType::PercentageOff => RuleKind::PercentageOff {
                percent: rule.discount_value,
                max_discount: rule.max_discount,
            },
            DiscountRuleType::FixedAmountOff => RuleKind::FixedAmountOff {
                amount: rule.discount_value,
            },
            DiscountRuleType::BuyXGetY => RuleKind::BuyXGetY {
                buy_quantity: required_quantity(rule.buy_quantity, "buy_quantity", rule)?,
                get_quantity: required_quantity(rule.get_quantity, "get_quantity", rule)?,
                get_discount: rule.get_discount.unwrap_or(Decimal::ONE_HUNDRED),
            },
            DiscountRuleType::FreeShipping => RuleKind::FreeShipping,
            DiscountRuleType::SpendXGetYOff => RuleKind::SpendXGetYOff {
                spend_threshold: rule.spend_threshold.ok_or_else(|| {
                    missing_field("spend_threshold", rule)
                })?,
                amount: rule.discount_value,
            },
        };

        Ok(kind)
    }
}

fn missing_field(field: &str, rule: &DiscountRule) -> DiscountError {
    DiscountError::InvalidRule(format!("{} requires {}", rule.rule_type, field))
}

fn required_quantity(
    value: Option<i32>,
    field: &str,
    rule: &DiscountRule,
) -> Result<u32, DiscountError> {
    let value = value.ok_or_else(|| missing_field(field, rule))?;
    u32::try_from(value).map_err(|_| {
        DiscountError::InvalidRule(format!("{} must be non-negative, got {}", field, value))
    })
}

impl RuleKind {
    pub fn rule_type(&self) -> DiscountRuleType {
        match self {
            RuleKind::PercentageOff { .. } => DiscountRuleType::PercentageOff,
            RuleKind::FixedAmountOff { .. } => DiscountRuleType::FixedAmountOff,
            RuleKind::BuyXGetY { .. } => DiscountRuleType::BuyXGetY,
            RuleKind::FreeShipping => DiscountRuleType::FreeShipping,
            RuleKind::SpendXGetYOff { .. } => DiscountRuleType::SpendXGetYOff,
        }
    }

    /// Unrounded discount this rule grants `cart`
    ///
    /// Fails with `AmountOverflow` when the amount is not representable.
    pub fn calculate(&self, cart: &CartSnapshot) -> DiscountResult<Decimal> {
        let amount = match *self {
            RuleKind::PercentageOff { percent, max_discount } => {
                percentage_off(cart.subtotal, percent, max_discount)
            }
            RuleKind::FixedAmountOff { amount } => Some(fixed_amount_off(cart.subtotal, amount)),
            RuleKind::BuyXGetY {
                buy_quantity,
                get_quantity,
                get_discount,
            } => buy_x_get_y(cart, buy_quantity, get_quantity, get_discount),
            RuleKind::FreeShipping => Some(Decimal::ZERO),
            RuleKind::SpendXGetYOff {
                spend_threshold,
                amount,
            } => Some(spend_x_get_y_off(cart.subtotal, spend_threshold, amount)),
        };

        amount.ok_or(DiscountError::AmountOverflow)
    }

    /// Whether a calculated amount puts the rule in the evaluation result
    ///
    /// Free shipping is included at zero: its applicability is the signal.
    pub fn is_included(&self, amount: Decimal) -> bool {
        matches!(self, RuleKind::FreeShipping) || amount > Decimal::ZERO
    }
}

/// Currency minor-unit rounding (two decimal places, half away from zero)
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// None on overflow
fn percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount.checked_mul(percent.checked_div(Decimal::ONE_HUNDRED)?)
}

pub fn percentage_off(
    subtotal: Decimal,
    percent: Decimal,
    max_discount: Option<Decimal>,
) -> Option<Decimal> {
    let raw = percent_of(subtotal, percent)?;
    Some(match max_discount {
        Some(cap) => raw.min(cap),
        None => raw,
    })
}

/// A flat discount never makes the cart negative
pub fn fixed_amount_off(subtotal: Decimal, amount: Decimal) -> Decimal {
    amount.min(subtotal)
}

/// Zero below the threshold, which keeps the rule out of the result
pub fn spend_x_get_y_off(subtotal: Decimal, spend_threshold: Decimal, amount: Decimal) -> Decimal {
    if subtotal >= spend_threshold {
        amount.min(subtotal)
    } else {
        Decimal::ZERO
    }
}

/// Number of units discounted by a buy-X-get-Y offer on `quantity` units
pub fn free_unit_count(quantity: u32, buy_quantity: u32, get_quantity: u32) -> u64 {
    let set_size = u64::from(buy_quantity) + u64::from(get_quantity);
    if set_size == 0 {
        return 0;
    }
    let qualifying_sets = u64::from(quantity) / set_size;
    qualifying_sets * u64::from(get_quantity)
}

/// Discount the cheapest units of the cart, in complete buy+get sets
///
/// Walking the lines in ascending price order and taking units greedily sums
/// exactly the same prices as expanding every unit and sorting, without
/// allocating one entry per unit.
pub fn buy_x_get_y(
    cart: &CartSnapshot,
    buy_quantity: u32,
    get_quantity: u32,
    get_discount: Decimal,
) -> Option<Decimal> {
    let mut remaining = free_unit_count(cart.quantity, buy_quantity, get_quantity);
    if remaining == 0 {
        return Some(Decimal::ZERO);
    }

    let mut lines: Vec<(Decimal, u32)> = cart
        .items
        .iter()
        .filter(|item| item.quantity > 0)
        .map(|item| (item.price, item.quantity))
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));

    let mut discounted_total = Decimal::ZERO;
    for (price, quantity) in lines {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(u64::from(quantity));
        let line_total = price.checked_mul(Decimal::from(taken))?;
        discounted_total = discounted_total.checked_add(line_total)?;
        remaining -= taken;
    }

    percent_of(discounted_total, get_discount)
}
