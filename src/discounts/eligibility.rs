// Eligibility Filter
//
// Decides whether a candidate rule may contribute a discount to a cart,
// independent of how much it would be worth.

use chrono::{DateTime, Utc};

use crate::discounts::models::{CartSnapshot, DiscountRule};

/// Pass/fail checks applied to every candidate rule
pub struct EligibilityFilter;

impl EligibilityFilter {
    /// Whether `rule` may apply to `cart` at `now`
    ///
    /// Every check must pass. A failing rule is simply excluded; absence of
    /// applicability is never an error.
    pub fn is_eligible(rule: &DiscountRule, cart: &CartSnapshot, now: DateTime<Utc>) -> bool {
        rule.is_active
            && rule.is_automatic
            && Self::within_window(rule, now)
            && Self::under_usage_limit(rule)
            && Self::meets_min_order(rule, cart)
            && Self::meets_min_quantity(rule, cart)
            && Self::matches_cart_items(rule, cart)
    }

    /// `[starts_at, expires_at)`; a rule expires exactly at `expires_at`
    pub fn within_window(rule: &DiscountRule, now: DateTime<Utc>) -> bool {
        let started = rule.starts_at.map_or(true, |starts_at| starts_at <= now);
        let not_expired = rule.expires_at.map_or(true, |expires_at| expires_at > now);
        started && not_expired
    }

    pub fn under_usage_limit(rule: &DiscountRule) -> bool {
        rule.usage_limit
            .map_or(true, |limit| rule.times_used < limit)
    }

    pub fn meets_min_order(rule: &DiscountRule, cart: &CartSnapshot) -> bool {
        rule.min_order_amount
            .map_or(true, |min| cart.subtotal >= min)
    }

    pub fn meets_min_quantity(rule: &DiscountRule, cart: &CartSnapshot) -> bool {
        rule.min_item_quantity
            .map_or(true, |min| i64::from(cart.quantity) >= i64::from(min))
    }

    /// At least one item matches by product, or by category when it has one
    pub fn matches_cart_items(rule: &DiscountRule, cart: &CartSnapshot) -> bool {
        if rule.applies_to_all {
            return true;
        }

        cart.items.iter().any(|item| {
            rule.applicable_products.contains(&item.product_id)
                || item
                    .category_id
                    .as_ref()
                    .is_some_and(|category| rule.applicable_categories.contains(category))
        })
    }
}
