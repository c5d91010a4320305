// Fixtures shared by the discount module tests

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::discounts::{
    models::{CartItem, CartSnapshot, DiscountRule},
    types::DiscountRuleType,
};

/// An active, automatic, unconstrained rule of `rule_type` for tenant "acme"
pub fn rule(rule_type: DiscountRuleType) -> DiscountRule {
    rule_created_at(rule_type, Utc::now())
}

pub fn rule_created_at(rule_type: DiscountRuleType, created_at: DateTime<Utc>) -> DiscountRule {
    DiscountRule {
        id: Uuid::new_v4(),
        tenant_id: "acme".to_string(),
        name: format!("{} {}", rule_type, Uuid::new_v4()),
        description: None,
        rule_type,
        is_active: true,
        is_automatic: true,
        discount_value: Decimal::ZERO,
        max_discount: None,
        min_order_amount: None,
        min_item_quantity: None,
        buy_quantity: None,
        get_quantity: None,
        get_discount: None,
        spend_threshold: None,
        applies_to_all: true,
        applicable_products: Vec::new(),
        applicable_categories: Vec::new(),
        usage_limit: None,
        times_used: 0,
        starts_at: None,
        expires_at: None,
        priority: 0,
        created_at,
        updated_at: created_at,
    }
}

/// A cart whose lines are `(quantity, unit price)`, with products "p1", "p2", ...
///
/// `quantity` is the sum of the line quantities.
pub fn cart(subtotal: Decimal, lines: &[(u32, Decimal)]) -> CartSnapshot {
    let items: Vec<CartItem> = lines
        .iter()
        .enumerate()
        .map(|(i, &(quantity, price))| CartItem {
            product_id: format!("p{}", i + 1),
            category_id: None,
            quantity,
            price,
        })
        .collect();

    CartSnapshot {
        subtotal,
        quantity: items.iter().map(|item| item.quantity).sum(),
        items,
    }
}
