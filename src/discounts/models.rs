// Discount rule records, cart snapshots and evaluation results

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::discounts::types::DiscountRuleType;
use crate::validation::{validate_non_negative_amount, validate_percentage};

/// A tenant's promotion rule as stored
///
/// The evaluation engine treats this as read-only input; `times_used` is only
/// ever written by the redemption path, which lives outside this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DiscountRule {
    pub id: Uuid,
    #[schema(example = "acme")]
    pub tenant_id: String,
    #[schema(example = "Summer sale")]
    pub name: String,
    pub description: Option<String>,
    pub rule_type: DiscountRuleType,
    pub is_active: bool,
    pub is_automatic: bool,
    /// Percentage points, currency amount, or flat amount depending on `rule_type`
    #[schema(value_type = String, example = "10")]
    pub discount_value: Decimal,
    #[schema(value_type = Option<String>)]
    pub max_discount: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    pub min_item_quantity: Option<i32>,
    pub buy_quantity: Option<i32>,
    pub get_quantity: Option<i32>,
    /// Percentage taken off each "get" unit; 100 when unset
    #[schema(value_type = Option<String>)]
    pub get_discount: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub spend_threshold: Option<Decimal>,
    pub applies_to_all: bool,
    pub applicable_products: Vec<String>,
    pub applicable_categories: Vec<String>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a cart snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    #[schema(example = "p1")]
    pub product_id: String,
    pub category_id: Option<String>,
    #[schema(example = 3)]
    pub quantity: u32,
    /// Per-unit price
    #[schema(value_type = String, example = "20")]
    pub price: Decimal,
}

/// Caller-supplied cart contents
///
/// Quantities are unsigned, so a negative one fails deserialization and is
/// answered with 422 `INVALID_BODY`. Other values are not validated: a
/// negative amount or a `quantity` that disagrees with the item lines is the
/// caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartSnapshot {
    /// Pre-discount, pre-tax, pre-shipping total
    #[schema(value_type = String, example = "120")]
    pub subtotal: Decimal,
    /// Total unit count across items
    #[schema(example = 6)]
    pub quantity: u32,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// A rule that contributed to an evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedRule {
    pub id: Uuid,
    pub name: String,
    pub rule_type: DiscountRuleType,
    #[schema(value_type = String)]
    pub discount_value: Decimal,
    /// Rounded to two decimal places
    #[schema(value_type = String)]
    pub calculated_discount: Decimal,
}

/// Outcome of evaluating a cart against a tenant's automatic rules
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct EvaluationResult {
    pub applicable_rules: Vec<AppliedRule>,
    /// Sum of the unrounded per-rule discounts, rounded once
    #[schema(value_type = String)]
    pub total_discount: Decimal,
}

impl EvaluationResult {
    /// Whether any eligible rule asked for shipping to be waived
    pub fn has_free_shipping(&self) -> bool {
        self.applicable_rules
            .iter()
            .any(|rule| rule.rule_type == DiscountRuleType::FreeShipping)
    }
}

fn default_true() -> bool {
    true
}

/// Request DTO for creating a discount rule
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateDiscountRuleRequest {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Summer sale")]
    pub name: String,
    pub description: Option<String>,
    pub rule_type: DiscountRuleType,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_automatic: bool,
    #[validate(custom = "validate_non_negative_amount")]
    #[schema(value_type = Option<String>)]
    pub discount_value: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    #[schema(value_type = Option<String>)]
    pub max_discount: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    #[validate(range(min = 0))]
    pub min_item_quantity: Option<i32>,
    #[validate(range(min = 1))]
    pub buy_quantity: Option<i32>,
    #[validate(range(min = 1))]
    pub get_quantity: Option<i32>,
    #[validate(custom = "validate_percentage")]
    #[schema(value_type = Option<String>)]
    pub get_discount: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    #[schema(value_type = Option<String>)]
    pub spend_threshold: Option<Decimal>,
    #[serde(default = "default_true")]
    pub applies_to_all: bool,
    #[serde(default)]
    pub applicable_products: Vec<String>,
    #[serde(default)]
    pub applicable_categories: Vec<String>,
    #[validate(range(min = 0))]
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: i32,
}

/// Request DTO for updating a discount rule
///
/// Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateDiscountRuleRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub rule_type: Option<DiscountRuleType>,
    pub is_active: Option<bool>,
    pub is_automatic: Option<bool>,
    #[validate(custom = "validate_non_negative_amount")]
    #[schema(value_type = Option<String>)]
    pub discount_value: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    #[schema(value_type = Option<String>)]
    pub max_discount: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    #[validate(range(min = 0))]
    pub min_item_quantity: Option<i32>,
    #[validate(range(min = 1))]
    pub buy_quantity: Option<i32>,
    #[validate(range(min = 1))]
    pub get_quantity: Option<i32>,
    #[validate(custom = "validate_percentage")]
    #[schema(value_type = Option<String>)]
    pub get_discount: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    #[schema(value_type = Option<String>)]
    pub spend_threshold: Option<Decimal>,
    pub applies_to_all: Option<bool>,
    pub applicable_products: Option<Vec<String>>,
    pub applicable_categories: Option<Vec<String>>,
    #[validate(range(min = 0))]
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub priority: Option<i32>,
}

impl DiscountRule {
    /// Build a new, never-used rule for `tenant_id` from a create request
    pub fn from_request(tenant_id: &str, request: CreateDiscountRuleRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            name: request.name.trim().to_string(),
            description: request.description,
            rule_type: request.rule_type,
            is_active: request.is_active,
            is_automatic: request.is_automatic,
            discount_value: request.discount_value.unwrap_or(Decimal::ZERO),
            max_discount: request.max_discount,
            min_order_amount: request.min_order_amount,
            min_item_quantity: request.min_item_quantity,
            buy_quantity: request.buy_quantity,
            get_quantity: request.get_quantity,
            get_discount: request.get_discount,
            spend_threshold: request.spend_threshold,
            applies_to_all: request.applies_to_all,
            applicable_products: request.applicable_products,
            applicable_categories: request.applicable_categories,
            usage_limit: request.usage_limit,
            times_used: 0,
            starts_at: request.starts_at,
            expires_at: request.expires_at,
            priority: request.priority,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overlay the fields present in `patch`, stamping `updated_at`
    pub fn apply_update(&mut self, patch: UpdateDiscountRuleRequest, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if let Some(rule_type) = patch.rule_type {
            self.rule_type = rule_type;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(is_automatic) = patch.is_automatic {
            self.is_automatic = is_automatic;
        }
        if let Some(discount_value) = patch.discount_value {
            self.discount_value = discount_value;
        }
        if patch.max_discount.is_some() {
            self.max_discount = patch.max_discount;
        }
        if patch.min_order_amount.is_some() {
            self.min_order_amount = patch.min_order_amount;
        }
        if patch.min_item_quantity.is_some() {
            self.min_item_quantity = patch.min_item_quantity;
        }
        if patch.buy_quantity.is_some() {
            self.buy_quantity = patch.buy_quantity;
        }
        if patch.get_quantity.is_some() {
            self.get_quantity = patch.get_quantity;
        }
        if patch.get_discount.is_some() {
            self.get_discount = patch.get_discount;
        }
        if patch.spend_threshold.is_some() {
            self.spend_threshold = patch.spend_threshold;
        }
        if let Some(applies_to_all) = patch.applies_to_all {
            self.applies_to_all = applies_to_all;
        }
        if let Some(products) = patch.applicable_products {
            self.applicable_products = products;
        }
        if let Some(categories) = patch.applicable_categories {
            self.applicable_categories = categories;
        }
        if patch.usage_limit.is_some() {
            self.usage_limit = patch.usage_limit;
        }
        if patch.starts_at.is_some() {
            self.starts_at = patch.starts_at;
        }
        if patch.expires_at.is_some() {
            self.expires_at = patch.expires_at;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self.updated_at = now;
    }
}

/// A page of rules returned by the list operation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RulePage {
    pub data: Vec<DiscountRule>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn create_request() -> CreateDiscountRuleRequest {
        serde_json::from_value(json!({
            "name": "  Ten percent  ",
            "rule_type": "PERCENTAGE_OFF",
            "discount_value": 10,
            "max_discount": "15.00"
        }))
        .unwrap()
    }

    #[test]
    fn test_create_request_defaults() {
        let request = create_request();

        assert!(request.is_active);
        assert!(request.is_automatic);
        assert!(request.applies_to_all);
        assert!(request.applicable_products.is_empty());
        assert_eq!(request.priority, 0);
        assert_eq!(request.discount_value, Some(dec!(10)));
        assert_eq!(request.max_discount, Some(dec!(15.00)));
    }

    #[test]
    fn test_from_request_builds_unused_rule() {
        let now = Utc::now();
        let rule = DiscountRule::from_request("acme", create_request(), now);

        assert_eq!(rule.tenant_id, "acme");
        assert_eq!(rule.name, "Ten percent");
        assert_eq!(rule.times_used, 0);
        assert_eq!(rule.created_at, now);
        assert_eq!(rule.updated_at, now);
    }

    #[test]
    fn test_apply_update_only_touches_present_fields() {
        let created = Utc::now();
        let mut rule = DiscountRule::from_request("acme", create_request(), created);
        let later = created + chrono::Duration::minutes(5);

        rule.apply_update(
            UpdateDiscountRuleRequest {
                priority: Some(7),
                is_active: Some(false),
                ..Default::default()
            },
            later,
        );

        assert_eq!(rule.priority, 7);
        assert!(!rule.is_active);
        assert_eq!(rule.name, "Ten percent");
        assert_eq!(rule.discount_value, dec!(10));
        assert_eq!(rule.max_discount, Some(dec!(15.00)));
        assert_eq!(rule.updated_at, later);
        assert_eq!(rule.created_at, created);
    }

    #[test]
    fn test_create_request_validation() {
        let mut request = create_request();
        assert!(request.validate().is_ok());

        request.name = String::new();
        assert!(request.validate().is_err());

        let mut request = create_request();
        request.get_discount = Some(dec!(150));
        assert!(request.validate().is_err());

        let mut request = create_request();
        request.buy_quantity = Some(0);
        assert!(request.validate().is_err());

        let mut request = create_request();
        request.min_order_amount = Some(dec!(-1));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_cart_snapshot_accepts_numbers_and_strings() {
        let cart: CartSnapshot = serde_json::from_value(json!({
            "subtotal": 120,
            "quantity": 6,
            "items": [
                {"product_id": "p1", "quantity": 3, "price": "20.00"},
                {"product_id": "p2", "category_id": "c1", "quantity": 3, "price": 20}
            ]
        }))
        .unwrap();

        assert_eq!(cart.subtotal, dec!(120));
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].category_id, None);
        assert_eq!(cart.items[1].category_id.as_deref(), Some("c1"));
        assert_eq!(cart.items[1].price, dec!(20));
    }

    #[test]
    fn test_has_free_shipping() {
        let mut result = EvaluationResult::default();
        assert!(!result.has_free_shipping());

        result.applicable_rules.push(AppliedRule {
            id: Uuid::new_v4(),
            name: "Ship free".to_string(),
            rule_type: DiscountRuleType::FreeShipping,
            discount_value: Decimal::ZERO,
            calculated_discount: Decimal::ZERO,
        });
        assert!(result.has_free_shipping());
    }
}
