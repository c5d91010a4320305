// Evaluation Orchestrator
//
// Runs a cart through every candidate rule of a tenant: eligibility, then
// calculation, then additive stacking. Per-rule amounts are rounded for
// display while the total is rounded once from the unrounded sum.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::discounts::{
    calculator::{round_currency, RuleKind},
    eligibility::EligibilityFilter,
    error::{DiscountError, DiscountResult},
    metrics::PerformanceMetrics,
    models::{AppliedRule, CartSnapshot, EvaluationResult},
    repository::RuleRepository,
};

/// Evaluates carts against the automatic rules of a tenant
#[derive(Clone)]
pub struct DiscountEngine {
    repository: Arc<dyn RuleRepository>,
    metrics: PerformanceMetrics,
}

impl DiscountEngine {
    pub fn new(repository: Arc<dyn RuleRepository>, metrics: PerformanceMetrics) -> Self {
        Self { repository, metrics }
    }

    pub async fn evaluate(
        &self,
        tenant_id: &str,
        cart: &CartSnapshot,
    ) -> DiscountResult<EvaluationResult> {
        self.evaluate_at(tenant_id, cart, Utc::now()).await
    }

    /// Evaluate `cart` as of `now`
    ///
    /// Every eligible rule with a positive discount is applied; free shipping
    /// is applied at zero. Rules are never mutually exclusive and the total is
    /// not capped at the subtotal. Evaluation has no side effects on the
    /// rules themselves.
    pub async fn evaluate_at(
        &self,
        tenant_id: &str,
        cart: &CartSnapshot,
        now: DateTime<Utc>,
    ) -> DiscountResult<EvaluationResult> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(DiscountError::MissingTenant);
        }

        let _timer = self.metrics.start_evaluation();

        let candidates = self
            .repository
            .list_active_automatic_rules(tenant_id, now)
            .await?;

        let mut applicable_rules = Vec::new();
        let mut total = Decimal::ZERO;

        for rule in &candidates {
            if !EligibilityFilter::is_eligible(rule, cart, now) {
                continue;
            }

            let kind = match RuleKind::try_from(rule) {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::warn!("Skipping discount rule {} ({}): {}", rule.id, rule.name, e);
                    continue;
                }
            };

            let amount = kind.calculate(cart).map_err(|e| {
                tracing::warn!("Discount rule {} ({}) overflowed: {}", rule.id, rule.name, e);
                e
            })?;
            if !kind.is_included(amount) {
                continue;
            }

            total = total
                .checked_add(amount)
                .ok_or(DiscountError::AmountOverflow)?;
            applicable_rules.push(AppliedRule {
                id: rule.id,
                name: rule.name.clone(),
                rule_type: rule.rule_type,
                discount_value: rule.discount_value,
                calculated_discount: round_currency(amount),
            });
        }

        self.metrics.record_rules_applied(applicable_rules.len());
        tracing::debug!(
            "Evaluated {} candidate rules for tenant {}: {} applied",
            candidates.len(),
            tenant_id,
            applicable_rules.len()
        );

        Ok(EvaluationResult {
            applicable_rules,
            total_discount: round_currency(total),
        })
    }
}
