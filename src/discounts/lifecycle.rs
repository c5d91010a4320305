// Rule Lifecycle Manager
//
// Create, read, update and delete for discount rules. Guarantees that every
// stored rule carries the fields its type needs, that names are unique per
// tenant, and that redeemed rules are never deleted.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::discounts::{
    calculator::RuleKind,
    error::{DiscountError, DiscountResult},
    models::{CreateDiscountRuleRequest, DiscountRule, RulePage, UpdateDiscountRuleRequest},
    query::RuleListQuery,
    repository::RuleRepository,
    types::DiscountRuleType,
};

/// Rule administration for a tenant
#[derive(Clone)]
pub struct RuleLifecycleService {
    repository: Arc<dyn RuleRepository>,
}

fn require_tenant(tenant_id: &str) -> DiscountResult<&str> {
    let tenant_id = tenant_id.trim();
    if tenant_id.is_empty() {
        return Err(DiscountError::MissingTenant);
    }
    Ok(tenant_id)
}

/// Checks that span several fields of a fully merged rule
fn validate_rule(rule: &DiscountRule) -> DiscountResult<()> {
    if rule.name.is_empty() {
        return Err(DiscountError::InvalidRule("name must not be blank".to_string()));
    }

    // Type-required fields are present and usable
    RuleKind::try_from(rule)?;

    if rule.discount_value < Decimal::ZERO {
        return Err(DiscountError::InvalidRule(
            "discount_value must be non-negative".to_string(),
        ));
    }
    if rule.rule_type == DiscountRuleType::PercentageOff
        && rule.discount_value > Decimal::ONE_HUNDRED
    {
        return Err(DiscountError::InvalidRule(format!(
            "{} discount_value must be between 0 and 100",
            rule.rule_type
        )));
    }

    if let (Some(starts_at), Some(expires_at)) = (rule.starts_at, rule.expires_at) {
        if expires_at <= starts_at {
            return Err(DiscountError::InvalidRule(
                "expires_at must be after starts_at".to_string(),
            ));
        }
    }

    Ok(())
}

impl RuleLifecycleService {
    pub fn new(repository: Arc<dyn RuleRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        request: CreateDiscountRuleRequest,
    ) -> DiscountResult<DiscountRule> {
        let tenant_id = require_tenant(tenant_id)?;
        request.validate()?;

        if request.rule_type.requires_discount_value() && request.discount_value.is_none() {
            return Err(DiscountError::InvalidRule(format!(
                "{} requires discount_value",
                request.rule_type
            )));
        }

        let rule = DiscountRule::from_request(tenant_id, request, Utc::now());
        validate_rule(&rule)?;

        if self.repository.name_exists(tenant_id, &rule.name, None).await? {
            return Err(DiscountError::DuplicateName(rule.name));
        }

        let created = self.repository.insert(&rule).await?;
        tracing::info!(
            "Created discount rule {} ({}) for tenant {}",
            created.id,
            created.rule_type,
            tenant_id
        );
        Ok(created)
    }

    pub async fn get(&self, tenant_id: &str, id: Uuid) -> DiscountResult<DiscountRule> {
        let tenant_id = require_tenant(tenant_id)?;
        self.repository
            .find_by_id(tenant_id, id)
            .await?
            .ok_or(DiscountError::RuleNotFound(id))
    }

    pub async fn list(&self, tenant_id: &str, query: &RuleListQuery) -> DiscountResult<RulePage> {
        let tenant_id = require_tenant(tenant_id)?;
        let (data, total) = self.repository.list(tenant_id, query).await?;

        Ok(RulePage {
            data,
            total,
            page: query.page,
            limit: query.limit,
        })
    }

    /// Apply a partial update and re-validate the merged rule
    ///
    /// Usage counters and the creation timestamp are never touched.
    pub async fn update(
        &self,
        tenant_id: &str,
        id: Uuid,
        patch: UpdateDiscountRuleRequest,
    ) -> DiscountResult<DiscountRule> {
        let tenant_id = require_tenant(tenant_id)?;
        patch.validate()?;

        let mut rule = self
            .repository
            .find_by_id(tenant_id, id)
            .await?
            .ok_or(DiscountError::RuleNotFound(id))?;
        let previous_name = rule.name.clone();

        // A value stored for another type is not carried over
        if let Some(rule_type) = patch.rule_type {
            if rule_type != rule.rule_type
                && rule_type.requires_discount_value()
                && patch.discount_value.is_none()
            {
                return Err(DiscountError::InvalidRule(format!(
                    "changing rule_type to {} requires discount_value",
                    rule_type
                )));
            }
        }

        rule.apply_update(patch, Utc::now());
        validate_rule(&rule)?;

        if rule.name != previous_name
            && self
                .repository
                .name_exists(tenant_id, &rule.name, Some(id))
                .await?
        {
            return Err(DiscountError::DuplicateName(rule.name));
        }

        let updated = self
            .repository
            .update(&rule)
            .await?
            .ok_or(DiscountError::RuleNotFound(id))?;

        tracing::info!("Updated discount rule {} for tenant {}", id, tenant_id);
        Ok(updated)
    }

    /// Delete a rule that has never been redeemed
    pub async fn delete(&self, tenant_id: &str, id: Uuid) -> DiscountResult<()> {
        let tenant_id = require_tenant(tenant_id)?;

        let rule = self
            .repository
            .find_by_id(tenant_id, id)
            .await?
            .ok_or(DiscountError::RuleNotFound(id))?;

        if rule.times_used > 0 {
            return Err(DiscountError::RuleInUse {
                id,
                times_used: rule.times_used,
            });
        }

        if !self.repository.delete(tenant_id, id).await? {
            return Err(DiscountError::RuleNotFound(id));
        }

        tracing::info!("Deleted discount rule {} for tenant {}", id, tenant_id);
        Ok(())
    }
}
