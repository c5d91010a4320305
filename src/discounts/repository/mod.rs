// Rule Store
//
// Persistence contract for discount rules, scoped per tenant, with an
// in-memory implementation and a PostgreSQL one.

mod cache;
mod postgres;

pub use postgres::PgRuleRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::discounts::{
    eligibility::EligibilityFilter,
    error::DiscountResult,
    models::DiscountRule,
    query::RuleListQuery,
};

/// Tenant-scoped storage for discount rules
///
/// Every method only ever sees rules belonging to `tenant_id`.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Active, automatic rules whose validity window could include `now`,
    /// ordered by priority descending then creation time descending
    async fn list_active_automatic_rules(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> DiscountResult<Vec<DiscountRule>>;

    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> DiscountResult<Option<DiscountRule>>;

    /// Whether another rule of the tenant already uses `name`
    async fn name_exists(
        &self,
        tenant_id: &str,
        name: &str,
        exclude_id: Option<Uuid>,
    ) -> DiscountResult<bool>;

    /// One page of matching rules plus the total number of matches
    async fn list(
        &self,
        tenant_id: &str,
        query: &RuleListQuery,
    ) -> DiscountResult<(Vec<DiscountRule>, i64)>;

    async fn insert(&self, rule: &DiscountRule) -> DiscountResult<DiscountRule>;

    /// Returns None when the rule no longer exists
    async fn update(&self, rule: &DiscountRule) -> DiscountResult<Option<DiscountRule>>;

    /// Returns false when nothing was deleted
    async fn delete(&self, tenant_id: &str, id: Uuid) -> DiscountResult<bool>;
}

/// Priority descending, then most recently created first
pub fn sort_by_evaluation_order(rules: &mut [DiscountRule]) {
    rules.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Rule store held in process memory
///
/// Used when no database is configured and by tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleRepository {
    rules: Arc<RwLock<HashMap<Uuid, DiscountRule>>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a stored rule as-is, bypassing lifecycle checks
    ///
    /// Stands in for writers outside this service, such as redemption.
    pub async fn put(&self, rule: DiscountRule) {
        self.rules.write().await.insert(rule.id, rule);
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn list_active_automatic_rules(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> DiscountResult<Vec<DiscountRule>> {
        let rules = self.rules.read().await;
        let mut candidates: Vec<DiscountRule> = rules
            .values()
            .filter(|rule| {
                rule.tenant_id == tenant_id
                    && rule.is_active
                    && rule.is_automatic
                    && EligibilityFilter::within_window(rule, now)
            })
            .cloned()
            .collect();

        sort_by_evaluation_order(&mut candidates);
        Ok(candidates)
    }

    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> DiscountResult<Option<DiscountRule>> {
        let rules = self.rules.read().await;
        Ok(rules
            .get(&id)
            .filter(|rule| rule.tenant_id == tenant_id)
            .cloned())
    }

    async fn name_exists(
        &self,
        tenant_id: &str,
        name: &str,
        exclude_id: Option<Uuid>,
    ) -> DiscountResult<bool> {
        let rules = self.rules.read().await;
        Ok(rules.values().any(|rule| {
            rule.tenant_id == tenant_id && rule.name == name && Some(rule.id) != exclude_id
        }))
    }

    async fn list(
        &self,
        tenant_id: &str,
        query: &RuleListQuery,
    ) -> DiscountResult<(Vec<DiscountRule>, i64)> {
        let rules = self.rules.read().await;
        let mut matching: Vec<DiscountRule> = rules
            .values()
            .filter(|rule| rule.tenant_id == tenant_id && query.matches(rule))
            .cloned()
            .collect();
        sort_by_evaluation_order(&mut matching);

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn insert(&self, rule: &DiscountRule) -> DiscountResult<DiscountRule> {
        self.rules.write().await.insert(rule.id, rule.clone());
        Ok(rule.clone())
    }

    async fn update(&self, rule: &DiscountRule) -> DiscountResult<Option<DiscountRule>> {
        let mut rules = self.rules.write().await;
        match rules.get_mut(&rule.id) {
            Some(existing) if existing.tenant_id == rule.tenant_id => {
                *existing = rule.clone();
                Ok(Some(rule.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, tenant_id: &str, id: Uuid) -> DiscountResult<bool> {
        let mut rules = self.rules.write().await;
        let owned = rules
            .get(&id)
            .is_some_and(|rule| rule.tenant_id == tenant_id);
        if owned {
            rules.remove(&id);
        }
        Ok(owned)
    }
}
