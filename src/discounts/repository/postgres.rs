// PostgreSQL rule store
//
// Keeps each tenant's active, automatic rules in a time-based cache so the
// evaluation hot path does not hit the database on every cart. Writes made
// through this store invalidate the tenant's entry immediately.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use uuid::Uuid;

use super::{
    cache::{CacheLookup, TenantRuleCache},
    RuleRepository,
};
use crate::discounts::{
    eligibility::EligibilityFilter,
    error::{DiscountError, DiscountResult},
    metrics::PerformanceMetrics,
    models::DiscountRule,
    query::RuleListQuery,
};

const RULE_COLUMNS: &str = "id, tenant_id, name, description, rule_type, is_active, is_automatic, \
     discount_value, max_discount, min_order_amount, min_item_quantity, buy_quantity, \
     get_quantity, get_discount, spend_threshold, applies_to_all, applicable_products, \
     applicable_categories, usage_limit, times_used, starts_at, expires_at, priority, \
     created_at, updated_at";

/// Rule store backed by the `discount_rules` table
pub struct PgRuleRepository {
    pool: PgPool,
    cache: TenantRuleCache,
    metrics: Option<PerformanceMetrics>,
}

impl PgRuleRepository {
    pub fn new(pool: PgPool, cache_ttl: Duration) -> Self {
        Self {
            pool,
            cache: TenantRuleCache::new(cache_ttl),
            metrics: None,
        }
    }

    /// Same as `new`, recording cache hits and misses
    pub fn with_metrics(pool: PgPool, cache_ttl: Duration, metrics: PerformanceMetrics) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(pool, cache_ttl)
        }
    }

    fn record_cache_hit(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_hit();
        }
    }

    fn record_cache_miss(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_miss();
        }
    }

    /// Drops the cached candidates of one tenant
    pub async fn invalidate(&self, tenant_id: &str) {
        self.cache.invalidate(tenant_id).await;
        tracing::debug!("Invalidated rule cache for tenant {}", tenant_id);
    }

    async fn load_active_automatic_rules(&self, tenant_id: &str) -> DiscountResult<Vec<DiscountRule>> {
        let rules = sqlx::query_as::<_, DiscountRule>(&format!(
            "SELECT {} FROM discount_rules \
             WHERE tenant_id = $1 AND is_active = TRUE AND is_automatic = TRUE \
             ORDER BY priority DESC, created_at DESC",
            RULE_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!("Loaded {} automatic rules for tenant {}", rules.len(), tenant_id);
        Ok(rules)
    }

    /// Candidates from the cache, loading them on a miss
    ///
    /// Concurrent misses for the same tenant may each load; only loads that
    /// no write has overtaken are kept.
    async fn cached_rules(&self, tenant_id: &str) -> DiscountResult<Vec<DiscountRule>> {
        let generation = match self.cache.lookup(tenant_id).await {
            CacheLookup::Hit(rules) => {
                self.record_cache_hit();
                return Ok(rules);
            }
            CacheLookup::Miss { generation } => generation,
        };

        self.record_cache_miss();

        let rules = self.load_active_automatic_rules(tenant_id).await?;
        if !self.cache.store(tenant_id, generation, rules.clone()).await {
            tracing::debug!("Rule cache for tenant {} changed during load; not stored", tenant_id);
        }
        Ok(rules)
    }
}

fn push_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    tenant_id: &'a str,
    query: &RuleListQuery,
) {
    builder.push(" WHERE tenant_id = ").push_bind(tenant_id);

    if let Some(is_active) = query.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(is_automatic) = query.is_automatic {
        builder.push(" AND is_automatic = ").push_bind(is_automatic);
    }
    if let Some(rule_type) = query.rule_type {
        builder.push(" AND rule_type = ").push_bind(rule_type);
    }
    if let Some(ref search) = query.search {
        builder
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }
}

/// Escapes LIKE wildcards so a search matches literally
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Maps a unique violation on `(tenant_id, name)` to a conflict
fn map_write_error(err: sqlx::Error, name: &str) -> DiscountError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            DiscountError::DuplicateName(name.to_string())
        }
        other => DiscountError::Database(other),
    }
}

#[async_trait]
impl RuleRepository for PgRuleRepository {
    async fn list_active_automatic_rules(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> DiscountResult<Vec<DiscountRule>> {
        let rules = self.cached_rules(tenant_id).await?;
        Ok(rules
            .into_iter()
            .filter(|rule| EligibilityFilter::within_window(rule, now))
            .collect())
    }

    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> DiscountResult<Option<DiscountRule>> {
        let rule = sqlx::query_as::<_, DiscountRule>(&format!(
            "SELECT {} FROM discount_rules WHERE id = $1 AND tenant_id = $2",
            RULE_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rule)
    }

    async fn name_exists(
        &self,
        tenant_id: &str,
        name: &str,
        exclude_id: Option<Uuid>,
    ) -> DiscountResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM discount_rules
                WHERE tenant_id = $1 AND name = $2 AND ($3::uuid IS NULL OR id <> $3)
            )",
        )
        .bind(tenant_id)
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list(
        &self,
        tenant_id: &str,
        query: &RuleListQuery,
    ) -> DiscountResult<(Vec<DiscountRule>, i64)> {
        let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM discount_rules");
        push_filters(&mut count_builder, tenant_id, query);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM discount_rules", RULE_COLUMNS));
        push_filters(&mut builder, tenant_id, query);
        builder
            .push(" ORDER BY priority DESC, created_at DESC LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(query.offset());

        let rules = builder
            .build_query_as::<DiscountRule>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rules, total))
    }

    async fn insert(&self, rule: &DiscountRule) -> DiscountResult<DiscountRule> {
        let created = sqlx::query_as::<_, DiscountRule>(&format!(
            "INSERT INTO discount_rules ({cols})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                     $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
             RETURNING {cols}",
            cols = RULE_COLUMNS
        ))
        .bind(rule.id)
        .bind(&rule.tenant_id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.rule_type)
        .bind(rule.is_active)
        .bind(rule.is_automatic)
        .bind(rule.discount_value)
        .bind(rule.max_discount)
        .bind(rule.min_order_amount)
        .bind(rule.min_item_quantity)
        .bind(rule.buy_quantity)
        .bind(rule.get_quantity)
        .bind(rule.get_discount)
        .bind(rule.spend_threshold)
        .bind(rule.applies_to_all)
        .bind(&rule.applicable_products)
        .bind(&rule.applicable_categories)
        .bind(rule.usage_limit)
        .bind(rule.times_used)
        .bind(rule.starts_at)
        .bind(rule.expires_at)
        .bind(rule.priority)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &rule.name))?;

        self.invalidate(&rule.tenant_id).await;
        Ok(created)
    }

    async fn update(&self, rule: &DiscountRule) -> DiscountResult<Option<DiscountRule>> {
        let updated = sqlx::query_as::<_, DiscountRule>(&format!(
            "UPDATE discount_rules SET
                name = $3, description = $4, rule_type = $5, is_active = $6,
                is_automatic = $7, discount_value = $8, max_discount = $9,
                min_order_amount = $10, min_item_quantity = $11, buy_quantity = $12,
                get_quantity = $13, get_discount = $14, spend_threshold = $15,
                applies_to_all = $16, applicable_products = $17,
                applicable_categories = $18, usage_limit = $19, starts_at = $20,
                expires_at = $21, priority = $22, updated_at = $23
             WHERE id = $1 AND tenant_id = $2
             RETURNING {}",
            RULE_COLUMNS
        ))
        .bind(rule.id)
        .bind(&rule.tenant_id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.rule_type)
        .bind(rule.is_active)
        .bind(rule.is_automatic)
        .bind(rule.discount_value)
        .bind(rule.max_discount)
        .bind(rule.min_order_amount)
        .bind(rule.min_item_quantity)
        .bind(rule.buy_quantity)
        .bind(rule.get_quantity)
        .bind(rule.get_discount)
        .bind(rule.spend_threshold)
        .bind(rule.applies_to_all)
        .bind(&rule.applicable_products)
        .bind(&rule.applicable_categories)
        .bind(rule.usage_limit)
        .bind(rule.starts_at)
        .bind(rule.expires_at)
        .bind(rule.priority)
        .bind(rule.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &rule.name))?;

        self.invalidate(&rule.tenant_id).await;
        Ok(updated)
    }

    async fn delete(&self, tenant_id: &str, id: Uuid) -> DiscountResult<bool> {
        let result = sqlx::query("DELETE FROM discount_rules WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        self.invalidate(tenant_id).await;
        Ok(result.rows_affected() > 0)
    }
}
