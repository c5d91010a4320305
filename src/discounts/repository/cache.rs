// Per-tenant candidate rule cache
//
// The lock guards only map operations; rule loading happens outside it so one
// tenant's slow query never blocks lookups for another. Every invalidation
// bumps the tenant's generation, and a load that started under an older
// generation is discarded instead of stored.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::discounts::models::DiscountRule;

#[derive(Debug, Clone)]
struct CachedRules {
    rules: Vec<DiscountRule>,
    loaded_at: Instant,
}

impl CachedRules {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.loaded_at.elapsed() > ttl
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CachedRules>,
    generations: HashMap<String, u64>,
}

impl CacheState {
    fn generation(&self, tenant_id: &str) -> u64 {
        self.generations.get(tenant_id).copied().unwrap_or(0)
    }
}

/// Result of a cache lookup
#[derive(Debug, PartialEq)]
pub enum CacheLookup {
    Hit(Vec<DiscountRule>),
    /// Load the rules and hand them back with this generation
    Miss { generation: u64 },
}

#[derive(Debug)]
pub struct TenantRuleCache {
    state: RwLock<CacheState>,
    ttl: Duration,
}

impl TenantRuleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
        }
    }

    pub async fn lookup(&self, tenant_id: &str) -> CacheLookup {
        let state = self.state.read().await;
        match state.entries.get(tenant_id) {
            Some(entry) if !entry.is_stale(self.ttl) => CacheLookup::Hit(entry.rules.clone()),
            _ => CacheLookup::Miss {
                generation: state.generation(tenant_id),
            },
        }
    }

    /// Stores rules loaded under `generation`
    ///
    /// Returns false, storing nothing, if the tenant was invalidated since.
    pub async fn store(&self, tenant_id: &str, generation: u64, rules: Vec<DiscountRule>) -> bool {
        let mut state = self.state.write().await;
        if state.generation(tenant_id) != generation {
            return false;
        }

        state.entries.insert(
            tenant_id.to_string(),
            CachedRules {
                rules,
                loaded_at: Instant::now(),
            },
        );
        true
    }

    pub async fn invalidate(&self, tenant_id: &str) {
        let mut state = self.state.write().await;
        state.entries.remove(tenant_id);
        *state.generations.entry(tenant_id.to_string()).or_insert(0) += 1;
    }
}
