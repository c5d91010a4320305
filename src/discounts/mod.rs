// Discount & Promotion Module
//
// Evaluates a tenant's automatic promotion rules against a cart snapshot and
// manages the rules themselves. It is composed of:
// - Eligibility filtering: which rules may apply to a cart right now
// - Discount calculation: one algorithm per rule type
// - Evaluation: additive stacking of every eligible rule
// - Rule lifecycle: validated create, update and delete
//
// Rules are read through the `RuleRepository` trait, backed by PostgreSQL in
// production and by memory when no database is configured.

pub mod types;
pub mod error;
pub mod models;
pub mod eligibility;
pub mod calculator;
pub mod query;
pub mod repository;
pub mod engine;
pub mod lifecycle;
pub mod metrics;
pub mod handlers;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types for convenience
pub use error::{DiscountError, DiscountResult};
pub use types::DiscountRuleType;
pub use models::{
    AppliedRule,
    CartItem,
    CartSnapshot,
    CreateDiscountRuleRequest,
    DiscountRule,
    EvaluationResult,
    RulePage,
    UpdateDiscountRuleRequest,
};
pub use eligibility::EligibilityFilter;
pub use calculator::RuleKind;
pub use repository::{InMemoryRuleRepository, PgRuleRepository, RuleRepository};
pub use engine::DiscountEngine;
pub use lifecycle::RuleLifecycleService;
pub use metrics::{MetricsSummary, PerformanceMetrics};
