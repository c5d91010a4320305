pub mod config;
pub mod db;
pub mod discounts;
pub mod error;
pub mod tenant;
pub mod validation;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use discounts::{
    handlers, metrics::MetricsSummary, AppliedRule, CartItem, CartSnapshot,
    CreateDiscountRuleRequest, DiscountEngine, DiscountRule, DiscountRuleType, EvaluationResult,
    PerformanceMetrics, RuleLifecycleService, RulePage, RuleRepository,
    UpdateDiscountRuleRequest,
};
use error::ErrorResponse;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::evaluate_cart,
        handlers::create_rule,
        handlers::list_rules,
        handlers::get_rule,
        handlers::update_rule,
        handlers::delete_rule,
        handlers::get_metrics,
    ),
    components(schemas(
        CartItem,
        CartSnapshot,
        AppliedRule,
        EvaluationResult,
        DiscountRule,
        DiscountRuleType,
        CreateDiscountRuleRequest,
        UpdateDiscountRuleRequest,
        RulePage,
        MetricsSummary,
        ErrorResponse,
    )),
    tags(
        (name = "discounts", description = "Cart discount evaluation"),
        (name = "discount-rules", description = "Discount rule management")
    ),
    info(
        title = "Discount Engine API",
        version = "0.1.0",
        description = "Automatic promotion rule evaluation for multi-tenant carts"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: DiscountEngine,
    pub lifecycle: RuleLifecycleService,
    pub metrics: PerformanceMetrics,
}

impl AppState {
    /// Wires the engine and lifecycle service onto one rule store
    pub fn new(repository: Arc<dyn RuleRepository>, metrics: PerformanceMetrics) -> Self {
        Self {
            engine: DiscountEngine::new(repository.clone(), metrics.clone()),
            lifecycle: RuleLifecycleService::new(repository),
            metrics,
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds tracing and CORS middleware
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/api/discounts/evaluate", post(handlers::evaluate_cart))
        .route(
            "/api/discounts/rules",
            post(handlers::create_rule).get(handlers::list_rules),
        )
        .route(
            "/api/discounts/rules/:id",
            get(handlers::get_rule)
                .put(handlers::update_rule)
                .delete(handlers::delete_rule),
        )
        .route("/api/discounts/metrics", get(handlers::get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests;
