// HTTP handlers for discount evaluation and rule management endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::discounts::{
    error::DiscountResult,
    metrics::MetricsSummary,
    models::{
        CartSnapshot, CreateDiscountRuleRequest, DiscountRule, EvaluationResult, RulePage,
        UpdateDiscountRuleRequest,
    },
    query::{RuleListParams, RuleListQuery},
};
use crate::error::ErrorResponse;
use crate::tenant::TenantId;
use crate::AppState;

/// Handler for POST /api/discounts/evaluate
/// Computes the automatic discounts a cart qualifies for
#[utoipa::path(
    post,
    path = "/api/discounts/evaluate",
    request_body = CartSnapshot,
    params(("X-Tenant-Id" = String, Header, description = "Tenant scope")),
    responses(
        (status = 200, description = "Applicable rules and total discount", body = EvaluationResult),
        (status = 400, description = "Missing tenant or amount out of range", body = ErrorResponse),
        (status = 422, description = "Malformed cart", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "discounts"
)]
pub async fn evaluate_cart(
    State(state): State<AppState>,
    tenant: TenantId,
    body: Result<Json<CartSnapshot>, JsonRejection>,
) -> DiscountResult<Json<EvaluationResult>> {
    let Json(cart) = body?;
    tracing::debug!(
        "Evaluating cart for tenant {}: subtotal {}, {} units",
        tenant.as_str(),
        cart.subtotal,
        cart.quantity
    );

    let result = state.engine.evaluate(tenant.as_str(), &cart).await?;
    Ok(Json(result))
}

/// Handler for POST /api/discounts/rules
#[utoipa::path(
    post,
    path = "/api/discounts/rules",
    request_body = CreateDiscountRuleRequest,
    params(("X-Tenant-Id" = String, Header, description = "Tenant scope")),
    responses(
        (status = 201, description = "Rule created", body = DiscountRule),
        (status = 400, description = "Invalid rule", body = ErrorResponse),
        (status = 422, description = "Malformed request body", body = ErrorResponse),
        (status = 409, description = "Duplicate rule name", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "discount-rules"
)]
pub async fn create_rule(
    State(state): State<AppState>,
    tenant: TenantId,
    body: Result<Json<CreateDiscountRuleRequest>, JsonRejection>,
) -> DiscountResult<(StatusCode, Json<DiscountRule>)> {
    let Json(payload) = body?;
    let rule = state.lifecycle.create(tenant.as_str(), payload).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Handler for GET /api/discounts/rules
/// Supports filtering and pagination
#[utoipa::path(
    get,
    path = "/api/discounts/rules",
    params(
        ("X-Tenant-Id" = String, Header, description = "Tenant scope"),
        RuleListParams
    ),
    responses(
        (status = 200, description = "One page of rules", body = RulePage),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "discount-rules"
)]
pub async fn list_rules(
    State(state): State<AppState>,
    tenant: TenantId,
    Query(params): Query<RuleListParams>,
) -> DiscountResult<Json<RulePage>> {
    tracing::debug!("Listing discount rules with {:?}", params);

    let query = RuleListQuery::validate(params)?;
    let page = state.lifecycle.list(tenant.as_str(), &query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/discounts/rules/{id}",
    params(
        ("X-Tenant-Id" = String, Header, description = "Tenant scope"),
        ("id" = Uuid, Path, description = "Rule ID")
    ),
    responses(
        (status = 200, description = "Rule found", body = DiscountRule),
        (status = 404, description = "Rule not found", body = ErrorResponse)
    ),
    tag = "discount-rules"
)]
pub async fn get_rule(
    State(state): State<AppState>,
    tenant: TenantId,
    Path(id): Path<Uuid>,
) -> DiscountResult<Json<DiscountRule>> {
    let rule = state.lifecycle.get(tenant.as_str(), id).await?;
    Ok(Json(rule))
}

/// Handler for PUT /api/discounts/rules/:id
/// Omitted fields keep their stored values
#[utoipa::path(
    put,
    path = "/api/discounts/rules/{id}",
    request_body = UpdateDiscountRuleRequest,
    params(
        ("X-Tenant-Id" = String, Header, description = "Tenant scope"),
        ("id" = Uuid, Path, description = "Rule ID")
    ),
    responses(
        (status = 200, description = "Rule updated", body = DiscountRule),
        (status = 400, description = "Invalid rule", body = ErrorResponse),
        (status = 404, description = "Rule not found", body = ErrorResponse),
        (status = 409, description = "Duplicate rule name", body = ErrorResponse),
        (status = 422, description = "Malformed request body", body = ErrorResponse)
    ),
    tag = "discount-rules"
)]
pub async fn update_rule(
    State(state): State<AppState>,
    tenant: TenantId,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateDiscountRuleRequest>, JsonRejection>,
) -> DiscountResult<Json<DiscountRule>> {
    let Json(payload) = body?;
    let rule = state.lifecycle.update(tenant.as_str(), id, payload).await?;
    Ok(Json(rule))
}

#[utoipa::path(
    delete,
    path = "/api/discounts/rules/{id}",
    params(
        ("X-Tenant-Id" = String, Header, description = "Tenant scope"),
        ("id" = Uuid, Path, description = "Rule ID")
    ),
    responses(
        (status = 204, description = "Rule deleted"),
        (status = 404, description = "Rule not found", body = ErrorResponse),
        (status = 409, description = "Rule has been used; deactivate it instead", body = ErrorResponse)
    ),
    tag = "discount-rules"
)]
pub async fn delete_rule(
    State(state): State<AppState>,
    tenant: TenantId,
    Path(id): Path<Uuid>,
) -> DiscountResult<StatusCode> {
    state.lifecycle.delete(tenant.as_str(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/discounts/metrics
#[utoipa::path(
    get,
    path = "/api/discounts/metrics",
    responses(
        (status = 200, description = "Evaluation and cache counters", body = MetricsSummary)
    ),
    tag = "discounts"
)]
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSummary> {
    Json(state.metrics.summary())
}
