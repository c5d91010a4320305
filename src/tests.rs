// HTTP tests for the discount API, run against the in-memory rule store

use super::*;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use discounts::InMemoryRuleRepository;
use rust_decimal_macros::dec;
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

fn tenant_header() -> HeaderName {
    HeaderName::from_static(tenant::TENANT_HEADER)
}

fn create_test_server() -> TestServer {
    let repository: Arc<dyn RuleRepository> = Arc::new(InMemoryRuleRepository::new());
    let state = AppState::new(repository, PerformanceMetrics::new());
    TestServer::new(create_router(state)).unwrap()
}

async fn create_rule(server: &TestServer, tenant: &'static str, body: serde_json::Value) -> DiscountRule {
    let response = server
        .post("/api/discounts/rules")
        .add_header(tenant_header(), HeaderValue::from_static(tenant))
        .json(&body)
        .await;

    response.assert_status(StatusCode::CREATED);
    response.json::<DiscountRule>()
}

fn ten_percent_capped() -> serde_json::Value {
    json!({
        "name": "Ten percent",
        "rule_type": "PERCENTAGE_OFF",
        "discount_value": 10,
        "max_discount": 15,
        "min_order_amount": 50,
        "priority": 10
    })
}

fn buy_two_get_one() -> serde_json::Value {
    json!({
        "name": "Buy two get one",
        "rule_type": "BUY_X_GET_Y",
        "buy_quantity": 2,
        "get_quantity": 1,
        "get_discount": 100,
        "priority": 5
    })
}

fn six_unit_cart() -> serde_json::Value {
    json!({
        "subtotal": 120,
        "quantity": 6,
        "items": [
            {"product_id": "p1", "quantity": 3, "price": 20},
            {"product_id": "p2", "quantity": 3, "price": 20}
        ]
    })
}

// ============================================================================
// Evaluation
// ============================================================================

#[tokio::test]
async fn test_evaluate_stacks_rules() {
    let server = create_test_server();
    let percent = create_rule(&server, "acme", ten_percent_capped()).await;
    let bogo = create_rule(&server, "acme", buy_two_get_one()).await;

    let response = server
        .post("/api/discounts/evaluate")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&six_unit_cart())
        .await;

    response.assert_status_ok();
    let result = response.json::<EvaluationResult>();
    assert_eq!(result.total_discount, dec!(52.00));
    assert_eq!(result.applicable_rules.len(), 2);
    assert_eq!(result.applicable_rules[0].id, percent.id);
    assert_eq!(result.applicable_rules[0].calculated_discount, dec!(12.00));
    assert_eq!(result.applicable_rules[1].id, bogo.id);
    assert_eq!(result.applicable_rules[1].calculated_discount, dec!(40.00));
}

#[tokio::test]
async fn test_evaluate_without_tenant_is_rejected() {
    let server = create_test_server();

    let response = server
        .post("/api/discounts/evaluate")
        .json(&six_unit_cart())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["error_code"], "MISSING_TENANT");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_evaluate_with_no_rules_is_empty() {
    let server = create_test_server();
    create_rule(&server, "globex", ten_percent_capped()).await;

    let response = server
        .post("/api/discounts/evaluate")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&six_unit_cart())
        .await;

    response.assert_status_ok();
    let result = response.json::<EvaluationResult>();
    assert!(result.applicable_rules.is_empty());
    assert_eq!(result.total_discount, dec!(0));
}

#[tokio::test]
async fn test_free_shipping_reported_at_zero() {
    let server = create_test_server();
    create_rule(
        &server,
        "acme",
        json!({
            "name": "Ship free over 50",
            "rule_type": "FREE_SHIPPING",
            "min_order_amount": 50
        }),
    )
    .await;

    let response = server
        .post("/api/discounts/evaluate")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&json!({"subtotal": "60.00", "quantity": 1, "items": []}))
        .await;

    let result = response.json::<EvaluationResult>();
    assert_eq!(result.applicable_rules.len(), 1);
    assert_eq!(result.applicable_rules[0].rule_type, DiscountRuleType::FreeShipping);
    assert_eq!(result.total_discount, dec!(0));
}

#[tokio::test]
async fn test_negative_cart_quantity_gets_error_body() {
    let server = create_test_server();

    let response = server
        .post("/api/discounts/evaluate")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&json!({
            "subtotal": 20,
            "quantity": -1,
            "items": [{"product_id": "p1", "quantity": -1, "price": 20}]
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["error_code"], "INVALID_BODY");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_non_json_rule_body_gets_error_body() {
    let server = create_test_server();

    let response = server
        .post("/api/discounts/rules")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .text("name=Ten percent")
        .await;

    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.json::<serde_json::Value>()["error_code"], "INVALID_BODY");
}

// ============================================================================
// Rule management
// ============================================================================

#[tokio::test]
async fn test_create_rule_defaults() {
    let server = create_test_server();
    let rule = create_rule(&server, "acme", ten_percent_capped()).await;

    assert_eq!(rule.tenant_id, "acme");
    assert!(rule.is_active);
    assert!(rule.is_automatic);
    assert!(rule.applies_to_all);
    assert_eq!(rule.times_used, 0);
    assert_eq!(rule.max_discount, Some(dec!(15)));
}

#[tokio::test]
async fn test_create_rule_missing_type_field() {
    let server = create_test_server();

    let response = server
        .post("/api/discounts/rules")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&json!({
            "name": "Spend more",
            "rule_type": "SPEND_X_GET_Y_OFF",
            "discount_value": 15
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>()["error_code"], "INVALID_RULE");
}

#[tokio::test]
async fn test_create_rule_validation_details() {
    let server = create_test_server();

    let response = server
        .post("/api/discounts/rules")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&json!({
            "name": "",
            "rule_type": "FIXED_AMOUNT_OFF",
            "discount_value": 5
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert!(body["details"]["name"].is_array());
}

#[tokio::test]
async fn test_create_rule_rejects_unstorable_precision() {
    let server = create_test_server();

    let response = server
        .post("/api/discounts/rules")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&json!({
            "name": "Fractional cents",
            "rule_type": "FIXED_AMOUNT_OFF",
            "discount_value": "0.12345"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["discount_value"][0]["code"], "too_many_decimal_places");
}

#[tokio::test]
async fn test_type_change_without_value_is_rejected() {
    let server = create_test_server();
    let rule = create_rule(
        &server,
        "acme",
        json!({"name": "Ship free", "rule_type": "FREE_SHIPPING"}),
    )
    .await;

    let response = server
        .put(&format!("/api/discounts/rules/{}", rule.id))
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&json!({"rule_type": "PERCENTAGE_OFF"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>()["error_code"], "INVALID_RULE");
}

#[tokio::test]
async fn test_duplicate_name_conflicts() {
    let server = create_test_server();
    create_rule(&server, "acme", ten_percent_capped()).await;

    let response = server
        .post("/api/discounts/rules")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&ten_percent_capped())
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<serde_json::Value>()["error_code"], "DUPLICATE_NAME");
}

#[tokio::test]
async fn test_get_update_delete_rule() {
    let server = create_test_server();
    let rule = create_rule(&server, "acme", ten_percent_capped()).await;
    let path = format!("/api/discounts/rules/{}", rule.id);

    let fetched = server
        .get(&path)
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<DiscountRule>(), rule);

    let updated = server
        .put(&path)
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&json!({"is_active": false, "priority": 3}))
        .await;
    updated.assert_status_ok();
    let updated = updated.json::<DiscountRule>();
    assert!(!updated.is_active);
    assert_eq!(updated.priority, 3);
    assert_eq!(updated.discount_value, dec!(10));

    server
        .delete(&path)
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let gone = server
        .get(&path)
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .await;
    gone.assert_status_not_found();
    assert_eq!(gone.json::<serde_json::Value>()["error_code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_rule_of_other_tenant_is_not_found() {
    let server = create_test_server();
    let rule = create_rule(&server, "acme", ten_percent_capped()).await;

    server
        .get(&format!("/api/discounts/rules/{}", rule.id))
        .add_header(tenant_header(), HeaderValue::from_static("globex"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_list_rules_filters_and_paginates() {
    let server = create_test_server();
    create_rule(&server, "acme", ten_percent_capped()).await;
    create_rule(&server, "acme", buy_two_get_one()).await;
    create_rule(
        &server,
        "acme",
        json!({"name": "Ten off", "rule_type": "FIXED_AMOUNT_OFF", "discount_value": 10}),
    )
    .await;

    let response = server
        .get("/api/discounts/rules?limit=2")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .await;
    response.assert_status_ok();
    let page = response.json::<serde_json::Value>();
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(page["data"][0]["name"], "Ten percent");

    let filtered = server
        .get("/api/discounts/rules?rule_type=BUY_X_GET_Y")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .await
        .json::<serde_json::Value>();
    assert_eq!(filtered["total"], 1);

    let searched = server
        .get("/api/discounts/rules?search=TEN")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .await
        .json::<serde_json::Value>();
    assert_eq!(searched["total"], 2);
}

#[tokio::test]
async fn test_list_rules_rejects_bad_limit() {
    let server = create_test_server();

    let response = server
        .get("/api/discounts/rules?limit=500")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>()["error_code"], "INVALID_QUERY");
}

// ============================================================================
// Operational endpoints
// ============================================================================

#[tokio::test]
async fn test_health() {
    let server = create_test_server();
    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn test_metrics_count_evaluations() {
    let server = create_test_server();
    create_rule(&server, "acme", ten_percent_capped()).await;

    server
        .post("/api/discounts/evaluate")
        .add_header(tenant_header(), HeaderValue::from_static("acme"))
        .json(&six_unit_cart())
        .await
        .assert_status_ok();

    let summary = server
        .get("/api/discounts/metrics")
        .await
        .json::<serde_json::Value>();
    assert_eq!(summary["evaluations"], 1);
    assert_eq!(summary["rules_applied"], 1);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let server = create_test_server();
    let response = server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let doc = response.json::<serde_json::Value>();
    assert!(doc["paths"]["/api/discounts/evaluate"].is_object());
}
