//! Tests for reqwest-retry middleware integration in the API context


use billing_client::{ApiContext, ErrorKind, PlanListQuery, PlanOperations};
use serde_json::json;
use test_utils::{init_logging, test_config, RequestCounter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context_with_retries(server: &MockServer, max_retries: u32) -> ApiContext {
    let mut config = test_config(server);
    config.access_token = Some("preset".to_string());
    config.max_retries = max_retries;
    ApiContext::new(config).expect("context")
}

/// Transient 5xx answers are retried until the service recovers
#[tokio::test]
async fn test_retry_on_server_error() {
    init_logging();
    let mock_server = MockServer::start().await;
    let counter = RequestCounter::new();
    let responder_counter = counter.clone();

    // Mock that fails twice then succeeds
    Mock::given(method("GET"))
        .and(path("/v1/payments/billing-plans/P-RETRY"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = responder_counter.increment();
            if count < 2 {
                ResponseTemplate::new(503).set_body_string("Service Unavailable")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({
                    "id": "P-RETRY",
                    "name": "T-Shirt of the Month Club Plan",
                    "state": "ACTIVE"
                }))
            }
        })
        .expect(3) // 2 failures + 1 success
        .mount(&mock_server)
        .await;

    let ctx = context_with_retries(&mock_server, 3);
    let plan = ctx
        .plans()
        .get("P-RETRY")
        .await
        .expect("Request should succeed after retries");

    assert_eq!(plan.id(), Some("P-RETRY"));
    assert_eq!(counter.get(), 3);
}

/// Client errors are returned immediately
#[tokio::test]
async fn test_no_retry_on_client_error() {
    init_logging();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/payments/billing-plans"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "name": "VALIDATION_ERROR",
            "message": "Invalid request - see details",
            "details": [{"field": "page_size", "issue": "Page size must be at most 20."}]
        })))
        .expect(1) // Should only be called once
        .mount(&mock_server)
        .await;

    let ctx = context_with_retries(&mock_server, 3);
    let err = ctx
        .plans()
        .list(&PlanListQuery::new().page_size(500))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Service);
    assert_eq!(err.service_error().map(|e| e.status), Some(400));
}

/// Retries give up after the configured budget and surface the last answer
#[tokio::test]
async fn test_retry_budget_exhausted() {
    init_logging();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/payments/billing-plans/P-DOWN"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "name": "INTERNAL_SERVICE_ERROR",
            "message": "An internal service error has occurred",
            "debug_id": "down-debug-id"
        })))
        .expect(2) // first attempt + 1 retry
        .mount(&mock_server)
        .await;

    let ctx = context_with_retries(&mock_server, 1);
    let err = ctx.plans().get("P-DOWN").await.unwrap_err();

    let service_error = err.service_error().expect("service error");
    assert_eq!(service_error.status, 500);
    assert_eq!(service_error.name.as_deref(), Some("INTERNAL_SERVICE_ERROR"));
    assert_eq!(service_error.debug_id.as_deref(), Some("down-debug-id"));
}
