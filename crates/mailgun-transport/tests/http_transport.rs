//! HTTP-level tests for `HttpTransport` using wiremock.
//!
//! Covers authentication, status classification, retry budget, identical
//! bodies on every attempt, and cancellation.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mailgun_transport::{
    form, ApiRequest, CancellationToken, ClientConfig, HttpTransport, Region, RetryPolicy,
    Transport, TransportError,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts)
        .with_initial_backoff(Duration::from_millis(1))
        .with_max_backoff(Duration::from_millis(5))
        .with_rate_limit_fallback(Duration::from_millis(1))
}

fn transport(server: &MockServer, retry: RetryPolicy) -> HttpTransport {
    let config = ClientConfig::new("key-test", Region::Us)
        .with_base_url(server.uri())
        .with_timeout(Duration::from_secs(5))
        .with_retry(retry);
    HttpTransport::new(config).expect("transport")
}

fn route_request() -> ApiRequest {
    ApiRequest::post(["v3", "routes"]).with_form(form! {
        "priority" => 10,
        "expression" => "match_recipient('a@b.com')",
        "action" => "forward('ops@example.com')",
        "action" => "stop()",
    })
}

const ROUTE_BODY: &str = "priority=10\
    &expression=match_recipient%28%27a%40b.com%27%29\
    &action=forward%28%27ops%40example.com%27%29\
    &action=stop%28%29";

// =============================================================================
// Success Path
// =============================================================================

#[tokio::test]
async fn test_post_sends_form_and_basic_auth() {
    let server = MockServer::start().await;

    // base64("api:key-test")
    Mock::given(method("POST"))
        .and(path("/v3/routes"))
        .and(header("Authorization", "Basic YXBpOmtleS10ZXN0"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string(ROUTE_BODY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Route has been created",
            "route": { "id": "4f3bad2335335426750048c6" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = transport(&server, RetryPolicy::disabled())
        .execute(route_request(), &CancellationToken::new())
        .await
        .expect("create route");

    assert_eq!(payload["route"]["id"], "4f3bad2335335426750048c6");
}

#[tokio::test]
async fn test_get_with_query_and_encoded_segment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/example.com/templates/welcome"))
        .and(query_param("active", "yes"))
        .and(header_exists("Authorization"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "template": { "name": "welcome" } })),
        )
        .mount(&server)
        .await;

    let request = ApiRequest::get(["v3", "example.com", "templates", "welcome"])
        .with_query("active", "yes");
    let payload = transport(&server, RetryPolicy::disabled())
        .execute(request, &CancellationToken::new())
        .await
        .expect("get template");

    assert_eq!(payload["template"]["name"], "welcome");
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v3/routes/abc"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let payload = transport(&server, RetryPolicy::disabled())
        .execute(ApiRequest::delete(["v3", "routes", "abc"]), &CancellationToken::new())
        .await
        .expect("delete route");

    assert!(payload.is_null());
}

#[tokio::test]
async fn test_invalid_json_is_unknown() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/routes/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = transport(&server, fast_retry(3))
        .execute(ApiRequest::get(["v3", "routes", "abc"]), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Unknown { status: Some(200), .. }));
}

// =============================================================================
// Classification
// =============================================================================

async fn classify(status: u16, body: serde_json::Value) -> TransportError {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/routes/abc"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;

    transport(&server, RetryPolicy::disabled())
        .execute(ApiRequest::get(["v3", "routes", "abc"]), &CancellationToken::new())
        .await
        .unwrap_err()
}

#[tokio::test]
async fn test_classification_table() {
    assert!(matches!(
        classify(401, json!({"message": "Invalid private key"})).await,
        TransportError::Authentication { ref message } if message == "Invalid private key"
    ));
    assert!(classify(404, json!({"message": "Route not found"})).await.is_not_found());
    assert!(matches!(
        classify(409, json!({"message": "Domain already exists"})).await,
        TransportError::Conflict { .. }
    ));
    assert!(matches!(
        classify(400, json!({"message": "'priority' parameter is not a number"})).await,
        TransportError::Validation { field: Some(ref f), .. } if f == "priority"
    ));
    assert!(matches!(
        classify(503, json!({"message": "maintenance"})).await,
        TransportError::ServiceUnavailable { status: Some(503), .. }
    ));
    assert!(matches!(
        classify(500, json!({"message": "boom"})).await,
        TransportError::Unknown { status: Some(500), .. }
    ));
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "17"))
        .mount(&server)
        .await;

    let err = transport(&server, RetryPolicy::disabled())
        .execute(ApiRequest::get(["v3", "routes"]), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        TransportError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Duration::from_secs(17))
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_without_hint_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let retry = RetryPolicy::disabled().with_rate_limit_fallback(Duration::from_secs(9));
    let err = transport(&server, retry)
        .execute(ApiRequest::get(["v3", "routes"]), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        TransportError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Duration::from_secs(9))
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test]
async fn test_retry_resends_identical_body() {
    let server = MockServer::start().await;

    // Both mocks require the full body: an attempt that sent an empty or
    // partial body would match neither and fail with 404.
    Mock::given(method("POST"))
        .and(path("/v3/routes"))
        .and(body_string(ROUTE_BODY))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/routes"))
        .and(body_string(ROUTE_BODY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "route": { "id": "r-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = transport(&server, fast_retry(3))
        .execute(route_request(), &CancellationToken::new())
        .await
        .expect("third attempt succeeds");

    assert_eq!(payload["route"]["id"], "r-1");
}

#[tokio::test]
async fn test_rate_limited_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/routes/abc"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/routes/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"route": {"id": "abc"}})))
        .expect(1)
        .mount(&server)
        .await;

    let payload = transport(&server, fast_retry(3))
        .execute(ApiRequest::get(["v3", "routes", "abc"]), &CancellationToken::new())
        .await
        .expect("retry after rate limit");

    assert_eq!(payload["route"]["id"], "abc");
}

#[tokio::test]
async fn test_retry_exhaustion_returns_last_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(504))
        .expect(2)
        .mount(&server)
        .await;

    let err = transport(&server, fast_retry(3))
        .execute(ApiRequest::get(["v3", "routes"]), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransportError::ServiceUnavailable { status: Some(504), .. }
    ));
}

#[tokio::test]
async fn test_non_retryable_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "gone"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = transport(&server, fast_retry(5))
        .execute(ApiRequest::get(["v3", "routes", "abc"]), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_connection_refused_is_service_unavailable() {
    // Nothing listens on the discard port of localhost.
    let config = ClientConfig::new("key", Region::Us)
        .with_base_url("http://127.0.0.1:9")
        .with_retry(fast_retry(2));
    let err = HttpTransport::new(config)
        .unwrap()
        .execute(ApiRequest::get(["v3", "routes"]), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransportError::ServiceUnavailable { status: None, .. }
    ));
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_abandons_in_flight_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = transport(&server, fast_retry(3))
        .execute(ApiRequest::get(["v3", "routes"]), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}
