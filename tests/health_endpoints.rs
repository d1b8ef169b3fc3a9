//! HTTP surface tests: probes, detailed health, the test-event trigger.

use axum::http::{HeaderValue, StatusCode};
use tower::ServiceExt;

use stream_sentinel::http::X_CORRELATION_ID;
use stream_sentinel::stream::StreamError;

mod common;

use common::{body_json, body_text, get, harness, healthy_harness, post, STREAM};

#[tokio::test]
async fn test_liveness_needs_no_dependencies() {
    let h = harness();

    let response = h.router.oneshot(get("/health/live")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
    assert_eq!(h.backend.ping_count(), 0);
}

#[tokio::test]
async fn test_ready_when_all_checks_pass() {
    let h = healthy_harness().await;

    let response = h.router.clone().oneshot(get("/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");

    let response = h.router.oneshot(get("/health-check")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_not_ready_before_connect() {
    let h = harness();
    h.status.set_stream_active(true);

    let response = h.router.clone().oneshot(get("/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "not_ready");
    assert!(body["reason"].as_str().unwrap().contains("redis"));

    let response = h.router.oneshot(get("/health-check")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(response).await, "not ok");
}

#[tokio::test]
async fn test_detailed_health_reports_each_check() {
    let h = healthy_harness().await;

    let response = h.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"]["name"], "test-service");
    assert_eq!(body["service"]["version"], "1.0.0");
    assert_eq!(body["checks"]["redis"]["status"], "healthy");
    assert_eq!(body["checks"]["eventStream"]["status"], "healthy");
    assert_eq!(body["checks"]["eventStream"]["consumerActive"], true);
}

#[tokio::test]
async fn test_inactive_consumer_makes_service_unhealthy() {
    let h = healthy_harness().await;
    h.status.set_stream_active(false);

    let response = h.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["redis"]["status"], "healthy");
    assert_eq!(body["checks"]["eventStream"]["status"], "unhealthy");
    assert_eq!(
        body["checks"]["eventStream"]["error"],
        "Event stream consumer inactive"
    );
}

#[tokio::test]
async fn test_failed_ping_marks_connection_unhealthy() {
    let h = healthy_harness().await;
    h.backend.set_failing_pings(true);

    let response = h.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["checks"]["redis"]["status"], "unhealthy");
    assert!(!h.connection.is_connected());
}

#[tokio::test]
async fn test_trigger_publishes_then_rate_limits() {
    let h = healthy_harness().await;

    let response = h.router.clone().oneshot(post("/trigger-test-event")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["stream"], STREAM);

    let published = h.backend.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, STREAM);
    assert_eq!(published[0].1.event, "test_event");

    let response = h.router.oneshot(post("/trigger-test-event")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["retryAfter"], 1);
    assert_eq!(h.backend.published().len(), 1);
}

#[tokio::test]
async fn test_trigger_publish_failure_is_500() {
    let h = healthy_harness().await;
    h.backend
        .set_publish_error(Some(StreamError::Backend("stream unavailable".into())));

    let response = h.router.oneshot(post("/trigger-test-event")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "stream unavailable");
}

#[tokio::test]
async fn test_correlation_id_echoed_or_generated() {
    let h = harness();

    let mut request = get("/health/live");
    request
        .headers_mut()
        .insert(X_CORRELATION_ID, HeaderValue::from_static("req-abc"));
    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()[X_CORRELATION_ID], "req-abc");

    let response = h.router.oneshot(get("/health/live")).await.unwrap();
    let generated = response.headers()[X_CORRELATION_ID].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let h = harness();

    let response = h.router.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
