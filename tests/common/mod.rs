//! Shared helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;

use stream_sentinel::connection::ConnectionManager;
use stream_sentinel::health::{ConnectionCheck, HealthAggregator, StreamActivityCheck};
use stream_sentinel::http::{AppState, HttpServer};
use stream_sentinel::resilience::RetryPolicy;
use stream_sentinel::security::TestEventLimiter;
use stream_sentinel::status::ProcessStatus;
use stream_sentinel::stream::{MockStreamBackend, StreamEntry};

pub const STREAM: &str = "event-stream";

/// A service wired against the in-memory backend.
pub struct Harness {
    pub backend: MockStreamBackend,
    pub status: Arc<ProcessStatus>,
    pub connection: Arc<ConnectionManager>,
    pub router: Router,
}

#[allow(dead_code)]
pub fn policy(max_attempts: u32, delays_ms: &[u64]) -> RetryPolicy {
    RetryPolicy::from_millis(max_attempts, delays_ms).unwrap()
}

/// Build the HTTP router over a fresh backend. The connection is not yet established.
pub fn harness() -> Harness {
    let backend = MockStreamBackend::new();
    let status = Arc::new(ProcessStatus::new());
    let connection = Arc::new(ConnectionManager::new(
        Arc::new(backend.clone()),
        policy(3, &[10, 20, 30]),
    ));

    let health = HealthAggregator::new("test-service", "1.0.0")
        .with_check_timeout(Duration::from_millis(500))
        .register(Arc::new(ConnectionCheck::new(connection.clone())))
        .register(Arc::new(StreamActivityCheck::new(status.clone())));
    let state = AppState {
        health: Arc::new(health),
        limiter: Arc::new(TestEventLimiter::new(status.clone())),
        backend: Arc::new(backend.clone()),
        stream: STREAM.to_string(),
    };
    let router = HttpServer::new(state, Duration::from_secs(5)).router();

    Harness {
        backend,
        status,
        connection,
        router,
    }
}

/// Harness with the connection up and the consumer marked active.
#[allow(dead_code)]
pub async fn healthy_harness() -> Harness {
    let harness = harness();
    harness.connection.connect().await.unwrap();
    harness.status.set_stream_active(true);
    harness
}

#[allow(dead_code)]
pub fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post(path: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// A well-formed entry as a producer would append it.
#[allow(dead_code)]
pub fn valid_entry(id: &str) -> StreamEntry {
    StreamEntry::new(id)
        .with_field("event", "order_created")
        .with_field("aggregateId", "order-42")
        .with_field("data", r#"{"total":10}"#)
        .with_field("headers", r#"{"source":"web"}"#)
}
