//! Metrics collection and exposition.
//!
//! # Metrics
//! - `stream_connection_attempts_total` (counter): connect attempts by outcome
//! - `stream_messages_total` (counter): inbound messages by outcome
//! - `health_check_duration_seconds` (histogram): per check, by status
//! - `stream_test_events_published_total` (counter): by event name
//! - `http_requests_total` / `http_requests_duration_seconds`: by method, path, status
//!
//! # Design Decisions
//! - Without an installed recorder every macro is a no-op, so tests and
//!   `METRICS_ENABLED=false` runs pay nothing
//! - Prometheus scrape endpoint runs on its own listener

use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::IntoResponse};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tokio::time::Instant;

const EXPONENTIAL_SECONDS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_connection_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("stream_connection_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_message(outcome: &'static str) {
    metrics::counter!("stream_messages_total", "outcome" => outcome).increment(1);
}

pub fn record_test_event(event: &str) {
    metrics::counter!("stream_test_events_published_total", "event" => event.to_string()).increment(1);
}

pub fn record_health_check(name: &str, status: &'static str, elapsed: Duration) {
    metrics::histogram!(
        "health_check_duration_seconds",
        "check" => name.to_string(),
        "status" => status
    )
    .record(elapsed.as_secs_f64());
}

/// Middleware recording request count and latency per matched route.
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    let path = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => req.uri().path().to_owned(),
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());

    response
}
