//! Request correlation.
//!
//! # Responsibilities
//! - Assign every request a correlation id (UUID v4) unless the caller sent one
//! - Echo the id on the response
//! - Open a tracing span carrying the id
//!
//! # Design Decisions
//! - Id added as early as possible so every log line for a request can carry it

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::Span;

pub const X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Generates a UUID correlation id when the request has none.
pub fn set_correlation_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_CORRELATION_ID, MakeRequestUuid)
}

/// Copies the request's correlation id onto the response.
pub fn propagate_correlation_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_CORRELATION_ID)
}

/// Correlation id of a request, or `-` before the id layer has run.
pub fn correlation_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_CORRELATION_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

/// Span for `TraceLayer::make_span_with`.
pub fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        correlation_id = %correlation_id(request.headers()),
    )
}
