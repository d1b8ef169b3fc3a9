//! `POST /trigger-test-event`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::http::request::correlation_id;
use crate::http::response::{TriggerAccepted, TriggerFailed};
use crate::http::server::AppState;
use crate::stream::publisher::{publish_test_event, TRIGGERED_EVENT};

pub async fn trigger(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let correlation_id = correlation_id(&headers);

    if let Err(limited) = state.limiter.check() {
        tracing::warn!(
            correlation_id = %correlation_id,
            retry_after = limited.retry_after,
            "Test event rate limited"
        );
        return TriggerFailed::rate_limited(limited.to_string(), limited.retry_after).into_response();
    }

    tracing::info!(correlation_id = %correlation_id, "Manual test event triggered");
    match publish_test_event(
        state.backend.as_ref(),
        &state.stream,
        TRIGGERED_EVENT,
        "Manual test event",
    )
    .await
    {
        Ok(_) => TriggerAccepted::new(state.stream.as_str()).into_response(),
        Err(e) => {
            tracing::error!(correlation_id = %correlation_id, error = %e, "Failed to publish manual test event");
            TriggerFailed::internal(e.to_string()).into_response()
        }
    }
}
