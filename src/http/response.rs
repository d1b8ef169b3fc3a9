//! JSON response bodies for the test-event trigger.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TriggerAccepted {
    pub success: bool,
    pub message: String,
    pub stream: String,
}

impl TriggerAccepted {
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            success: true,
            message: "Test event published".to_string(),
            stream: stream.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerFailed {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl TriggerFailed {
    pub fn rate_limited(error: impl Into<String>, retry_after: u64) -> Self {
        Self {
            success: false,
            error: error.into(),
            retry_after: Some(retry_after),
        }
    }

    pub fn internal(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            retry_after: None,
        }
    }
}

impl IntoResponse for TriggerAccepted {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl IntoResponse for TriggerFailed {
    fn into_response(self) -> Response {
        let status = if self.retry_after.is_some() {
            StatusCode::TOO_MANY_REQUESTS
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_body() {
        let body = serde_json::to_value(TriggerFailed::rate_limited("slow down", 1)).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["retryAfter"], 1);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TriggerFailed::rate_limited("x", 1).into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            TriggerFailed::internal("x").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(TriggerAccepted::new("s").into_response().status(), StatusCode::OK);
    }
}
