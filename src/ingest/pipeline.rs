//! Per-message processing.
//!
//! # Flow
//! ```text
//! RawMessage → validate → record last-message time → handler → ack
//!                 │
//!                 └─ invalid: log, count, no ack
//! ```
//!
//! # Design Decisions
//! - A valid message is acked exactly once, whatever the handler does
//! - Handler failures (errors and panics) are logged, never retried
//! - The handler runs on its own task so a panic cannot unwind the consumer loop

use std::sync::Arc;

use chrono::Utc;

use crate::ingest::handler::{EventHandler, HandlerError};
use crate::ingest::message::RawMessage;
use crate::ingest::validation::{validate_message, ValidationError};
use crate::observability::metrics;
use crate::status::ProcessStatus;
use crate::stream::StreamError;

/// What happened to one message.
#[derive(Debug)]
pub enum Disposition {
    Acked,
    /// Acked, but the handler reported a failure.
    AckedAfterHandlerError(HandlerError),
    /// Failed validation; not acked.
    Rejected(ValidationError),
    /// Valid, but the acknowledgment itself failed.
    AckFailed(StreamError),
}

impl Disposition {
    pub fn was_acked(&self) -> bool {
        matches!(self, Disposition::Acked | Disposition::AckedAfterHandlerError(_))
    }
}

pub struct EventPipeline {
    handler: Arc<dyn EventHandler>,
    status: Arc<ProcessStatus>,
}

impl EventPipeline {
    pub fn new(handler: Arc<dyn EventHandler>, status: Arc<ProcessStatus>) -> Self {
        Self { handler, status }
    }

    pub async fn on_message(&self, raw: RawMessage) -> Disposition {
        let hint = raw.stream_id_hint().map(str::to_string);

        let (message, ack) = match validate_message(raw) {
            Ok(validated) => validated,
            Err(e) => {
                metrics::record_message("rejected");
                tracing::warn!(
                    stream_id = hint.as_deref().unwrap_or("unknown"),
                    field = %e.field,
                    error = %e,
                    "Rejected invalid message"
                );
                return Disposition::Rejected(e);
            }
        };

        self.status.record_message(Utc::now());

        let handler = self.handler.clone();
        let task_message = message.clone();
        let outcome = match tokio::spawn(async move { handler.handle(&task_message).await }).await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => Err(HandlerError::Panicked),
            Err(join_error) => Err(HandlerError::Failed(join_error.to_string())),
        };

        if let Err(e) = &outcome {
            metrics::record_message("handler_error");
            tracing::error!(
                stream_id = %message.stream_id,
                event = %message.event,
                aggregate_id = %message.aggregate_id,
                error = %e,
                "Event handler failed"
            );
        }

        if let Err(e) = ack.ack().await {
            metrics::record_message("ack_failed");
            tracing::error!(
                stream_id = %message.stream_id,
                event = %message.event,
                error = %e,
                "Failed to acknowledge message"
            );
            return Disposition::AckFailed(e);
        }

        match outcome {
            Ok(()) => {
                metrics::record_message("processed");
                Disposition::Acked
            }
            Err(e) => Disposition::AckedAfterHandlerError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::handler::LoggingHandler;
    use crate::ingest::message::{AckHandle, StreamMessage};
    use crate::stream::{MockStreamBackend, StreamEntry};
    use async_trait::async_trait;
    use serde_json::json;

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle(&self, _message: &StreamMessage) -> Result<(), HandlerError> {
            Err(HandlerError::Failed("downstream unavailable".into()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl EventHandler for Panicking {
        async fn handle(&self, _message: &StreamMessage) -> Result<(), HandlerError> {
            panic!("handler bug");
        }
    }

    fn setup(handler: Arc<dyn EventHandler>) -> (EventPipeline, MockStreamBackend, Arc<ProcessStatus>) {
        let status = Arc::new(ProcessStatus::new());
        (
            EventPipeline::new(handler, status.clone()),
            MockStreamBackend::new(),
            status,
        )
    }

    fn message(backend: &MockStreamBackend, body: serde_json::Value) -> RawMessage {
        let id = body["streamId"].as_str().unwrap_or_default().to_string();
        RawMessage::new(body, Some(AckHandle::new(Arc::new(backend.clone()), "s", "g", id)))
    }

    #[tokio::test]
    async fn test_data_omitted_is_acked_once() {
        let (pipeline, backend, status) = setup(Arc::new(LoggingHandler));
        let raw = message(&backend, json!({"streamId": "5-0", "event": "e", "aggregateId": "a"}));

        let disposition = pipeline.on_message(raw).await;

        assert!(matches!(disposition, Disposition::Acked));
        assert_eq!(backend.acked_ids(), vec!["5-0".to_string()]);
        assert!(status.last_message().is_some());
    }

    #[tokio::test]
    async fn test_invalid_message_not_acked() {
        let (pipeline, backend, status) = setup(Arc::new(LoggingHandler));
        let raw = message(&backend, json!({"streamId": "5-0", "event": "bad event", "aggregateId": "a"}));

        let disposition = pipeline.on_message(raw).await;

        assert!(matches!(disposition, Disposition::Rejected(_)));
        assert!(backend.acked_ids().is_empty());
        assert!(status.last_message().is_none());
    }

    #[tokio::test]
    async fn test_handler_error_still_acked() {
        let (pipeline, backend, _) = setup(Arc::new(Failing));
        let raw = message(&backend, json!({"streamId": "7-0", "event": "e", "aggregateId": "a"}));

        let disposition = pipeline.on_message(raw).await;

        assert!(disposition.was_acked());
        assert!(matches!(
            disposition,
            Disposition::AckedAfterHandlerError(HandlerError::Failed(_))
        ));
        assert_eq!(backend.acked_ids(), vec!["7-0".to_string()]);
    }

    #[tokio::test]
    async fn test_handler_panic_contained_and_acked() {
        let (pipeline, backend, _) = setup(Arc::new(Panicking));
        let raw = message(&backend, json!({"streamId": "8-0", "event": "e", "aggregateId": "a"}));

        let disposition = pipeline.on_message(raw).await;

        assert!(matches!(
            disposition,
            Disposition::AckedAfterHandlerError(HandlerError::Panicked)
        ));
        assert_eq!(backend.acked_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_colliding_stream_id_field_acks_delivered_entry() {
        let (pipeline, backend, _) = setup(Arc::new(LoggingHandler));
        let entry = StreamEntry::new("1-0")
            .with_field("event", "e")
            .with_field("aggregateId", "a")
            .with_field("streamId", "9-9");
        let ack = AckHandle::new(Arc::new(backend.clone()), "s", "g", "1-0");

        let disposition = pipeline.on_message(RawMessage::from_entry(entry, ack)).await;

        assert!(matches!(disposition, Disposition::Acked));
        assert_eq!(backend.acked_ids(), vec!["1-0".to_string()]);
    }
}
