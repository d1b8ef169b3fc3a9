//! Test event publishing.
//!
//! Used by the `/trigger-test-event` endpoint and by the optional scheduled
//! publisher job.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::observability::metrics;
use crate::status::now_iso8601;
use crate::stream::types::{OutboundEvent, StreamError};
use crate::stream::StreamBackend;

/// Event name published by the HTTP trigger.
pub const TRIGGERED_EVENT: &str = "test_event";
/// Event name published by the scheduled job.
pub const SCHEDULED_EVENT: &str = "test_starters";

/// Publish one test event with a fresh aggregate id.
///
/// Data is `{message, timestamp}`. Returns the new entry id.
pub async fn publish_test_event(
    backend: &dyn StreamBackend,
    stream: &str,
    event: &str,
    message: &str,
) -> Result<String, StreamError> {
    let aggregate_id = Uuid::new_v4().to_string();
    let data = json!({
        "message": message,
        "timestamp": now_iso8601(),
    });
    let outbound = OutboundEvent::new(event, aggregate_id.clone(), data);

    let id = backend.publish(stream, &outbound).await?;
    tracing::info!(
        stream = %stream,
        event = %event,
        aggregate_id = %aggregate_id,
        entry_id = %id,
        "Test event published"
    );
    metrics::record_test_event(event);
    Ok(id)
}

/// Publishes a test event on a fixed interval until cancelled.
pub struct ScheduledPublisher {
    backend: Arc<dyn StreamBackend>,
    stream: String,
    interval: Duration,
}

impl ScheduledPublisher {
    pub fn new(backend: Arc<dyn StreamBackend>, stream: impl Into<String>, interval: Duration) -> Self {
        Self {
            backend,
            stream: stream.into(),
            interval,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately; skip it so the first event goes out after one interval.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let result = publish_test_event(
                        self.backend.as_ref(),
                        &self.stream,
                        SCHEDULED_EVENT,
                        "Scheduled test event",
                    )
                    .await;
                    if let Err(e) = result {
                        tracing::warn!(stream = %self.stream, error = %e, "Scheduled test event failed");
                    }
                }
            }
        }
        tracing::debug!(stream = %self.stream, "Scheduled publisher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MockStreamBackend;

    #[tokio::test]
    async fn test_publish_test_event_shape() {
        let backend = MockStreamBackend::new();
        publish_test_event(&backend, "event-stream", TRIGGERED_EVENT, "hello")
            .await
            .unwrap();

        let published = backend.published();
        assert_eq!(published.len(), 1);
        let (stream, event) = &published[0];
        assert_eq!(stream, "event-stream");
        assert_eq!(event.event, "test_event");
        assert!(Uuid::parse_str(&event.aggregate_id).is_ok());
        assert_eq!(event.data["message"], "hello");
        assert!(event.data["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_publish_error_propagates() {
        let backend = MockStreamBackend::new();
        backend.set_publish_error(Some(StreamError::NotConnected));

        let result = publish_test_event(&backend, "s", TRIGGERED_EVENT, "x").await;
        assert!(matches!(result, Err(StreamError::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_publisher_stops_on_cancel() {
        let backend = MockStreamBackend::new();
        let publisher = ScheduledPublisher::new(
            Arc::new(backend.clone()),
            "s",
            Duration::from_secs(10),
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(publisher.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(25)).await;
        cancel.cancel();
        handle.await.unwrap();

        let published = backend.published();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|(_, e)| e.event == SCHEDULED_EVENT));
    }
}
