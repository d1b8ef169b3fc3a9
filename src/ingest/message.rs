//! Inbound message shapes.
//!
//! A [`RawMessage`] is what the consumer loop hands to the pipeline: an
//! untrusted JSON body plus, when the transport supports it, an [`AckHandle`].
//! A [`StreamMessage`] is the validated, canonical form handlers receive.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::stream::types::{fields, StreamEntry};
use crate::stream::{StreamBackend, StreamError};

/// Field name carrying the delivered entry id in a message body.
pub const STREAM_ID: &str = "streamId";

/// Single-use acknowledgment capability for one delivered entry.
///
/// The handle is bound to the entry id it was delivered with, and `ack`
/// takes `self`, so it acknowledges that entry and nothing else, at most once.
pub struct AckHandle {
    backend: Arc<dyn StreamBackend>,
    stream: String,
    group: String,
    entry_id: String,
}

impl AckHandle {
    pub fn new(
        backend: Arc<dyn StreamBackend>,
        stream: impl Into<String>,
        group: impl Into<String>,
        entry_id: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            stream: stream.into(),
            group: group.into(),
            entry_id: entry_id.into(),
        }
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub async fn ack(self) -> Result<(), StreamError> {
        self.backend.ack(&self.stream, &self.group, &self.entry_id).await
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle")
            .field("stream", &self.stream)
            .field("group", &self.group)
            .field("entry_id", &self.entry_id)
            .finish()
    }
}

/// Unvalidated inbound message.
#[derive(Debug)]
pub struct RawMessage {
    pub body: Value,
    pub ack: Option<AckHandle>,
}

impl RawMessage {
    pub fn new(body: Value, ack: Option<AckHandle>) -> Self {
        Self { body, ack }
    }

    /// Build a message from a stream entry.
    ///
    /// `data` and `headers` are decoded from JSON; text that does not decode
    /// stays a plain string so validation rejects it. `streamId` always comes
    /// from the delivered entry; a producer field of that name is dropped.
    pub fn from_entry(entry: StreamEntry, ack: AckHandle) -> Self {
        let mut body = Map::new();

        for (key, text) in entry.fields {
            if key == STREAM_ID {
                tracing::warn!(stream_id = %entry.id, "Ignoring producer-supplied streamId field");
                continue;
            }
            let value = match key.as_str() {
                fields::DATA | fields::HEADERS => {
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                }
                _ => Value::String(text),
            };
            body.insert(key, value);
        }
        body.insert(STREAM_ID.to_string(), Value::String(entry.id));

        Self {
            body: Value::Object(body),
            ack: Some(ack),
        }
    }

    /// Best-effort stream id for log lines about rejected messages.
    pub fn stream_id_hint(&self) -> Option<&str> {
        self.body.get(STREAM_ID).and_then(Value::as_str)
    }
}

/// Validated, canonical message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMessage {
    pub stream_id: String,
    pub event: String,
    pub aggregate_id: String,
    pub data: Map<String, Value>,
    pub headers: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MockStreamBackend;

    #[tokio::test]
    async fn test_from_entry_decodes_json_fields() {
        let backend = MockStreamBackend::new();
        let entry = StreamEntry::new("1-0")
            .with_field("event", "order_created")
            .with_field("aggregateId", "abc")
            .with_field("data", r#"{"total": 12}"#)
            .with_field("headers", "not json");

        let raw = RawMessage::from_entry(entry, AckHandle::new(Arc::new(backend), "s", "g", "1-0"));

        assert_eq!(raw.stream_id_hint(), Some("1-0"));
        assert_eq!(raw.body["data"]["total"], 12);
        assert_eq!(raw.body["headers"], "not json");
        assert_eq!(raw.body["event"], "order_created");
        assert!(raw.ack.is_some());
    }

    #[tokio::test]
    async fn test_ack_handle_acks_bound_entry() {
        let backend = MockStreamBackend::new();
        let handle = AckHandle::new(Arc::new(backend.clone()), "s", "g", "42-0");
        assert_eq!(handle.entry_id(), "42-0");

        handle.ack().await.unwrap();

        assert_eq!(backend.acked_ids(), vec!["42-0".to_string()]);
    }

    #[tokio::test]
    async fn test_producer_stream_id_field_cannot_override_entry_id() {
        let backend = MockStreamBackend::new();
        let entry = StreamEntry::new("1-0")
            .with_field("event", "e")
            .with_field("aggregateId", "a")
            .with_field("streamId", "9-9");

        let raw = RawMessage::from_entry(entry, AckHandle::new(Arc::new(backend), "s", "g", "1-0"));

        assert_eq!(raw.stream_id_hint(), Some("1-0"));
        assert_eq!(raw.body["streamId"], "1-0");
    }
}
