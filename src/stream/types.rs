//! Stream entry types and error definitions.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Errors raised by a stream backend.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// No live connection; `ping` establishes one.
    #[error("Not connected")]
    NotConnected,

    /// The backend did not answer in time.
    #[error("Timeout error")]
    Timeout,

    /// Connection settings are unusable (bad URL, bad TLS setup).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An entry field could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),

    /// Backend-specific failure carried as text.
    #[error("{0}")]
    Backend(String),
}

impl From<redis::RedisError> for StreamError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            StreamError::Timeout
        } else {
            StreamError::Redis(Arc::new(err))
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Serialization(err.to_string())
    }
}

/// One entry read from a stream through a consumer group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Backend-assigned entry id (e.g. `1714564800000-0`).
    pub id: String,
    /// Raw field/value pairs as stored.
    pub fields: HashMap<String, String>,
}

impl StreamEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

/// An event to append to a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub event: String,
    pub aggregate_id: String,
    pub data: Value,
    pub headers: HashMap<String, String>,
}

impl OutboundEvent {
    pub fn new(event: impl Into<String>, aggregate_id: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            aggregate_id: aggregate_id.into(),
            data,
            headers: HashMap::new(),
        }
    }
}

/// Entry field names shared by publisher and consumer.
pub mod fields {
    pub const EVENT: &str = "event";
    pub const AGGREGATE_ID: &str = "aggregateId";
    pub const DATA: &str = "data";
    pub const HEADERS: &str = "headers";
    pub const TIMESTAMP: &str = "timestamp";
    pub const SERVICE_NAME: &str = "serviceName";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(StreamError::NotConnected.to_string(), "Not connected");
        assert_eq!(
            StreamError::InvalidConfiguration("bad url".into()).to_string(),
            "Invalid configuration: bad url"
        );
    }

    #[test]
    fn test_redis_timeout_maps_to_timeout() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        let err = StreamError::from(redis::RedisError::from(io));
        assert!(matches!(err, StreamError::Timeout));
    }
}
