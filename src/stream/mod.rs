//! Event stream backend subsystem.
//!
//! # Data Flow
//! ```text
//! Connection manager → StreamBackend::ping / close
//! Consumer loop      → ensure_group → read_group → (pipeline) → ack
//! Test events        → publisher.rs → StreamBackend::publish
//! ```
//!
//! # Design Decisions
//! - The core talks to a trait; the Redis wire format stays in redis.rs
//! - A scriptable in-memory backend (mock.rs) stands in for Redis in tests
//! - Consumer reads use their own connection so blocking reads never delay pings

use std::time::Duration;

use async_trait::async_trait;

pub mod mock;
pub mod publisher;
pub mod redis;
pub mod types;

pub use self::mock::MockStreamBackend;
pub use self::redis::RedisStreamBackend;
pub use self::types::{OutboundEvent, StreamEntry, StreamError};

/// Operations the service needs from a durable event stream.
#[async_trait]
pub trait StreamBackend: Send + Sync {
    /// Lightweight liveness probe; establishes the link if needed.
    async fn ping(&self) -> Result<(), StreamError>;

    /// Close the link. Safe to call when already closed.
    async fn close(&self) -> Result<(), StreamError>;

    /// Append an event, returning the entry id.
    async fn publish(&self, stream: &str, event: &OutboundEvent) -> Result<String, StreamError>;

    /// Create the consumer group (and stream) if missing.
    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), StreamError>;

    /// Read the next undelivered entry for `consumer`, waiting at most `block`.
    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        block: Duration,
    ) -> Result<Option<StreamEntry>, StreamError>;

    /// Acknowledge entry `id` for `group`.
    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), StreamError>;
}
