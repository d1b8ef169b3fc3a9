//! Event handlers.

use async_trait::async_trait;
use thiserror::Error;

use crate::ingest::message::StreamMessage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),

    #[error("handler panicked")]
    Panicked,
}

/// Business logic run for each validated message.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, message: &StreamMessage) -> Result<(), HandlerError>;
}

/// Logs each event and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, message: &StreamMessage) -> Result<(), HandlerError> {
        tracing::info!(
            stream_id = %message.stream_id,
            event = %message.event,
            aggregate_id = %message.aggregate_id,
            "Event {} received for aggregate {}",
            message.event,
            message.aggregate_id
        );
        Ok(())
    }
}
