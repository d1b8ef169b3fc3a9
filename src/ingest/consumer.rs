//! Consumer group read loop.
//!
//! # Responsibilities
//! - Ensure the consumer group exists before reading
//! - Read one entry at a time and hand it to the pipeline
//! - Keep the stream-active flag in step with the loop's health
//!
//! # Design Decisions
//! - Cancellation is observed only between messages; an entry being
//!   processed always finishes
//! - Read failures back off for a fixed delay and retry forever

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ingest::message::{AckHandle, RawMessage};
use crate::ingest::pipeline::EventPipeline;
use crate::status::ProcessStatus;
use crate::stream::StreamBackend;

/// How long one read waits for new entries.
pub const READ_BLOCK: Duration = Duration::from_millis(5000);
/// Pause after a failed read or group setup.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct StreamConsumer {
    backend: Arc<dyn StreamBackend>,
    pipeline: Arc<EventPipeline>,
    status: Arc<ProcessStatus>,
    stream: String,
    group: String,
    consumer: String,
    block: Duration,
    retry_delay: Duration,
}

impl StreamConsumer {
    pub fn new(
        backend: Arc<dyn StreamBackend>,
        pipeline: Arc<EventPipeline>,
        status: Arc<ProcessStatus>,
        stream: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            pipeline,
            status,
            stream: stream.into(),
            group: group.into(),
            consumer: consumer.into(),
            block: READ_BLOCK,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_block(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            stream = %self.stream,
            group = %self.group,
            consumer = %self.consumer,
            "Stream consumer starting"
        );

        let mut group_ready = false;
        loop {
            if !group_ready {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    result = self.backend.ensure_group(&self.stream, &self.group) => match result {
                        Ok(()) => {
                            group_ready = true;
                            self.status.set_stream_active(true);
                        }
                        Err(e) => {
                            self.status.set_stream_active(false);
                            tracing::error!(stream = %self.stream, error = %e, "Failed to set up consumer group");
                            if !self.pause(&cancel).await {
                                break;
                            }
                            continue;
                        }
                    },
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.backend.read_group(&self.stream, &self.group, &self.consumer, self.block) => {
                    match result {
                        Ok(Some(entry)) => {
                            self.status.set_stream_active(true);
                            let ack = AckHandle::new(
                                self.backend.clone(),
                                &self.stream,
                                &self.group,
                                entry.id.clone(),
                            );
                            self.pipeline.on_message(RawMessage::from_entry(entry, ack)).await;
                        }
                        Ok(None) => self.status.set_stream_active(true),
                        Err(e) => {
                            self.status.set_stream_active(false);
                            tracing::error!(stream = %self.stream, error = %e, "Error reading from stream");
                            // The group may have vanished with the stream.
                            group_ready = false;
                            if !self.pause(&cancel).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.status.set_stream_active(false);
        tracing::info!(stream = %self.stream, "Stream consumer stopped");
    }

    /// Sleep for the retry delay. Returns false if cancelled meanwhile.
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.retry_delay) => true,
        }
    }
}
