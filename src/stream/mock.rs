//! In-memory stream backend for tests and local runs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::stream::types::{OutboundEvent, StreamEntry, StreamError};
use crate::stream::StreamBackend;

#[derive(Default)]
struct MockState {
    ping_results: VecDeque<Result<(), StreamError>>,
    fail_pings: bool,
    ping_delay: Option<Duration>,
    ping_times: Vec<Instant>,
    close_calls: u32,
    close_error: Option<StreamError>,
    published: Vec<(String, OutboundEvent)>,
    publish_error: Option<StreamError>,
    pending: VecDeque<Result<StreamEntry, StreamError>>,
    groups: Vec<(String, String)>,
    group_setups: u32,
    acks: Vec<(String, String, String)>,
    next_id: u64,
}

/// Scriptable backend: queue ping outcomes and entries, then inspect calls.
///
/// Clones share state, so a test can keep one clone while the service owns another.
#[derive(Clone, Default)]
pub struct MockStreamBackend {
    state: Arc<Mutex<MockState>>,
    arrivals: Arc<Notify>,
}

impl MockStreamBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Every ping without a queued result fails.
    pub fn with_failing_pings(self) -> Self {
        self.lock().fail_pings = true;
        self
    }

    /// Each ping waits this long before answering.
    pub fn with_ping_delay(self, delay: Duration) -> Self {
        self.lock().ping_delay = Some(delay);
        self
    }

    /// Queue the outcome of the next unanswered ping.
    pub fn push_ping_result(&self, result: Result<(), StreamError>) {
        self.lock().ping_results.push_back(result);
    }

    pub fn set_failing_pings(&self, failing: bool) {
        self.lock().fail_pings = failing;
    }

    pub fn set_close_error(&self, error: StreamError) {
        self.lock().close_error = Some(error);
    }

    pub fn set_publish_error(&self, error: Option<StreamError>) {
        self.lock().publish_error = error;
    }

    /// Make an entry available to `read_group`.
    pub fn push_entry(&self, entry: StreamEntry) {
        self.lock().pending.push_back(Ok(entry));
        self.arrivals.notify_one();
    }

    /// Make the next `read_group` fail.
    pub fn push_read_error(&self, error: StreamError) {
        self.lock().pending.push_back(Err(error));
        self.arrivals.notify_one();
    }

    pub fn ping_count(&self) -> usize {
        self.lock().ping_times.len()
    }

    /// When each ping was issued.
    pub fn ping_times(&self) -> Vec<Instant> {
        self.lock().ping_times.clone()
    }

    pub fn close_calls(&self) -> u32 {
        self.lock().close_calls
    }

    pub fn published(&self) -> Vec<(String, OutboundEvent)> {
        self.lock().published.clone()
    }

    pub fn groups(&self) -> Vec<(String, String)> {
        self.lock().groups.clone()
    }

    /// How many times `ensure_group` was called, including repeats.
    pub fn group_setups(&self) -> u32 {
        self.lock().group_setups
    }

    /// Acknowledged entry ids, in order.
    pub fn acked_ids(&self) -> Vec<String> {
        self.lock().acks.iter().map(|(_, _, id)| id.clone()).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }
}

#[async_trait]
impl StreamBackend for MockStreamBackend {
    async fn ping(&self) -> Result<(), StreamError> {
        let delay = {
            let mut state = self.lock();
            state.ping_times.push(Instant::now());
            state.ping_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        match state.ping_results.pop_front() {
            Some(result) => result,
            None if state.fail_pings => Err(StreamError::Backend("Connection refused".to_string())),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<(), StreamError> {
        let mut state = self.lock();
        state.close_calls += 1;
        match state.close_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn publish(&self, stream: &str, event: &OutboundEvent) -> Result<String, StreamError> {
        let mut state = self.lock();
        if let Some(error) = state.publish_error.clone() {
            return Err(error);
        }
        state.next_id += 1;
        let id = format!("{}-0", state.next_id);
        state.published.push((stream.to_string(), event.clone()));
        Ok(id)
    }

    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), StreamError> {
        let mut state = self.lock();
        state.group_setups += 1;
        let key = (stream.to_string(), group.to_string());
        if !state.groups.contains(&key) {
            state.groups.push(key);
        }
        Ok(())
    }

    async fn read_group(
        &self,
        _stream: &str,
        _group: &str,
        _consumer: &str,
        block: Duration,
    ) -> Result<Option<StreamEntry>, StreamError> {
        if let Some(next) = self.lock().pending.pop_front() {
            return next.map(Some);
        }
        // Nothing queued: wait for an arrival or the block period, like XREADGROUP BLOCK.
        let _ = tokio::time::timeout(block, self.arrivals.notified()).await;
        match self.lock().pending.pop_front() {
            Some(next) => next.map(Some),
            None => Ok(None),
        }
    }

    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), StreamError> {
        self.lock()
            .acks
            .push((stream.to_string(), group.to_string(), id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ping_script_then_default() {
        let backend = MockStreamBackend::new();
        backend.push_ping_result(Err(StreamError::Timeout));

        assert!(matches!(backend.ping().await, Err(StreamError::Timeout)));
        assert!(backend.ping().await.is_ok());
        assert_eq!(backend.ping_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_group_waits_for_block_when_empty() {
        let backend = MockStreamBackend::new();
        let start = Instant::now();
        let entry = backend
            .read_group("s", "g", "c", Duration::from_millis(250))
            .await
            .unwrap();

        assert!(entry.is_none());
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_publish_assigns_ids() {
        let backend = MockStreamBackend::new();
        let event = OutboundEvent::new("e", "a", serde_json::json!({}));

        assert_eq!(backend.publish("s", &event).await.unwrap(), "1-0");
        assert_eq!(backend.publish("s", &event).await.unwrap(), "2-0");
        assert_eq!(backend.published().len(), 2);
    }
}
