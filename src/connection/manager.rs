//! Connection lifecycle management.
//!
//! # Responsibilities
//! - Bounded connect with a scheduled backoff between attempts
//! - On-demand connection checks for the health endpoints
//! - Idempotent disconnect during shutdown

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::connection::state::{ConnectionError, ConnectionState, ConnectionStatus};
use crate::health::HealthCheckResult;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::status::iso8601;
use crate::stream::StreamBackend;

/// A first attempt failing later than this after construction is worth a warning.
const SLOW_START_WARNING: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Inner {
    state: ConnectionState,
    attempts: u32,
    last_error: Option<String>,
    last_check: Option<DateTime<Utc>>,
    connected_since: Option<Instant>,
    cycle_started: Option<Instant>,
}

/// Owns the link to the stream backend.
pub struct ConnectionManager {
    backend: Arc<dyn StreamBackend>,
    policy: RetryPolicy,
    created_at: Instant,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    pub fn new(backend: Arc<dyn StreamBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            created_at: Instant::now(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Connect with up to `max_attempts` pings.
    ///
    /// The backoff sleep between attempts is the only suspension point besides
    /// the pings themselves. No sleep follows the last attempt. Exhaustion
    /// leaves the manager in [`ConnectionState::Failed`].
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        let max_attempts = self.policy.max_attempts();
        {
            let mut inner = self.lock();
            inner.state = ConnectionState::Connecting;
            inner.attempts = 0;
            inner.cycle_started = Some(Instant::now());
        }

        tracing::info!(
            max_attempts,
            delays_ms = ?self.policy.delays().iter().map(|d| d.as_millis()).collect::<Vec<_>>(),
            "Starting stream backend connection"
        );

        for attempt in 1..=max_attempts {
            self.lock().attempts = attempt;
            tracing::info!(attempt, max_attempts, "Connection attempt");

            let start = Instant::now();
            match self.backend.ping().await {
                Ok(()) => {
                    let latency = start.elapsed();
                    {
                        let mut inner = self.lock();
                        inner.state = ConnectionState::Connected;
                        inner.last_error = None;
                        inner.last_check = Some(Utc::now());
                        inner.connected_since = Some(Instant::now());
                    }
                    metrics::record_connection_attempt(true);
                    tracing::info!(
                        attempts = attempt,
                        latency_ms = latency.as_millis() as u64,
                        "Connected to stream backend"
                    );
                    return Ok(());
                }
                Err(source) => {
                    self.lock().last_error = Some(source.to_string());
                    metrics::record_connection_attempt(false);

                    let err = ConnectionError::Attempt {
                        attempt,
                        max_attempts,
                        source,
                    };
                    tracing::error!(attempt, max_attempts, error = %err, "Connection attempt failed");

                    let elapsed = self.created_at.elapsed();
                    if attempt == 1 && elapsed > SLOW_START_WARNING {
                        tracing::warn!(
                            elapsed_secs = elapsed.as_secs(),
                            "Stream backend connection failed after 1 minute"
                        );
                    }

                    if self.policy.has_attempts_after(attempt) {
                        let delay = self.policy.delay_for(attempt);
                        tracing::info!(delay_ms = delay.as_millis() as u64, "Retrying connection");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let (attempts, last_error, total) = {
            let mut inner = self.lock();
            inner.state = ConnectionState::Failed;
            inner.connected_since = None;
            let total = inner.cycle_started.map(|t| t.elapsed()).unwrap_or_default();
            (
                inner.attempts,
                inner.last_error.clone().unwrap_or_else(|| "unknown".to_string()),
                total,
            )
        };
        tracing::error!(
            attempts,
            total_secs = total.as_secs(),
            "All stream backend connection attempts failed"
        );
        Err(ConnectionError::Exhausted {
            attempts,
            last_error,
        })
    }

    /// Probe the link once. Never retries.
    ///
    /// While not connected this answers immediately without touching the backend.
    pub async fn check_connection(&self) -> HealthCheckResult {
        {
            let inner = self.lock();
            if inner.state != ConnectionState::Connected {
                let error = inner
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "Not connected".to_string());
                return HealthCheckResult::unhealthy(error)
                    .with_attempts(inner.attempts)
                    .with_last_check(inner.last_check.map(iso8601));
            }
        }

        let start = Instant::now();
        let result = self.backend.ping().await;
        let latency = start.elapsed();

        let mut inner = self.lock();
        match result {
            Ok(()) => {
                let now = Utc::now();
                inner.last_check = Some(now);
                HealthCheckResult::healthy()
                    .with_latency(latency)
                    .with_last_check(Some(iso8601(now)))
            }
            Err(e) => {
                inner.state = ConnectionState::Disconnected;
                inner.connected_since = None;
                inner.last_error = Some(e.to_string());
                tracing::error!(error = %e, "Connection check failed");
                HealthCheckResult::unhealthy(e.to_string()).with_last_check(inner.last_check.map(iso8601))
            }
        }
    }

    /// Single attempt to restore a link lost after startup.
    ///
    /// Starts a new one-attempt cycle. Does nothing unless disconnected.
    pub async fn reconnect_once(&self) -> bool {
        {
            let mut inner = self.lock();
            if inner.state != ConnectionState::Disconnected {
                return inner.state == ConnectionState::Connected;
            }
            inner.state = ConnectionState::Connecting;
            inner.attempts = 1;
            inner.cycle_started = Some(Instant::now());
        }

        let result = self.backend.ping().await;
        metrics::record_connection_attempt(result.is_ok());

        let mut inner = self.lock();
        match result {
            Ok(()) => {
                inner.state = ConnectionState::Connected;
                inner.last_error = None;
                inner.last_check = Some(Utc::now());
                inner.connected_since = Some(Instant::now());
                tracing::info!("Stream backend connection restored");
                true
            }
            Err(e) => {
                inner.state = ConnectionState::Disconnected;
                inner.last_error = Some(e.to_string());
                tracing::debug!(error = %e, "Reconnect attempt failed");
                false
            }
        }
    }

    /// Close the link if connected. Errors are logged and swallowed.
    pub async fn disconnect(&self) {
        let was_connected = {
            let mut inner = self.lock();
            let was_connected = inner.state == ConnectionState::Connected;
            if was_connected {
                inner.state = ConnectionState::Disconnected;
                inner.connected_since = None;
            }
            was_connected
        };
        if !was_connected {
            tracing::debug!("Disconnect requested while not connected");
            return;
        }

        match self.backend.close().await {
            Ok(()) => tracing::info!("Stream backend connection closed"),
            Err(e) => tracing::error!(error = %e, "Error closing stream backend connection"),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        let inner = self.lock();
        let connected = inner.state == ConnectionState::Connected;
        ConnectionStatus {
            state: inner.state,
            connected,
            attempts: inner.attempts,
            last_error: inner.last_error.clone(),
            uptime: match inner.connected_since {
                Some(since) if connected => since.elapsed(),
                _ => Duration::ZERO,
            },
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().state == ConnectionState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::CheckStatus;
    use crate::stream::{MockStreamBackend, StreamError};

    fn policy(max: u32, delays: &[u64]) -> RetryPolicy {
        RetryPolicy::from_millis(max, delays).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_max_attempts_with_scheduled_delays() {
        let backend = MockStreamBackend::new().with_failing_pings();
        let manager = ConnectionManager::new(Arc::new(backend.clone()), policy(3, &[100, 200, 300]));

        let start = Instant::now();
        let err = manager.connect().await.unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, ConnectionError::Exhausted { attempts: 3, .. }));

        let pings = backend.ping_times();
        assert_eq!(pings.len(), 3);
        assert_eq!(pings[1] - pings[0], Duration::from_millis(100));
        assert_eq!(pings[2] - pings[1], Duration::from_millis(200));
        // No delay after the final attempt.
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert_eq!(manager.status().state, ConnectionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_succeeds_after_retry() {
        let backend = MockStreamBackend::new();
        backend.push_ping_result(Err(StreamError::Timeout));
        let manager = ConnectionManager::new(Arc::new(backend.clone()), policy(3, &[50]));

        manager.connect().await.unwrap();

        let status = manager.status();
        assert!(status.connected);
        assert_eq!(status.attempts, 2);
        assert_eq!(status.last_error, None);
        assert_eq!(backend.ping_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_delay_past_schedule() {
        let backend = MockStreamBackend::new().with_failing_pings();
        let manager = ConnectionManager::new(Arc::new(backend.clone()), policy(3, &[10]));

        let _ = manager.connect().await;

        let pings = backend.ping_times();
        assert_eq!(pings[1] - pings[0], Duration::from_millis(10));
        assert_eq!(pings[2] - pings[1], Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_check_when_never_connected() {
        let backend = MockStreamBackend::new();
        let manager = ConnectionManager::new(Arc::new(backend.clone()), policy(1, &[1]));

        let result = manager.check_connection().await;
        assert_eq!(result.status, CheckStatus::Unhealthy);
        assert_eq!(result.error.as_deref(), Some("Not connected"));
        assert_eq!(result.attempts, Some(0));
        assert_eq!(backend.ping_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_check_marks_disconnected() {
        let backend = MockStreamBackend::new();
        let manager = ConnectionManager::new(Arc::new(backend.clone()), policy(1, &[1]));
        manager.connect().await.unwrap();

        let healthy = manager.check_connection().await;
        assert!(healthy.is_healthy());
        assert!(healthy.latency.is_some());

        backend.push_ping_result(Err(StreamError::Backend("Connection reset".into())));
        let result = manager.check_connection().await;
        assert_eq!(result.error.as_deref(), Some("Connection reset"));
        assert_eq!(manager.status().state, ConnectionState::Disconnected);
        assert_eq!(manager.status().uptime, Duration::ZERO);

        // Next check answers from state, without a ping.
        let pings = backend.ping_count();
        let again = manager.check_connection().await;
        assert_eq!(again.error.as_deref(), Some("Connection reset"));
        assert_eq!(backend.ping_count(), pings);
    }

    #[tokio::test]
    async fn test_reconnect_once_restores_link() {
        let backend = MockStreamBackend::new();
        let manager = ConnectionManager::new(Arc::new(backend.clone()), policy(1, &[1]));
        manager.connect().await.unwrap();
        backend.push_ping_result(Err(StreamError::Timeout));
        manager.check_connection().await;

        assert!(manager.reconnect_once().await);
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_swallows_errors() {
        let backend = MockStreamBackend::new();
        backend.set_close_error(StreamError::Backend("boom".into()));
        let manager = ConnectionManager::new(Arc::new(backend.clone()), policy(1, &[1]));
        manager.connect().await.unwrap();

        manager.disconnect().await;
        manager.disconnect().await;

        assert_eq!(backend.close_calls(), 1);
        assert!(!manager.status().connected);
    }
}
