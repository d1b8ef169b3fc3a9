//! Shutdown coordination.
//!
//! `Running → ShuttingDown → Terminated`. The first caller claims the
//! transition with a compare-and-set on the process status; everyone else
//! gets [`ShutdownOutcome::AlreadyInProgress`].
//!
//! Teardown order: stop the HTTP server, cancel and join background jobs,
//! disconnect from the stream backend. The whole sequence runs under one
//! deadline.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionManager;
use crate::lifecycle::jobs::JobSet;
use crate::lifecycle::signals::SignalListener;
use crate::status::ProcessStatus;

/// Default bound on the whole teardown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownError {
    #[error("HTTP server error: {0}")]
    Http(String),

    #[error("job '{name}' failed: {reason}")]
    Job { name: String, reason: String },

    #[error("graceful shutdown timeout exceeded after {}s", .0.as_secs())]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Completed { elapsed: Duration },
    Failed(ShutdownError),
    TimedOut(ShutdownError),
    /// Another caller already owns the shutdown.
    AlreadyInProgress,
}

impl ShutdownOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownOutcome::Completed { .. } | ShutdownOutcome::AlreadyInProgress => 0,
            ShutdownOutcome::Failed(_) | ShutdownOutcome::TimedOut(_) => 1,
        }
    }
}

pub struct ShutdownOrchestrator {
    status: Arc<ProcessStatus>,
    connection: Arc<ConnectionManager>,
    jobs: Arc<JobSet>,
    http_token: CancellationToken,
    http_task: Mutex<Option<JoinHandle<io::Result<()>>>>,
    deadline: Duration,
}

impl ShutdownOrchestrator {
    pub fn new(status: Arc<ProcessStatus>, connection: Arc<ConnectionManager>, jobs: Arc<JobSet>) -> Self {
        Self {
            status,
            connection,
            jobs,
            http_token: CancellationToken::new(),
            http_task: Mutex::new(None),
            deadline: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Token the HTTP server watches for graceful shutdown.
    pub fn http_token(&self) -> CancellationToken {
        self.http_token.clone()
    }

    /// Hand over the running HTTP server task so teardown can wait for it.
    pub fn attach_http(&self, handle: JoinHandle<io::Result<()>>) {
        let mut slot = match self.http_task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(handle);
    }

    /// Wait for SIGINT/SIGTERM, then shut down.
    pub async fn run_until_signal(&self, mut signals: SignalListener) -> ShutdownOutcome {
        let trigger = signals.recv().await;
        self.shutdown_with(trigger, Some(signals)).await
    }

    pub async fn shutdown(&self, trigger: &str) -> ShutdownOutcome {
        self.shutdown_with(trigger, None).await
    }

    /// Run the teardown once. `signals`, if given, only log repeats while
    /// teardown runs and are dropped once it ends.
    pub async fn shutdown_with(&self, trigger: &str, signals: Option<SignalListener>) -> ShutdownOutcome {
        if !self.status.try_begin_shutdown() {
            tracing::warn!(signal = trigger, "Shutdown already in progress");
            return ShutdownOutcome::AlreadyInProgress;
        }

        let started = Instant::now();
        tracing::info!(signal = trigger, "Shutdown initiated by {}", trigger);

        let repeats = CancellationToken::new();
        let absorber = signals.map(|signals| tokio::spawn(signals.absorb_repeats(repeats.clone())));

        let outcome = match tokio::time::timeout(self.deadline, self.teardown()).await {
            Ok(Ok(())) => {
                let elapsed = started.elapsed();
                tracing::info!(
                    signal = trigger,
                    duration_ms = elapsed.as_millis() as u64,
                    "Graceful shutdown completed"
                );
                ShutdownOutcome::Completed { elapsed }
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Error during shutdown");
                ShutdownOutcome::Failed(e)
            }
            Err(_) => {
                let e = ShutdownError::Timeout(self.deadline);
                tracing::error!(error = %e, "Graceful shutdown timeout exceeded, forcing exit");
                ShutdownOutcome::TimedOut(e)
            }
        };

        repeats.cancel();
        if let Some(absorber) = absorber {
            if let Ok(count) = absorber.await {
                tracing::debug!(repeated_signals = count, "Signal listeners removed");
            }
        }
        outcome
    }

    /// Every step runs even if an earlier one failed; the first error wins.
    async fn teardown(&self) -> Result<(), ShutdownError> {
        let mut first_error = None;

        tracing::info!("Stopping HTTP server");
        self.http_token.cancel();
        let http_task = match self.http_task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = http_task {
            let result = match handle.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ShutdownError::Http(e.to_string())),
                Err(e) => Err(ShutdownError::Http(e.to_string())),
            };
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }

        tracing::info!(jobs = self.jobs.len(), "Cancelling background jobs");
        if let Err(e) = self.jobs.cancel_all().await {
            first_error.get_or_insert(e);
        }

        tracing::info!("Closing stream backend connection");
        self.connection.disconnect().await;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::RetryPolicy;
    use crate::stream::MockStreamBackend;

    async fn orchestrator(backend: &MockStreamBackend) -> (ShutdownOrchestrator, Arc<JobSet>) {
        let connection = Arc::new(ConnectionManager::new(
            Arc::new(backend.clone()),
            RetryPolicy::from_millis(1, &[1]).unwrap(),
        ));
        connection.connect().await.unwrap();
        let jobs = Arc::new(JobSet::new());
        let orchestrator = ShutdownOrchestrator::new(Arc::new(ProcessStatus::new()), connection, jobs.clone());
        (orchestrator, jobs)
    }

    #[tokio::test]
    async fn test_double_shutdown_tears_down_once() {
        let backend = MockStreamBackend::new();
        let (orchestrator, _) = orchestrator(&backend).await;

        let (first, second) = tokio::join!(
            orchestrator.shutdown("SIGTERM"),
            orchestrator.shutdown("SIGINT")
        );

        assert!(matches!(first, ShutdownOutcome::Completed { .. }));
        assert_eq!(second, ShutdownOutcome::AlreadyInProgress);
        assert_eq!(backend.close_calls(), 1);
        assert_eq!(first.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_teardown() {
        let backend = MockStreamBackend::new();
        let (orchestrator, jobs) = orchestrator(&backend).await;
        jobs.spawn("stubborn", |_cancel| async {
            tokio::time::sleep(Duration::from_secs(600)).await;
        });
        let orchestrator = orchestrator.with_deadline(Duration::from_secs(2));

        let start = Instant::now();
        let outcome = orchestrator.shutdown("SIGTERM").await;

        assert_eq!(outcome, ShutdownOutcome::TimedOut(ShutdownError::Timeout(Duration::from_secs(2))));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_http_stopped_before_disconnect() {
        let backend = MockStreamBackend::new();
        let (orchestrator, _) = orchestrator(&backend).await;

        let token = orchestrator.http_token();
        let probe = backend.clone();
        orchestrator.attach_http(tokio::spawn(async move {
            token.cancelled().await;
            // Connection must still be open when the server drains.
            assert_eq!(probe.close_calls(), 0);
            Ok(())
        }));

        let outcome = orchestrator.shutdown("SIGTERM").await;
        assert!(matches!(outcome, ShutdownOutcome::Completed { .. }));
        assert_eq!(backend.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_http_error_fails_shutdown_but_still_disconnects() {
        let backend = MockStreamBackend::new();
        let (orchestrator, _) = orchestrator(&backend).await;
        orchestrator.attach_http(tokio::spawn(async {
            Err(io::Error::other("listener closed"))
        }));

        let outcome = orchestrator.shutdown("SIGINT").await;
        assert!(matches!(outcome, ShutdownOutcome::Failed(ShutdownError::Http(_))));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(backend.close_calls(), 1);
    }
}
