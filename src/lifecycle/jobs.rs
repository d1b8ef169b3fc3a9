//! Named background jobs sharing one cancellation token.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::shutdown::ShutdownError;

#[derive(Default)]
pub struct JobSet {
    token: CancellationToken,
    handles: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl JobSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, JoinHandle<()>)>> {
        match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Spawn `job` with a child of the shared token.
    pub fn spawn<F, Fut>(&self, name: &str, job: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(job(self.token.child_token()));
        tracing::debug!(job = name, "Background job started");
        self.lock().push((name.to_string(), handle));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cancel every job and wait for each to finish.
    ///
    /// All jobs are joined even if one fails; the first failure is returned.
    pub async fn cancel_all(&self) -> Result<(), ShutdownError> {
        self.token.cancel();
        let handles = std::mem::take(&mut *self.lock());

        let mut first_error = None;
        for (name, handle) in handles {
            match handle.await {
                Ok(()) => tracing::debug!(job = %name, "Background job stopped"),
                Err(e) => {
                    tracing::error!(job = %name, error = %e, "Background job failed");
                    first_error.get_or_insert(ShutdownError::Job {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
