//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM listeners
//! - Report which signal arrived
//! - Log repeats during shutdown, then drop the listeners
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Non-unix targets listen for Ctrl+C only

use std::io;

use tokio_util::sync::CancellationToken;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Registered termination-signal listeners.
pub struct SignalListener {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl SignalListener {
    /// Register listeners for SIGINT and SIGTERM.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        let interrupt = signal(SignalKind::interrupt())?;
        let terminate = signal(SignalKind::terminate())?;
        tracing::debug!("Signal listeners registered for SIGINT, SIGTERM");
        Ok(Self {
            interrupt,
            terminate,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next termination signal and return its name.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }

    /// Log every further signal as a repeat until `until` fires, then drop
    /// the listeners. Returns how many repeats arrived.
    ///
    /// Dropping does not restore the default dispositions; signals after that
    /// point are ignored without a log line.
    pub async fn absorb_repeats(mut self, until: CancellationToken) -> u32 {
        let mut count = 0;
        loop {
            tokio::select! {
                biased;
                _ = until.cancelled() => break,
                signal = self.recv() => {
                    count += 1;
                    tracing::warn!(signal, "Shutdown already in progress, ignoring {}", signal);
                }
            }
        }
        count
    }
}
