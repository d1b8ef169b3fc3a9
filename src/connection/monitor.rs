//! Periodic liveness pings.
//!
//! # Responsibilities
//! - Ping the backend on a fixed interval while connected
//! - Try to restore a link that a failed check took down
//! - Log state transitions, not every tick

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::connection::manager::ConnectionManager;
use crate::connection::state::ConnectionState;

pub struct ConnectionMonitor {
    connection: Arc<ConnectionManager>,
    interval: Duration,
}

impl ConnectionMonitor {
    pub fn new(connection: Arc<ConnectionManager>, interval: Duration) -> Self {
        Self {
            connection,
            interval,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Connection monitor starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the immediate first tick; connect() just pinged.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Connection monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&self) {
        match self.connection.status().state {
            ConnectionState::Connected => {
                let result = self.connection.check_connection().await;
                if !result.is_healthy() {
                    tracing::warn!(
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "Stream backend connection lost"
                    );
                }
            }
            ConnectionState::Disconnected => {
                self.connection.reconnect_once().await;
            }
            // Connecting is owned by connect(); Failed is terminal.
            ConnectionState::Connecting | ConnectionState::Failed => {}
        }
    }
}
