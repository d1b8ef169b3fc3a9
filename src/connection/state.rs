//! Connection state machine types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::stream::StreamError;

/// Link state. Transitions happen only inside the connection manager.
///
/// ```text
/// Disconnected → Connecting → Connected
///                    │            │ (failed check)
///                    ▼            ▼
///                 Failed     Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Retry budget exhausted. Terminal for the process.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the connection, see `ConnectionManager::status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub connected: bool,
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Time since the link came up; zero unless connected.
    pub uptime: Duration,
}

#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// One failed attempt; the manager retries while budget remains.
    #[error("connection attempt {attempt}/{max_attempts} failed: {source}")]
    Attempt {
        attempt: u32,
        max_attempts: u32,
        #[source]
        source: StreamError,
    },

    /// Every attempt failed.
    #[error("all {attempts} connection attempts failed, last error: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl ConnectionError {
    /// Exhaustion ends the process; a single failed attempt does not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConnectionError::Exhausted { .. })
    }
}
