//! Stream backend connection lifecycle.
//!
//! # Data Flow
//! ```text
//! startup  → manager.rs connect()  (bounded retry, backoff schedule)
//! /health  → manager.rs check_connection()
//! monitor.rs (periodic job) → check_connection() / reconnect_once()
//! shutdown → manager.rs disconnect()
//! ```
//!
//! # Design Decisions
//! - Connect attempts are strictly sequential
//! - Exhausting the retry budget is fatal; the process exits non-zero
//! - Health checks never retry; they report what they see

pub mod manager;
pub mod monitor;
pub mod state;

pub use manager::ConnectionManager;
pub use monitor::ConnectionMonitor;
pub use state::{ConnectionError, ConnectionState, ConnectionStatus};
