//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (correlation id, request span)
//!     → health.rs (/health/live, /health/ready, /health, /health-check)
//!     → test_event.rs (/trigger-test-event)
//!     → response.rs (JSON bodies)
//! ```

pub mod health;
pub mod request;
pub mod response;
pub mod server;
pub mod test_event;

pub use request::X_CORRELATION_ID;
pub use server::{AppState, HttpServer};
