//! Stream Sentinel Library
//!
//! Resilience layer for a service that consumes a durable event stream:
//! connection lifecycle, health reporting, graceful shutdown and
//! fault-isolated event ingestion.

pub mod config;
pub mod connection;
pub mod health;
pub mod http;
pub mod ingest;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod status;
pub mod stream;

pub use config::Settings;
pub use http::HttpServer;
pub use lifecycle::ShutdownOrchestrator;
pub use status::ProcessStatus;
