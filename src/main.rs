//! Stream Sentinel (v1)
//!
//! Event stream consumer with a resilience layer, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                   STREAM SENTINEL                    │
//!                       │                                                      │
//!   Event stream        │  ┌──────────┐    ┌──────────┐    ┌──────────────┐   │
//!   ────────────────────┼─▶│ consumer │───▶│ pipeline │───▶│   handler    │   │
//!   (consumer group)    │  │   loop   │    │ validate │    │  (isolated)  │   │
//!                       │  └──────────┘    └────┬─────┘    └──────────────┘   │
//!   ◀───────────────────┼──────── ack ──────────┘                             │
//!                       │                                                      │
//!   Probes / operators  │  ┌──────────┐    ┌──────────┐    ┌──────────────┐   │
//!   ────────────────────┼─▶│   http   │───▶│  health  │───▶│  connection  │   │
//!                       │  │  server  │    │aggregator│    │   manager    │   │
//!                       │  └──────────┘    └──────────┘    └──────────────┘   │
//!                       │                                                      │
//!                       │  ┌────────────────────────────────────────────────┐ │
//!                       │  │             Cross-Cutting Concerns             │ │
//!                       │  │  config · observability · resilience · status  │ │
//!                       │  │  lifecycle (startup / signals / shutdown)      │ │
//!                       │  └────────────────────────────────────────────────┘ │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use stream_sentinel::config;
use stream_sentinel::lifecycle::startup;
use stream_sentinel::observability::{init_logging, LoggingSettings};

#[tokio::main]
async fn main() {
    let validated = match config::load_from_env() {
        Ok(validated) => validated,
        Err(e) => {
            let (logging, _) = LoggingSettings::from_env();
            init_logging(&logging);
            tracing::error!(error = %e, "Configuration invalid, refusing to start");
            std::process::exit(1);
        }
    };

    init_logging(&validated.settings.logging);
    let code = startup::run(validated).await;

    tracing::info!(exit_code = code, "Process exiting");
    std::process::exit(code);
}
