//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the health and trigger handlers
//! - Wire up middleware (timeout, correlation id, tracing, metrics)
//! - Serve until the shutdown token fires, then drain

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::health::HealthAggregator;
use crate::http::request::{propagate_correlation_id_layer, request_span, set_correlation_id_layer};
use crate::http::{health, test_event};
use crate::observability::metrics::track_metrics;
use crate::security::TestEventLimiter;
use crate::stream::StreamBackend;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub health: Arc<HealthAggregator>,
    pub limiter: Arc<TestEventLimiter>,
    pub backend: Arc<dyn StreamBackend>,
    /// Stream test events are published to.
    pub stream: String,
}

pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState, request_timeout: Duration) -> Self {
        Self {
            router: Self::build_router(state, request_timeout),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/health/live", get(health::live))
            .route("/health/ready", get(health::ready))
            .route("/health", get(health::detailed))
            .route("/health-check", get(health::legacy))
            .route("/trigger-test-event", post(test_event::trigger))
            .with_state(state)
            .layer(middleware::from_fn(track_metrics))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_correlation_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(set_correlation_id_layer())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` is cancelled, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
