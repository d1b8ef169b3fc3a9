//! Startup orchestration.
//!
//! # Responsibilities
//! - Print the service banner
//! - Initialize subsystems in dependency order
//! - Start background jobs and the HTTP listener
//! - Block until a termination signal, then hand over to shutdown
//!
//! # Design Decisions
//! - Fail fast: an unusable backend or exhausted connect budget is fatal
//! - Listeners start last (traffic only once connected)
//! - A signal during the connect phase still shuts down cleanly

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::schema::ServiceSettings;
use crate::config::Validated;
use crate::connection::{ConnectionManager, ConnectionMonitor};
use crate::health::{ConnectionCheck, HealthAggregator, StreamActivityCheck};
use crate::http::{AppState, HttpServer};
use crate::ingest::{EventPipeline, LoggingHandler, StreamConsumer};
use crate::lifecycle::jobs::JobSet;
use crate::lifecycle::shutdown::ShutdownOrchestrator;
use crate::lifecycle::signals::SignalListener;
use crate::observability::metrics;
use crate::security::TestEventLimiter;
use crate::status::{now_iso8601, ProcessStatus};
use crate::stream::publisher::ScheduledPublisher;
use crate::stream::{RedisStreamBackend, StreamBackend};

const BANNER_WIDTH: usize = 51;

/// Render the startup banner.
pub fn banner(service: &ServiceSettings, started: &str) -> String {
    let rule = "═".repeat(BANNER_WIDTH + 11);
    let line = |label: &str, value: &str| format!("║  {label:<8} {value:<width$}║", width = BANNER_WIDTH);
    [
        format!("╔{rule}╗"),
        format!("║{:^width$}║", "SERVICE STARTUP", width = BANNER_WIDTH + 11),
        format!("╠{rule}╣"),
        line("Service:", &service.name),
        line("Version:", &service.version),
        line("Env:", &service.environment),
        line("Started:", started),
        format!("╚{rule}╝"),
    ]
    .join("\n")
}

/// Run the service against Redis until shutdown. Returns the process exit code.
pub async fn run(validated: Validated) -> i32 {
    let backend: Arc<dyn StreamBackend> = match RedisStreamBackend::new(
        &validated.settings.redis,
        &validated.settings.service.name,
    ) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create stream backend");
            return 1;
        }
    };
    run_with_backend(validated, backend).await
}

/// Run the service against `backend` until shutdown. Returns the process exit code.
pub async fn run_with_backend(validated: Validated, backend: Arc<dyn StreamBackend>) -> i32 {
    let Validated { settings, warnings } = validated;
    let started = now_iso8601();

    println!("{}", banner(&settings.service, &started));
    tracing::info!(
        service = %settings.service.name,
        version = %settings.service.version,
        environment = %settings.service.environment,
        timestamp = %started,
        "Service banner displayed"
    );
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        service = %settings.service.name,
        environment = %settings.service.environment,
        redis = %settings.redis.masked_url(),
        stream = %settings.stream.name,
        consumer = %settings.stream.consumer,
        "Configuration loaded and validated"
    );

    if settings.metrics.enabled {
        if let Err(e) = metrics::init_metrics(settings.metrics.address) {
            tracing::error!(error = %e, address = %settings.metrics.address, "Failed to start metrics exporter");
        }
    }

    let status = Arc::new(ProcessStatus::new());

    let connection = Arc::new(ConnectionManager::new(
        backend.clone(),
        settings.connection.policy.clone(),
    ));
    let jobs = Arc::new(JobSet::new());
    let orchestrator = ShutdownOrchestrator::new(status.clone(), connection.clone(), jobs.clone())
        .with_deadline(settings.lifecycle.shutdown_timeout);

    let mut signals = match SignalListener::install() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return 1;
        }
    };

    let early_signal = tokio::select! {
        result = connection.connect() => match result {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(error = %e, "Exiting: stream backend unreachable");
                return 1;
            }
        },
        trigger = signals.recv() => Some(trigger),
    };
    if let Some(trigger) = early_signal {
        return orchestrator.shutdown_with(trigger, Some(signals)).await.exit_code();
    }

    let pipeline = Arc::new(EventPipeline::new(Arc::new(LoggingHandler), status.clone()));
    let consumer = StreamConsumer::new(
        backend.clone(),
        pipeline,
        status.clone(),
        settings.stream.name.clone(),
        settings.stream.group.clone(),
        settings.stream.consumer.clone(),
    );
    jobs.spawn("consumer", move |cancel| consumer.run(cancel));

    if let Some(interval) = settings.connection.ping_interval {
        let monitor = ConnectionMonitor::new(connection.clone(), interval);
        jobs.spawn("connection-monitor", move |cancel| monitor.run(cancel));
    }
    if let Some(interval) = settings.lifecycle.test_event_interval {
        let publisher = ScheduledPublisher::new(backend.clone(), settings.stream.name.clone(), interval);
        jobs.spawn("test-event-publisher", move |cancel| publisher.run(cancel));
    }

    let health = HealthAggregator::new(settings.service.name.clone(), settings.service.version.clone())
        .with_check_timeout(settings.health.check_timeout)
        .register(Arc::new(ConnectionCheck::new(connection.clone())))
        .register(Arc::new(StreamActivityCheck::new(status.clone())));
    let state = AppState {
        health: Arc::new(health),
        limiter: Arc::new(TestEventLimiter::new(status.clone())),
        backend: backend.clone(),
        stream: settings.stream.name.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.service.port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to bind HTTP listener");
            orchestrator.shutdown_with("startup failure", Some(signals)).await;
            return 1;
        }
    };
    let server = HttpServer::new(state, settings.http.request_timeout);
    orchestrator.attach_http(tokio::spawn(server.run(listener, orchestrator.http_token())));

    tracing::info!(
        service = %settings.service.name,
        port = settings.service.port,
        "{} is running on http://localhost:{}",
        settings.service.name,
        settings.service.port
    );

    orchestrator.run_until_signal(signals).await.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::config::load_from_map;
    use crate::stream::MockStreamBackend;

    fn validated(pairs: &[(&str, &str)]) -> Validated {
        let mut vars: HashMap<String, String> = [
            ("REDIS_HOST", "localhost"),
            ("REDIS_PORT", "6379"),
            ("SERVICE_NAME", "orders"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        vars.extend(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        load_from_map(&vars).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_connect_exits_non_zero() {
        let backend = MockStreamBackend::new().with_failing_pings();
        let config = validated(&[("MAX_RETRY_ATTEMPTS", "3"), ("RETRY_DELAYS", "100,200")]);

        let code = run_with_backend(config, Arc::new(backend.clone())).await;

        assert_eq!(code, 1);
        assert_eq!(backend.ping_count(), 3);
        assert!(backend.groups().is_empty());
        assert_eq!(backend.close_calls(), 0);
    }

    #[test]
    fn test_banner_lines_align() {
        let service = ServiceSettings {
            name: "orders".into(),
            version: "1.2.3".into(),
            environment: "production".into(),
            port: 8000,
        };
        let text = banner(&service, "2024-05-01T12:00:00.000Z");
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();

        assert!(widths.windows(2).all(|w| w[0] == w[1]));
        assert!(text.contains("orders"));
        assert!(text.contains("production"));
    }
}
