//! Redis Streams backend.
//!
//! # Responsibilities
//! - Open multiplexed connections with connection/response timeouts
//! - Map stream operations onto XADD / XGROUP / XREADGROUP / XACK
//! - Encode outbound events as flat field lists
//!
//! # Design Decisions
//! - Connections are opened lazily by `ping` and dropped on ping failure,
//!   so the next probe reconnects from scratch
//! - Blocking reads get a dedicated connection
//! - Credentials live only in the connection URL and are never logged

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, AsyncConnectionConfig, Client};
use tokio::sync::Mutex;

use crate::config::RedisSettings;
use crate::status::now_iso8601;
use crate::stream::types::{fields, OutboundEvent, StreamEntry, StreamError};
use crate::stream::StreamBackend;

/// Longest blocking read the reader connection is configured for.
const MAX_READ_BLOCK: Duration = Duration::from_secs(30);

/// Stream backend talking to a Redis server.
pub struct RedisStreamBackend {
    client: Client,
    connection_timeout: Duration,
    service_name: String,
    command: Mutex<Option<MultiplexedConnection>>,
    reader: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStreamBackend {
    /// Build the backend. No connection is made until the first `ping`.
    pub fn new(settings: &RedisSettings, service_name: &str) -> Result<Self, StreamError> {
        if settings.connection_timeout.is_zero() {
            return Err(StreamError::InvalidConfiguration(
                "connection timeout cannot be zero".to_string(),
            ));
        }
        let client = Client::open(settings.url.as_str())
            .map_err(|e| StreamError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            client,
            connection_timeout: settings.connection_timeout,
            service_name: service_name.to_string(),
            command: Mutex::new(None),
            reader: Mutex::new(None),
        })
    }

    async fn open(&self, response_timeout: Duration) -> Result<MultiplexedConnection, StreamError> {
        let config = AsyncConnectionConfig::new()
            .set_connection_timeout(self.connection_timeout)
            .set_response_timeout(response_timeout);
        let connection = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await?;
        Ok(connection)
    }

    async fn command_connection(&self) -> Result<MultiplexedConnection, StreamError> {
        let mut slot = self.command.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.open(self.connection_timeout).await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn reader_connection(&self) -> Result<MultiplexedConnection, StreamError> {
        let mut slot = self.reader.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.open(self.connection_timeout + MAX_READ_BLOCK).await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    fn encode(&self, event: &OutboundEvent) -> Result<Vec<(&'static str, String)>, StreamError> {
        Ok(vec![
            (fields::EVENT, event.event.clone()),
            (fields::AGGREGATE_ID, event.aggregate_id.clone()),
            (fields::DATA, serde_json::to_string(&event.data)?),
            (fields::HEADERS, serde_json::to_string(&event.headers)?),
            (fields::TIMESTAMP, now_iso8601()),
            (fields::SERVICE_NAME, self.service_name.clone()),
        ])
    }
}

fn first_entry(reply: StreamReadReply) -> Option<StreamEntry> {
    let key = reply.keys.into_iter().next()?;
    let raw = key.ids.into_iter().next()?;

    let mut entry = StreamEntry::new(raw.id);
    for (field, value) in raw.map {
        match redis::from_redis_value::<String>(&value) {
            Ok(text) => {
                entry.fields.insert(field, text);
            }
            Err(e) => {
                tracing::debug!(field = %field, error = %e, "Skipping non-text stream field");
            }
        }
    }
    Some(entry)
}

#[async_trait]
impl StreamBackend for RedisStreamBackend {
    async fn ping(&self) -> Result<(), StreamError> {
        let mut conn = self.command_connection().await?;
        let result = redis::cmd("PING").query_async::<String>(&mut conn).await;
        if let Err(e) = result {
            // Drop the cached connection so the next probe reconnects.
            self.command.lock().await.take();
            return Err(e.into());
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), StreamError> {
        let command = self.command.lock().await.take();
        let reader = self.reader.lock().await.take();
        if command.is_none() && reader.is_none() {
            return Err(StreamError::NotConnected);
        }
        Ok(())
    }

    async fn publish(&self, stream: &str, event: &OutboundEvent) -> Result<String, StreamError> {
        let items = self.encode(event)?;
        let mut conn = self.command_connection().await?;
        let id: String = conn.xadd(stream, "*", items.as_slice()).await?;
        Ok(id)
    }

    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), StreamError> {
        let mut conn = self.command_connection().await?;
        let created: redis::RedisResult<()> = conn.xgroup_create_mkstream(stream, group, "$").await;
        match created {
            Ok(()) => {
                tracing::info!(stream = %stream, group = %group, "Consumer group created");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        block: Duration,
    ) -> Result<Option<StreamEntry>, StreamError> {
        let block = block.min(MAX_READ_BLOCK);
        let options = StreamReadOptions::default()
            .group(group, consumer)
            .count(1)
            .block(block.as_millis() as usize);

        let mut conn = self.reader_connection().await?;
        let reply: Result<Option<StreamReadReply>, redis::RedisError> =
            conn.xread_options(&[stream], &[">"], &options).await;
        match reply {
            Ok(reply) => Ok(reply.and_then(first_entry)),
            Err(e) => {
                self.reader.lock().await.take();
                Err(e.into())
            }
        }
    }

    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), StreamError> {
        let mut conn = self.command_connection().await?;
        let _acked: i64 = conn.xack(stream, group, &[id]).await?;
        Ok(())
    }
}
