//! Inbound message validation.
//!
//! # Responsibilities
//! - Reject malformed messages before any field is trusted
//! - Normalize optional fields (`data`, `headers`) to empty objects
//!
//! # Design Decisions
//! - Returns a tagged error (field + reason); never panics
//! - Sizes are measured in bytes of compact JSON

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::ingest::message::{AckHandle, RawMessage, StreamMessage};

pub const MAX_STREAM_ID_LEN: usize = 255;
pub const MAX_EVENT_LEN: usize = 100;
pub const MAX_AGGREGATE_ID_LEN: usize = 255;
pub const MAX_DATA_BYTES: usize = 10_000;

/// The part of a message that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Message,
    Ack,
    StreamId,
    Event,
    AggregateId,
    Data,
    Headers,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Message => "message",
            Field::Ack => "ack",
            Field::StreamId => "streamId",
            Field::Event => "event",
            Field::AggregateId => "aggregateId",
            Field::Data => "data",
            Field::Headers => "headers",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    NotAnObject,
    MissingAck,
    Empty,
    NotAString,
    TooLong { max: usize },
    InvalidCharacters,
    TooLarge { max_bytes: usize },
    NonStringHeader { key: String },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::NotAnObject => f.write_str("must be an object"),
            Reason::MissingAck => f.write_str("missing ack capability"),
            Reason::Empty => f.write_str("must be a non-empty string"),
            Reason::NotAString => f.write_str("must be a string"),
            Reason::TooLong { max } => write!(f, "too long (max {max} characters)"),
            Reason::InvalidCharacters => f.write_str("contains invalid characters"),
            Reason::TooLarge { max_bytes } => write!(f, "too large (max {max_bytes} bytes)"),
            Reason::NonStringHeader { key } => {
                write!(f, "value for key '{key}' must be a string")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: Field,
    pub reason: Reason,
}

impl ValidationError {
    pub fn new(field: Field, reason: Reason) -> Self {
        Self { field, reason }
    }
}

fn identifier(
    field: Field,
    value: Option<&Value>,
    max: usize,
    allowed: fn(char) -> bool,
) -> Result<String, ValidationError> {
    let text = match value {
        None | Some(Value::Null) => return Err(ValidationError::new(field, Reason::Empty)),
        Some(Value::String(s)) => s,
        Some(_) => return Err(ValidationError::new(field, Reason::NotAString)),
    };
    if text.is_empty() {
        return Err(ValidationError::new(field, Reason::Empty));
    }
    if text.chars().count() > max {
        return Err(ValidationError::new(field, Reason::TooLong { max }));
    }
    if !text.chars().all(allowed) {
        return Err(ValidationError::new(field, Reason::InvalidCharacters));
    }
    Ok(text.clone())
}

fn stream_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-')
}

fn data(value: Option<&Value>) -> Result<Map<String, Value>, ValidationError> {
    let map = match value {
        None | Some(Value::Null) => return Ok(Map::new()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ValidationError::new(Field::Data, Reason::NotAnObject)),
    };
    let size = serde_json::to_vec(map).map(|b| b.len()).unwrap_or(usize::MAX);
    if size > MAX_DATA_BYTES {
        return Err(ValidationError::new(
            Field::Data,
            Reason::TooLarge {
                max_bytes: MAX_DATA_BYTES,
            },
        ));
    }
    Ok(map.clone())
}

fn headers(value: Option<&Value>) -> Result<HashMap<String, String>, ValidationError> {
    let map = match value {
        None | Some(Value::Null) => return Ok(HashMap::new()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ValidationError::new(Field::Headers, Reason::NotAnObject)),
    };
    let mut headers = HashMap::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::String(s) => {
                headers.insert(key.clone(), s.clone());
            }
            _ => {
                return Err(ValidationError::new(
                    Field::Headers,
                    Reason::NonStringHeader { key: key.clone() },
                ))
            }
        }
    }
    Ok(headers)
}

/// Check structure and fields; on success return the canonical message and
/// its ack handle.
pub fn validate_message(raw: RawMessage) -> Result<(StreamMessage, AckHandle), ValidationError> {
    let RawMessage { body, ack } = raw;
    let Value::Object(body) = body else {
        return Err(ValidationError::new(Field::Message, Reason::NotAnObject));
    };
    let Some(ack) = ack else {
        return Err(ValidationError::new(Field::Ack, Reason::MissingAck));
    };

    let message = StreamMessage {
        stream_id: identifier(
            Field::StreamId,
            body.get("streamId"),
            MAX_STREAM_ID_LEN,
            stream_id_char,
        )?,
        event: identifier(Field::Event, body.get("event"), MAX_EVENT_LEN, name_char)?,
        aggregate_id: identifier(
            Field::AggregateId,
            body.get("aggregateId"),
            MAX_AGGREGATE_ID_LEN,
            name_char,
        )?,
        data: data(body.get("data"))?,
        headers: headers(body.get("headers"))?,
    };
    Ok((message, ack))
}
