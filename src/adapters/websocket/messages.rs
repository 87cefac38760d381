//! Wire codec for the event-sync protocol.
//!
//! Every frame is a JSON object `{ "type": <string>, "data": <payload> }`:
//! - Server → Client: the five domain event types, plus an optional `PONG`
//! - Client → Server: `PING` keepalive probes and outbound domain events
//!
//! Decoding never panics. Anything that is not exactly one recognized
//! message comes back as a [`DecodeError`] for the caller to log and drop.

use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::{BatchUpdate, DomainEvent, EventKind};

/// Wire `type` of the outbound keepalive probe.
pub const PING_TYPE: &str = "PING";

/// Wire `type` of the optional server reply to a probe.
pub const PONG_TYPE: &str = "PONG";

/// A successfully decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A domain event to publish to subscribers.
    Event(DomainEvent),
    /// Reply to a keepalive probe. Carries no information.
    Pong,
}

/// Why an inbound frame was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("message is not valid JSON: {0}")]
    NotJson(String),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message has no string `type` field")]
    MissingType,

    #[error("unrecognized message type `{0}`")]
    UnknownType(String),

    #[error("invalid `data` for {kind}: {reason}")]
    InvalidPayload { kind: EventKind, reason: String },
}

/// Serializes an outbound domain event. Never fails.
pub fn encode(event: &DomainEvent) -> Vec<u8> {
    json!({
        "type": event.kind().wire_name(),
        "data": event.payload(),
    })
    .to_string()
    .into_bytes()
}

/// Serializes the keepalive probe.
pub fn encode_ping() -> Vec<u8> {
    json!({ "type": PING_TYPE }).to_string().into_bytes()
}

/// Parses one inbound frame.
pub fn decode(bytes: &[u8]) -> Result<Inbound, DecodeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::NotJson(e.to_string()))?;
    let Value::Object(mut message) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let message_type = message
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;

    if message_type == PONG_TYPE {
        return Ok(Inbound::Pong);
    }

    let kind = EventKind::from_wire_name(message_type)
        .ok_or_else(|| DecodeError::UnknownType(message_type.to_string()))?;
    let data = message.remove("data").unwrap_or(Value::Null);

    decode_payload(kind, data).map(Inbound::Event)
}

fn decode_payload(kind: EventKind, data: Value) -> Result<DomainEvent, DecodeError> {
    let invalid = |reason: String| DecodeError::InvalidPayload { kind, reason };

    match kind {
        EventKind::EntityAdded => expect_entity(data)
            .map(DomainEvent::EntityAdded)
            .map_err(invalid),
        EventKind::EntityUpdated => expect_entity(data)
            .map(DomainEvent::EntityUpdated)
            .map_err(invalid),
        EventKind::EntityDeleted => serde_json::from_value(data)
            .map(DomainEvent::EntityDeleted)
            .map_err(|e| invalid(e.to_string())),
        EventKind::BatchUpdated => serde_json::from_value::<BatchUpdate>(data)
            .map(DomainEvent::BatchUpdated)
            .map_err(|e| invalid(e.to_string())),
        EventKind::SnapshotReplaced => match data {
            Value::Array(entities) => Ok(DomainEvent::SnapshotReplaced(entities)),
            other => Err(invalid(format!("expected an array, got {}", type_name(&other)))),
        },
    }
}

fn expect_entity(data: Value) -> Result<Value, String> {
    match data {
        Value::Object(_) => Ok(data),
        other => Err(format!("expected an object, got {}", type_name(&other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
