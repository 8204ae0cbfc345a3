//! Message definitions
//!
//! Inbound and outbound message forms around the envelope.

use serde::Serialize;

use crate::value::Value;

/// Size of the length prefix
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Envelope header: length prefix (2) + message id (2)
pub const HEADER_SIZE: usize = 4;

/// A message decoded from the server's stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    /// Numeric message id from the envelope
    pub id: u16,

    /// Event name registered for `id`
    pub event: String,

    /// Decoded body
    pub payload: Value,
}

/// A message to encode
///
/// At least one of `event` and `id` must be set; the other is derived
/// from the schema registry.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub event: Option<String>,
    pub id: Option<u16>,
    pub payload: Value,
}

impl OutboundMessage {
    /// Message addressed by event name
    pub fn event(event: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            event: Some(event.into()),
            id: None,
            payload: payload.into(),
        }
    }

    /// Message addressed by numeric id
    pub fn id(id: u16, payload: impl Into<Value>) -> Self {
        Self {
            event: None,
            id: Some(id),
            payload: payload.into(),
        }
    }

    /// Also pin the id; it must match the registry's id for the event
    pub fn with_id(mut self, id: u16) -> Self {
        self.id = Some(id);
        self
    }
}
