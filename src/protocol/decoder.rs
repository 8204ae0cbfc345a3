//! Binary decoder
//!
//! Turns one complete envelope into a [`DecodedMessage`]. Every read is
//! bounds-checked; running off the end of the buffer is reported as
//! `TruncatedPayload` rather than read out of bounds.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Buf;

use crate::error::{MyceliumError, Result};
use crate::schema::{Layout, Node, NodeId, SchemaRegistry};
use crate::value::Value;

use super::message::{DecodedMessage, HEADER_SIZE};

/// Deepest nesting accepted before the message is rejected
pub const MAX_DEPTH: usize = 256;

/// Most values a single payload may decode into
///
/// Unknown-kind elements consume no bytes, so an array count alone does
/// not bound the work a frame can demand.
pub const MAX_VALUES: usize = 1 << 20;

/// Decodes envelopes against a schema registry
#[derive(Clone)]
pub struct Decoder {
    registry: Arc<SchemaRegistry>,
}

impl Decoder {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Decode one complete envelope
    ///
    /// The length prefix is only used for framing and is not checked here.
    /// Bytes left over after the payload are ignored.
    pub fn decode_message(&self, raw: &[u8]) -> Result<DecodedMessage> {
        if raw.len() < HEADER_SIZE {
            return Err(MyceliumError::MalformedMessage(format!(
                "{} bytes is shorter than the {}-byte header",
                raw.len(),
                HEADER_SIZE
            )));
        }

        let mut buf = raw;
        let _length = buf.get_u16();
        let id = buf.get_u16();

        let schema = self
            .registry
            .descriptor_for(id)
            .ok_or(MyceliumError::UnknownMessageId(id))?;

        tracing::debug!("Received {} event", schema.event());

        let layout = schema.layout();
        let (payload, rest) = decode_value(layout, layout.root(), buf)?;
        if !rest.is_empty() {
            tracing::trace!(
                "Ignoring {} trailing bytes after {} payload",
                rest.len(),
                schema.event()
            );
        }

        Ok(DecodedMessage {
            id,
            event: schema.event().to_string(),
            payload,
        })
    }
}

/// Decode the node `id` of `layout` from the front of `bytes`
///
/// Returns the value and the unconsumed remainder.
pub fn decode_value<'b>(layout: &Layout, id: NodeId, bytes: &'b [u8]) -> Result<(Value, &'b [u8])> {
    let mut cursor = bytes;
    let mut budget = MAX_VALUES;
    let value = read_node(layout, id, &mut cursor, 0, &mut budget)?;
    Ok((value, cursor))
}

fn ensure(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(MyceliumError::TruncatedPayload {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

fn read_node(
    layout: &Layout,
    id: NodeId,
    buf: &mut &[u8],
    depth: usize,
    budget: &mut usize,
) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(MyceliumError::MalformedMessage(format!(
            "payload nested deeper than {} levels",
            MAX_DEPTH
        )));
    }
    if *budget == 0 {
        return Err(MyceliumError::MalformedMessage(format!(
            "payload decodes to more than {} values",
            MAX_VALUES
        )));
    }
    *budget -= 1;

    let value = match layout.node(id) {
        // Unknown kind: absent, nothing consumed
        Node::Skip => Value::Null,
        Node::Int16 => {
            ensure(buf, 2)?;
            Value::Int(buf.get_i16().into())
        }
        Node::Int32 => {
            ensure(buf, 4)?;
            Value::Int(buf.get_i32().into())
        }
        Node::Float32 => {
            ensure(buf, 4)?;
            Value::Float(buf.get_f32())
        }
        Node::Bool => {
            ensure(buf, 1)?;
            Value::Bool(buf.get_u8() != 0)
        }
        Node::String => Value::String(read_string(buf)?),
        Node::Array(item) => {
            ensure(buf, 2)?;
            let count = usize::from(buf.get_u16());
            let mut items = Vec::with_capacity(count.min(buf.len()));
            for _ in 0..count {
                items.push(read_node(layout, *item, buf, depth + 1, budget)?);
            }
            Value::Array(items)
        }
        Node::Object(fields) => {
            ensure(buf, 1)?;
            // A zero presence flag covers the whole subtree
            if buf.get_u8() == 0 {
                return Ok(Value::Null);
            }
            let mut object = BTreeMap::new();
            for field in fields {
                let value = read_node(layout, field.node, buf, depth + 1, budget)?;
                object.insert(field.name.clone(), value);
            }
            Value::Object(object)
        }
        Node::Map(value_node) => {
            ensure(buf, 2)?;
            let count = buf.get_u16();
            let mut entries = BTreeMap::new();
            for _ in 0..count {
                let key = read_string(buf)?;
                let value = read_node(layout, *value_node, buf, depth + 1, budget)?;
                // Duplicate keys: the later entry wins
                entries.insert(key, value);
            }
            Value::Object(entries)
        }
    };

    Ok(value)
}

/// Length-prefixed string of single-byte characters
fn read_string(buf: &mut &[u8]) -> Result<String> {
    ensure(buf, 2)?;
    let len = usize::from(buf.get_u16());
    ensure(buf, len)?;
    let text = buf[..len].iter().copied().map(char::from).collect();
    buf.advance(len);
    Ok(text)
}
