//! Binary encoder
//!
//! Turns an [`OutboundMessage`] into one contiguous envelope.
//!
//! ## Envelope
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (2)  │  Id (2)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! `Len` counts the bytes after itself and is patched in last.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{MyceliumError, Result};
use crate::schema::{Layout, MessageSchema, Node, NodeId, SchemaRegistry};
use crate::value::Value;

use super::message::{OutboundMessage, LENGTH_PREFIX_SIZE};
use super::writer::ChunkedWriter;

/// Default capacity of each output chunk
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Encodes messages against a schema registry
#[derive(Clone)]
pub struct Encoder {
    registry: Arc<SchemaRegistry>,
    chunk_size: usize,
}

impl Encoder {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_chunk_size(registry, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(registry: Arc<SchemaRegistry>, chunk_size: usize) -> Self {
        Self {
            registry,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Resolve the schema a message will be encoded with
    ///
    /// Only the message's addressing is checked; the payload is trusted
    /// until the encoder walks it.
    pub fn validate(&self, message: &OutboundMessage) -> Result<&MessageSchema> {
        match (&message.event, message.id) {
            (Some(event), id) => {
                let schema = self
                    .registry
                    .descriptor_for(event.as_str())
                    .ok_or_else(|| MyceliumError::UnknownEvent(event.clone()))?;
                match id {
                    Some(given) if given != schema.id() => Err(MyceliumError::EventIdMismatch {
                        event: event.clone(),
                        expected: schema.id(),
                        given,
                    }),
                    _ => Ok(schema),
                }
            }
            (None, Some(id)) => self
                .registry
                .descriptor_for(id)
                .ok_or_else(|| MyceliumError::UnknownEvent(format!("message id {}", id))),
            (None, None) => Err(MyceliumError::UnknownEvent(
                "message names neither an event nor an id".to_string(),
            )),
        }
    }

    /// Encode a message into a complete envelope
    pub fn encode(&self, message: &OutboundMessage) -> Result<Bytes> {
        let schema = self.validate(message)?;
        let layout = schema.layout();

        let mut out = ChunkedWriter::new(self.chunk_size);
        // Length placeholder, patched below
        out.put_u16(0);
        out.put_u16(schema.id());
        encode_value(layout, layout.root(), &message.payload, &mut out)?;

        let mut buf = out.finish();
        let total = buf.len();
        let length = u16::try_from(total - LENGTH_PREFIX_SIZE)
            .map_err(|_| MyceliumError::PayloadTooLarge(total))?;
        buf[..LENGTH_PREFIX_SIZE].copy_from_slice(&length.to_be_bytes());

        tracing::trace!("Encoded {} event ({} bytes)", schema.event(), total);
        Ok(buf.freeze())
    }
}

/// Encode `value` as the node `id` of `layout`
pub fn encode_value(layout: &Layout, id: NodeId, value: &Value, out: &mut ChunkedWriter) -> Result<()> {
    write_node(layout, id, value, out, &Path::Root)
}

// =============================================================================
// Value paths (for mismatch reports)
// =============================================================================

enum Path<'a> {
    Root,
    Field(&'a Path<'a>, &'a str),
    Index(&'a Path<'a>, usize),
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Root => write!(f, "$"),
            Path::Field(parent, name) => write!(f, "{}.{}", parent, name),
            Path::Index(parent, index) => write!(f, "{}[{}]", parent, index),
        }
    }
}

fn mismatch(path: &Path<'_>, expected: &str, found: impl Into<String>) -> MyceliumError {
    MyceliumError::mismatch(&path.to_string(), expected, found)
}

fn node_name(node: &Node) -> &'static str {
    match node {
        Node::Skip => "nothing",
        Node::Int16 => "int16",
        Node::Int32 => "int32",
        Node::Float32 => "float32",
        Node::Bool => "bool",
        Node::String => "string",
        Node::Array(_) => "array",
        Node::Object(_) => "object",
        Node::Map(_) => "map",
    }
}

// =============================================================================
// Recursive writer
// =============================================================================

fn write_node(
    layout: &Layout,
    id: NodeId,
    value: &Value,
    out: &mut ChunkedWriter,
    path: &Path<'_>,
) -> Result<()> {
    let node = layout.node(id);

    match node {
        Node::Skip => {}
        Node::Int16 => {
            let v = integer(value, node, path)?;
            let v = i16::try_from(v).map_err(|_| mismatch(path, "int16", format!("{} (out of range)", v)))?;
            out.put_i16(v);
        }
        Node::Int32 => {
            let v = integer(value, node, path)?;
            let v = i32::try_from(v).map_err(|_| mismatch(path, "int32", format!("{} (out of range)", v)))?;
            out.put_i32(v);
        }
        Node::Float32 => match value {
            Value::Float(v) => out.put_f32(*v),
            Value::Int(v) => out.put_f32(*v as f32),
            other => return Err(mismatch(path, "float32", other.kind_name())),
        },
        Node::Bool => match value {
            Value::Bool(v) => out.put_bool(*v),
            other => return Err(mismatch(path, "bool", other.kind_name())),
        },
        Node::String => match value {
            Value::String(s) => write_string(s, out, path)?,
            other => return Err(mismatch(path, "string", other.kind_name())),
        },
        Node::Array(item) => {
            let items = match value {
                Value::Array(items) => items,
                other => return Err(mismatch(path, "array", other.kind_name())),
            };
            out.put_u16(count_prefix(items.len(), path)?);
            for (index, element) in items.iter().enumerate() {
                write_node(layout, *item, element, out, &Path::Index(path, index))?;
            }
        }
        Node::Object(fields) => match value {
            // Absent object: the presence byte stands for the whole subtree
            Value::Null => out.put_u8(0),
            Value::Object(map) => {
                out.put_u8(1);
                for field in fields {
                    let field_path = Path::Field(path, &field.name);
                    match map.get(&field.name) {
                        Some(v) if !v.is_null() => write_node(layout, field.node, v, out, &field_path)?,
                        _ => write_absent(layout, field.node, out, &field_path)?,
                    }
                }
            }
            other => return Err(mismatch(path, "object", other.kind_name())),
        },
        Node::Map(value_node) => {
            let entries = match value {
                Value::Object(entries) => entries,
                other => return Err(mismatch(path, "map", other.kind_name())),
            };
            out.put_u16(count_prefix(entries.len(), path)?);
            for (key, entry) in entries {
                let entry_path = Path::Field(path, key);
                write_string(key, out, &entry_path)?;
                write_node(layout, *value_node, entry, out, &entry_path)?;
            }
        }
    }

    Ok(())
}

/// A field missing from a present object
fn write_absent(layout: &Layout, id: NodeId, out: &mut ChunkedWriter, path: &Path<'_>) -> Result<()> {
    match layout.node(id) {
        Node::Object(_) => {
            out.put_u8(0);
            Ok(())
        }
        Node::Skip => Ok(()),
        node => Err(mismatch(path, node_name(node), "missing value")),
    }
}

fn integer(value: &Value, node: &Node, path: &Path<'_>) -> Result<i64> {
    match value {
        Value::Int(v) => Ok(*v),
        other => Err(mismatch(path, node_name(node), other.kind_name())),
    }
}

/// One byte per character, so anything up to U+00FF survives a decode
fn write_string(s: &str, out: &mut ChunkedWriter, path: &Path<'_>) -> Result<()> {
    let bytes: Cow<'_, [u8]> = if s.is_ascii() {
        Cow::Borrowed(s.as_bytes())
    } else {
        let bytes = s
            .chars()
            .map(u8::try_from)
            .collect::<std::result::Result<Vec<u8>, _>>()
            .map_err(|_| mismatch(path, "single-byte characters", "characters above U+00FF"))?;
        Cow::Owned(bytes)
    };
    if bytes.len() > usize::from(u16::MAX) {
        return Err(mismatch(path, "string of at most 65535 bytes", format!("{} bytes", bytes.len())));
    }
    out.put_str(&bytes);
    Ok(())
}

fn count_prefix(len: usize, path: &Path<'_>) -> Result<u16> {
    u16::try_from(len).map_err(|_| mismatch(path, "at most 65535 entries", format!("{} entries", len)))
}
