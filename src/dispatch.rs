//! Message dispatcher
//!
//! Routes a connection's inbound chunks through the frame assembler and the
//! decoder, then hands each decoded message to the callbacks subscribed to
//! its id.
//!
//! ```text
//! chunk ──► FrameAssembler ──► frame ──► Decoder ──► handlers[id]
//!                                            │            + catch-all
//!                                            └──► Err (per message)
//! ```
//!
//! Every outcome is also returned to the caller, in arrival order, so a
//! transport can forward messages and per-message failures as events.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{MyceliumError, Result};
use crate::protocol::{DecodedMessage, Decoder, FrameAssembler};
use crate::schema::SchemaRegistry;

/// Callback invoked for each decoded message
pub type Handler = Box<dyn FnMut(&DecodedMessage) + Send>;

/// Per-connection dispatcher
pub struct Dispatcher {
    registry: Arc<SchemaRegistry>,
    decoder: Decoder,
    assembler: FrameAssembler,
    handlers: HashMap<u16, Vec<Handler>>,
    catch_all: Vec<Handler>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            decoder: Decoder::new(Arc::clone(&registry)),
            registry,
            assembler: FrameAssembler::new(),
            handlers: HashMap::new(),
            catch_all: Vec::new(),
        }
    }

    /// Subscribe to one event by name
    ///
    /// Fails with `UnknownEvent` if the registry does not know the event.
    pub fn subscribe<F>(&mut self, event: &str, handler: F) -> Result<()>
    where
        F: FnMut(&DecodedMessage) + Send + 'static,
    {
        let id = self
            .registry
            .id_for_event(event)
            .ok_or_else(|| MyceliumError::UnknownEvent(event.to_string()))?;
        self.handlers.entry(id).or_default().push(Box::new(handler));
        Ok(())
    }

    /// Subscribe to every decoded message
    pub fn subscribe_all<F>(&mut self, handler: F)
    where
        F: FnMut(&DecodedMessage) + Send + 'static,
    {
        self.catch_all.push(Box::new(handler));
    }

    /// Feed one chunk from the transport
    ///
    /// Extracts and dispatches every envelope completed by this chunk before
    /// returning. Decode failures are reported per message and leave the
    /// buffered stream untouched.
    pub fn handle_chunk(&mut self, chunk: impl Into<Bytes>) -> Vec<Result<DecodedMessage>> {
        self.assembler.push(chunk);

        let mut outcomes = Vec::new();
        while let Some(frame) = self.assembler.next_frame() {
            tracing::trace!("Assembled frame of {} bytes", frame.len());
            outcomes.push(self.dispatch_frame(&frame));
        }
        outcomes
    }

    /// Decode one complete envelope and run its handlers
    pub fn dispatch_frame(&mut self, frame: &[u8]) -> Result<DecodedMessage> {
        let message = match self.decoder.decode_message(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping undecodable message: {}", e);
                return Err(e);
            }
        };

        if let Some(handlers) = self.handlers.get_mut(&message.id) {
            for handler in handlers.iter_mut() {
                handler(&message);
            }
        }
        for handler in self.catch_all.iter_mut() {
            handler(&message);
        }

        Ok(message)
    }

    /// Stream closed: abandon any partial envelope
    ///
    /// Returns how many buffered bytes were dropped.
    pub fn close(&mut self) -> usize {
        let dropped = self.assembler.discard();
        if dropped > 0 {
            tracing::debug!("Discarded {} bytes of incomplete message at close", dropped);
        }
        dropped
    }

    /// Bytes waiting for the rest of their envelope
    pub fn pending_bytes(&self) -> usize {
        self.assembler.buffered_len()
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }
}
