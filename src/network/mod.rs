//! Network Module
//!
//! Blocking TCP client.
//!
//! ## Architecture
//! - Caller threads write through a shared, locked writer
//! - One reader thread per connection owns the dispatcher
//! - Outcomes reach the caller over a bounded channel

mod client;
mod connection;

pub use client::Client;

use crate::error::MyceliumError;
use crate::protocol::DecodedMessage;

/// Events emitted by the client
#[derive(Debug)]
pub enum ClientEvent {
    /// A complete message decoded successfully
    Message(DecodedMessage),

    /// A complete message that could not be decoded; the stream continues
    DecodeFailed(MyceliumError),

    /// The connection ended; no further events follow
    Closed { reason: String },
}
