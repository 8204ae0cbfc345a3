//! # Mycelium
//!
//! Client side of a schema-driven binary messaging protocol:
//! - Schema registry loaded from JSON-schema style documents
//! - Binary encoder / decoder driven by compiled layouts
//! - Frame assembler for fragmented TCP streams
//! - Callback dispatch and a blocking TCP client
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Client                              │
//! │           (writer mutex + one reader thread)                 │
//! └──────────────┬──────────────────────────────▲───────────────┘
//!                │ bytes                        │ chunks
//!                │                    ┌─────────┴─────────┐
//!         ┌──────┴──────┐             │ Frame Assembler   │
//!         │   Encoder   │             │ (VecDeque<Bytes>) │
//!         │  (chunked)  │             └─────────┬─────────┘
//!         └──────▲──────┘                       │ envelopes
//!                │                        ┌─────▼─────┐
//!                │                        │  Decoder  │
//!                │                        └─────┬─────┘
//!                │                              │
//!         ┌──────┴──────────────────────────────▼──────┐
//!         │          Schema Registry (Arc)             │
//!         │   event <-> id, compiled layouts           │
//!         └────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod value;

pub mod schema;
pub mod protocol;
pub mod dispatch;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MyceliumError, Result};
pub use config::Config;
pub use value::Value;
pub use schema::SchemaRegistry;
pub use protocol::{DecodedMessage, Decoder, Encoder, FrameAssembler, OutboundMessage};
pub use dispatch::Dispatcher;
pub use network::{Client, ClientEvent};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Mycelium
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
