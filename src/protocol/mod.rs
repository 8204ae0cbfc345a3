//! Protocol Module
//!
//! Wire codec for schema-described messages.
//!
//! ## Envelope
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (2)  │  Id (2)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! Big-endian throughout. `Len` counts id + payload.
//!
//! ### Payload by Kind
//! - int16 / int32 / float32: 2 / 4 / 4 bytes
//! - bool:   1 byte, non-zero is true
//! - string: len (2 bytes) + raw bytes
//! - array:  count (2 bytes) + elements
//! - object: presence (1 byte) + fields in name order when non-zero
//! - map:    count (2 bytes) + (string key, value) pairs

mod decoder;
mod encoder;
mod framing;
mod message;
mod writer;

pub use decoder::{decode_value, Decoder, MAX_DEPTH, MAX_VALUES};
pub use encoder::{encode_value, Encoder, DEFAULT_CHUNK_SIZE};
pub use framing::{FrameAssembler, Frames};
pub use message::{DecodedMessage, OutboundMessage, HEADER_SIZE, LENGTH_PREFIX_SIZE};
pub use writer::ChunkedWriter;
