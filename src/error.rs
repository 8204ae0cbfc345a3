//! Error types for Mycelium
//!
//! Provides a unified error type for schema loading, encoding, decoding
//! and the TCP client.

use thiserror::Error;

/// Result type alias using MyceliumError
pub type Result<T> = std::result::Result<T, MyceliumError>;

/// Unified error type for Mycelium operations
#[derive(Debug, Error)]
pub enum MyceliumError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Decode Errors
    // -------------------------------------------------------------------------
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unknown message id: {0}")]
    UnknownMessageId(u16),

    #[error("Truncated payload: needed {needed} bytes, {available} available")]
    TruncatedPayload { needed: usize, available: usize },

    // -------------------------------------------------------------------------
    // Encode Errors
    // -------------------------------------------------------------------------
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Event {event} is registered as id {expected}, not {given}")]
    EventIdMismatch {
        event: String,
        expected: u16,
        given: u16,
    },

    #[error("Encode target mismatch at {path}: expected {expected}, found {found}")]
    EncodeTargetMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Payload too large: {0} bytes does not fit the u16 length prefix")]
    PayloadTooLarge(usize),

    // -------------------------------------------------------------------------
    // Schema Errors
    // -------------------------------------------------------------------------
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection closed")]
    ConnectionClosed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MyceliumError {
    /// Whether this error tears down the connection.
    ///
    /// Per-message codec errors are isolated; only transport conditions are fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MyceliumError::Io(_) | MyceliumError::Network(_) | MyceliumError::ConnectionClosed
        )
    }

    pub(crate) fn mismatch(path: &str, expected: impl Into<String>, found: impl Into<String>) -> Self {
        MyceliumError::EncodeTargetMismatch {
            path: if path.is_empty() { "$".to_string() } else { path.to_string() },
            expected: expected.into(),
            found: found.into(),
        }
    }
}
