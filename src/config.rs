//! Configuration for Mycelium
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{MyceliumError, Result};
use crate::protocol::DEFAULT_CHUNK_SIZE;

/// Main configuration for a Mycelium client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Schema Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the schema documents
    /// Internal structure:
    ///   {schema_dir}/
    ///     ├── schemaMap.json     (event name <-> message id)
    ///     └── <EventName>.json   (one schema per event)
    pub schema_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// Capacity of each chunk in the encoder's output chain (in bytes)
    pub chunk_size: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Server address (host:port)
    pub server_addr: String,

    /// Size of each socket read handed to the frame assembler
    pub read_buffer_size: usize,

    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    /// Bound on undelivered client events
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from("./schema"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            server_addr: "127.0.0.1:7777".to_string(),
            read_buffer_size: 8192,
            connect_timeout_ms: 5000,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            event_channel_capacity: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the codec and client cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(MyceliumError::Config("chunk_size must be non-zero".to_string()));
        }
        if self.read_buffer_size == 0 {
            return Err(MyceliumError::Config(
                "read_buffer_size must be non-zero".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(MyceliumError::Config(
                "event_channel_capacity must be non-zero".to_string(),
            ));
        }
        if self.server_addr.is_empty() {
            return Err(MyceliumError::Config("server_addr is empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the schema directory
    pub fn schema_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_dir = path.into();
        self
    }

    /// Set the encoder chunk size (in bytes)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the server address
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the socket read size
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the event channel capacity
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
