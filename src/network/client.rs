//! Mycelium Client
//!
//! Connects to a server, sends encoded messages and surfaces decoded ones
//! as events.

use std::io::{BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};
use parking_lot::Mutex;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{MyceliumError, Result};
use crate::protocol::{Encoder, OutboundMessage};
use crate::schema::SchemaRegistry;

use super::connection::Connection;
use super::ClientEvent;

/// Poll interval while draining events during close
const CLOSE_POLL: Duration = Duration::from_millis(10);

/// TCP client for one server connection
pub struct Client {
    /// Handle used to shut the socket down
    stream: TcpStream,

    /// Buffered write half, shared by senders
    writer: Mutex<BufWriter<TcpStream>>,

    /// Encoder bound to the registry
    encoder: Encoder,

    /// Events produced by the reader thread
    events: Receiver<ClientEvent>,

    /// Reader thread, taken on close
    reader: Option<JoinHandle<()>>,

    /// Remote address
    peer_addr: SocketAddr,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connect to `config.server_addr` and start reading
    pub fn connect(config: &Config, registry: Arc<SchemaRegistry>) -> Result<Self> {
        config.validate()?;

        let stream = open_stream(config)?;
        let peer_addr = stream.peer_addr()?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        let (tx, rx) = channel::bounded(config.event_channel_capacity);
        let connection = Connection::new(
            stream.try_clone()?,
            Dispatcher::new(Arc::clone(&registry)),
            tx,
            config.read_buffer_size,
        );
        connection.set_read_timeout(config.read_timeout_ms)?;

        let reader = std::thread::Builder::new()
            .name(format!("mycelium-reader-{}", peer_addr))
            .spawn(move || connection.run())?;

        tracing::info!("Connected to {}", peer_addr);

        Ok(Self {
            writer: Mutex::new(BufWriter::new(stream.try_clone()?)),
            stream,
            encoder: Encoder::with_chunk_size(registry, config.chunk_size),
            events: rx,
            reader: Some(reader),
            peer_addr,
        })
    }

    /// Encode a message and write it as one buffer
    ///
    /// Encode errors are returned before anything reaches the socket.
    pub fn send(&self, message: &OutboundMessage) -> Result<()> {
        let bytes = self.encoder.encode(message)?;
        self.send_raw(&bytes)
    }

    /// Write an already-encoded envelope
    pub fn send_raw(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(bytes)?;
        writer.flush()?;
        tracing::trace!("Sent {} bytes to {}", bytes.len(), self.peer_addr);
        Ok(())
    }

    /// Decoded messages, per-message failures and the final close
    pub fn events(&self) -> &Receiver<ClientEvent> {
        &self.events
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        self.encoder.registry()
    }

    /// Close the connection and wait for the reader thread
    pub fn shutdown(mut self) -> Result<()> {
        self.close()
    }

    fn close(&mut self) -> Result<()> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };

        // Already closed by the peer is fine
        let _ = self.stream.shutdown(Shutdown::Both);

        // The reader may be blocked on a full channel
        while !reader.is_finished() {
            let _ = self.events.recv_timeout(CLOSE_POLL);
        }
        reader
            .join()
            .map_err(|_| MyceliumError::Network("reader thread panicked".to_string()))
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Error closing connection to {}: {}", self.peer_addr, e);
        }
    }
}

/// Resolve the address and connect, trying each candidate in turn
fn open_stream(config: &Config) -> Result<TcpStream> {
    let addrs = config
        .server_addr
        .to_socket_addrs()
        .map_err(|e| MyceliumError::Network(format!("cannot resolve {}: {}", config.server_addr, e)))?;

    let mut last_err = None;
    for addr in addrs {
        let attempt = if config.connect_timeout_ms > 0 {
            TcpStream::connect_timeout(&addr, Duration::from_millis(config.connect_timeout_ms))
        } else {
            TcpStream::connect(addr)
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(MyceliumError::Network(match last_err {
        Some(e) => format!("cannot connect to {}: {}", config.server_addr, e),
        None => format!("{} resolved to no addresses", config.server_addr),
    }))
}
