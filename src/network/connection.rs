//! Connection Reader
//!
//! Read half of a client connection. Owns the connection's dispatcher (and
//! so its frame assembler) and forwards every outcome as a `ClientEvent`.

use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::Sender;

use crate::dispatch::Dispatcher;
use crate::error::Result;

use super::ClientEvent;

/// Reads one TCP stream until it closes
pub(crate) struct Connection {
    /// Read handle of the stream
    stream: TcpStream,

    /// Per-connection assembler + decoder
    dispatcher: Dispatcher,

    /// Event sink for the client
    events: Sender<ClientEvent>,

    /// Size of each socket read
    read_buffer_size: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    pub(crate) fn new(
        stream: TcpStream,
        dispatcher: Dispatcher,
        events: Sender<ClientEvent>,
        read_buffer_size: usize,
    ) -> Self {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            stream,
            dispatcher,
            events,
            read_buffer_size: read_buffer_size.max(1),
            peer_addr,
        }
    }

    /// Configure the read timeout (0 disables)
    pub(crate) fn set_read_timeout(&self, read_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        Ok(())
    }

    /// Read until the stream ends, then report why
    ///
    /// Blocks the calling thread. A partial message still buffered at close
    /// is discarded without an error.
    pub(crate) fn run(mut self) {
        let reason = self.read_loop();

        let dropped = self.dispatcher.close();
        tracing::info!(
            "Connection to {} closed: {} ({} bytes discarded)",
            self.peer_addr,
            reason,
            dropped
        );
        let _ = self.events.send(ClientEvent::Closed { reason });
    }

    fn read_loop(&mut self) -> String {
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            let n = match self.stream.read(&mut buf) {
                Ok(0) => return "end of stream".to_string(),
                Ok(n) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == ErrorKind::ConnectionReset => {
                    tracing::debug!("Connection reset by {}", self.peer_addr);
                    return "connection reset".to_string();
                }
                Err(ref e) if e.kind() == ErrorKind::ConnectionAborted => {
                    tracing::debug!("Connection aborted by {}", self.peer_addr);
                    return "connection aborted".to_string();
                }
                // Read timeout (Windows reports TimedOut instead of WouldBlock)
                Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    tracing::debug!("Read timeout for {}", self.peer_addr);
                    return "read timeout".to_string();
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return format!("read error: {}", e);
                }
            };

            tracing::trace!("Read {} bytes from {}", n, self.peer_addr);

            for outcome in self.dispatcher.handle_chunk(Bytes::copy_from_slice(&buf[..n])) {
                let event = match outcome {
                    Ok(message) => ClientEvent::Message(message),
                    Err(e) => ClientEvent::DecodeFailed(e),
                };
                if self.events.send(event).is_err() {
                    // Nobody is listening any more
                    return "event receiver dropped".to_string();
                }
            }
        }
    }
}
