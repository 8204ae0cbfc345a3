//! Frame assembler
//!
//! Rebuilds discrete envelopes from a byte stream delivered in chunks of
//! arbitrary size.
//!
//! The pending chunks are kept as a queue of `Bytes`. Their concatenation,
//! in order, is always the unconsumed tail of the stream. Extraction peeks
//! the 2-byte length prefix across chunk boundaries without touching the
//! queue, and only consumes once a whole envelope is buffered.
//!
//! # Example
//!
//! ```ignore
//! let mut assembler = FrameAssembler::new();
//! assembler.push(chunk);
//! while let Some(frame) = assembler.next_frame() {
//!     // frame is one complete envelope, length prefix included
//! }
//! ```

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use super::message::LENGTH_PREFIX_SIZE;

/// Reassembles envelopes from stream chunks
///
/// One assembler per connection; state is never shared.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    /// Unconsumed chunks in arrival order
    pending: VecDeque<Bytes>,
    /// Sum of the lengths of `pending`
    buffered: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk to the tail of the stream
    pub fn push(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return;
        }
        self.buffered += chunk.len();
        self.pending.push_back(chunk);
    }

    /// Extract the next complete envelope, if one is fully buffered
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let length = self.peek_length()?;
        let needed = usize::from(length) + LENGTH_PREFIX_SIZE;
        if self.buffered < needed {
            return None;
        }
        Some(self.take(needed))
    }

    /// Iterate over every envelope currently extractable
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { assembler: self }
    }

    /// Read the length prefix without consuming anything
    fn peek_length(&self) -> Option<u16> {
        if self.buffered < LENGTH_PREFIX_SIZE {
            return None;
        }
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        let mut filled = 0;
        for chunk in &self.pending {
            let n = (LENGTH_PREFIX_SIZE - filled).min(chunk.len());
            prefix[filled..filled + n].copy_from_slice(&chunk[..n]);
            filled += n;
            if filled == LENGTH_PREFIX_SIZE {
                break;
            }
        }
        Some(u16::from_be_bytes(prefix))
    }

    /// Consume exactly `n` buffered bytes; the caller checked `n <= buffered`
    fn take(&mut self, n: usize) -> Bytes {
        self.buffered -= n;

        // Frame lies inside the front chunk: slice it without copying
        if let Some(front) = self.pending.front_mut() {
            if front.len() >= n {
                let frame = front.split_to(n);
                if front.is_empty() {
                    self.pending.pop_front();
                }
                return frame;
            }
        }

        let mut frame = BytesMut::with_capacity(n);
        while frame.len() < n {
            let Some(mut chunk) = self.pending.pop_front() else {
                break;
            };
            let wanted = n - frame.len();
            if chunk.len() > wanted {
                // Remainder of the last contributing chunk goes back in front
                let head = chunk.split_to(wanted);
                frame.extend_from_slice(&head);
                self.pending.push_front(chunk);
            } else {
                frame.extend_from_slice(&chunk);
            }
        }
        frame.freeze()
    }

    /// Bytes received but not yet extracted
    pub fn buffered_len(&self) -> usize {
        self.buffered
    }

    /// Number of chunks in the queue
    pub fn pending_chunks(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffered == 0
    }

    /// Drop whatever partial envelope is buffered
    ///
    /// Used at stream close. Returns the number of bytes abandoned.
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffered;
        self.pending.clear();
        self.buffered = 0;
        dropped
    }
}

/// Iterator returned by [`FrameAssembler::frames`]
pub struct Frames<'a> {
    assembler: &'a mut FrameAssembler,
}

impl Iterator for Frames<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.assembler.next_frame()
    }
}
