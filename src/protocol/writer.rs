//! Chunked output writer
//!
//! The encoder writes into a chain of fixed-capacity chunks instead of one
//! growing allocation. Before each write the writer checks the room left in
//! the current chunk; when it is short, the chunk is closed at its used
//! length and a fresh one is started. A single scalar, or a string's length
//! prefix together with its bytes, never straddles two chunks.

use bytes::{BufMut, BytesMut};

/// Chain of fixed-capacity output chunks
pub struct ChunkedWriter {
    /// Closed chunks, each holding only its used bytes
    done: Vec<BytesMut>,
    /// Chunk currently written to
    current: BytesMut,
    /// Capacity limit of `current`
    limit: usize,
    /// Nominal chunk capacity
    chunk_size: usize,
}

impl ChunkedWriter {
    /// Create a writer whose chunks hold `chunk_size` bytes
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            done: Vec::new(),
            current: BytesMut::with_capacity(chunk_size),
            limit: chunk_size,
            chunk_size,
        }
    }

    /// Bytes still free in the current chunk
    pub fn room(&self) -> usize {
        self.limit - self.current.len()
    }

    /// Make sure the current chunk can take `size` more bytes
    ///
    /// A write larger than the chunk size gets a chunk of its own.
    fn reserve(&mut self, size: usize) -> &mut BytesMut {
        if self.room() < size {
            let limit = size.max(self.chunk_size);
            let full = std::mem::replace(&mut self.current, BytesMut::with_capacity(limit));
            if !full.is_empty() {
                self.done.push(full);
            }
            self.limit = limit;
        }
        &mut self.current
    }

    pub fn put_u8(&mut self, v: u8) {
        self.reserve(1).put_u8(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.put_u8(u8::from(v));
    }

    pub fn put_u16(&mut self, v: u16) {
        self.reserve(2).put_u16(v);
    }

    pub fn put_i16(&mut self, v: i16) {
        self.reserve(2).put_i16(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.reserve(4).put_i32(v);
    }

    pub fn put_f32(&mut self, v: f32) {
        self.reserve(4).put_f32(v);
    }

    /// Length-prefixed string; the caller guarantees `bytes.len() <= u16::MAX`
    pub fn put_str(&mut self, bytes: &[u8]) {
        let chunk = self.reserve(2 + bytes.len());
        chunk.put_u16(bytes.len() as u16);
        chunk.put_slice(bytes);
    }

    /// Total bytes written so far
    pub fn len(&self) -> usize {
        self.done.iter().map(BytesMut::len).sum::<usize>() + self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of chunks holding data
    pub fn chunk_count(&self) -> usize {
        self.done.len() + usize::from(!self.current.is_empty())
    }

    /// Concatenate every chunk into one contiguous buffer
    pub fn finish(self) -> BytesMut {
        let total = self.len();
        let mut out = BytesMut::with_capacity(total);
        for chunk in &self.done {
            out.extend_from_slice(chunk);
        }
        out.extend_from_slice(&self.current);
        out
    }
}
