use bytes::{Bytes, BytesMut};

/// Per-attempt transfer counters.
///
/// A fresh value is created at the start of every attempt, retries
/// included, so nothing carries over from a failed try.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkProgress {
    pub bytes_moved: u64,
    pub total_bytes: Option<u64>,
    pub chunk_index: u32,
}

impl ChunkProgress {
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            bytes_moved: 0,
            total_bytes,
            chunk_index: 0,
        }
    }

    /// Accounts for one processed chunk of `len` bytes.
    pub fn record(&mut self, len: usize) {
        self.bytes_moved += len as u64;
        self.chunk_index += 1;
    }

    /// True on every `every`-th recorded chunk.
    pub fn at_checkpoint(&self, every: u32) -> bool {
        every > 0 && self.chunk_index > 0 && self.chunk_index % every == 0
    }

    /// Completed fraction in `[0, 1]`, or `None` when the total is unknown
    /// or zero.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => Some((self.bytes_moved as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}

/// Re-slices an arbitrarily framed byte stream into fixed-size chunks.
///
/// HTTP bodies arrive in whatever frames the connection produced; the
/// download loop wants exact chunk boundaries for its accounting.
#[derive(Debug)]
pub struct Rechunker {
    size: usize,
    buf: BytesMut,
}

impl Rechunker {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            buf: BytesMut::with_capacity(size),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pops the next full chunk, if one is buffered.
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        (self.buf.len() >= self.size).then(|| self.buf.split_to(self.size).freeze())
    }

    /// Drains whatever is left after the stream ended.
    pub fn finish(&mut self) -> Option<Bytes> {
        (!self.buf.is_empty()).then(|| self.buf.split().freeze())
    }
}
