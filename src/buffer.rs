/// Single-owner accumulator for line-oriented input.
///
/// Content is appended line by line and drained in exact `chunk_size` pieces;
/// whatever is left at end of input comes out through `flush_remainder`.
/// Drained bytes are skipped by offset and only compacted away once they make
/// up at least half the allocation, so draining a long run costs O(total).
#[derive(Debug, Default)]
pub struct SequenceBuffer {
    buf: Vec<u8>,
    // Bytes before `start` were already drained.
    start: usize,
}

impl SequenceBuffer {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
            start: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.compact();
        self.buf.extend_from_slice(data);
    }

    /// Moves out the first `chunk_size` bytes once that many are buffered.
    pub fn drain_full(&mut self, chunk_size: usize) -> Option<Vec<u8>> {
        if chunk_size == 0 || self.len() < chunk_size {
            return None;
        }
        let end = self.start + chunk_size;
        let out = self.buf[self.start..end].to_vec();
        self.start = end;
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        }
        Some(out)
    }

    pub fn flush_remainder(&mut self) -> Option<Vec<u8>> {
        if self.is_empty() {
            return None;
        }
        self.compact();
        Some(std::mem::take(&mut self.buf))
    }

    fn compact(&mut self) {
        if self.start > 0 && self.start * 2 >= self.buf.len() {
            self.buf.drain(..self.start);
            self.start = 0;
        }
    }
}
