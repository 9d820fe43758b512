//! Overlap carried from one window into the next.

/// Trailing `min(overlap_size, window.len())` bytes of a raw window.
#[inline]
pub fn carry(window: &[u8], overlap_size: usize) -> &[u8] {
    let keep = overlap_size.min(window.len());
    &window[window.len() - keep..]
}

/// The single carried value, owned by whoever drives the reads.
///
/// It is only ever derived from raw window data, never from anything a write
/// produced.
#[derive(Debug, Clone, Default)]
pub struct OverlapState {
    bytes: Vec<u8>,
    overlap_size: usize,
}

impl OverlapState {
    pub fn new(overlap_size: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(overlap_size),
            overlap_size,
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `previous carry ++ raw` and keeps the tail of `raw` for the next call.
    pub fn attach(&mut self, raw: &[u8]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.bytes.len() + raw.len());
        payload.extend_from_slice(&self.bytes);
        payload.extend_from_slice(raw);

        self.bytes.clear();
        self.bytes.extend_from_slice(carry(raw, self.overlap_size));
        payload
    }
}
