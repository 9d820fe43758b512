//! Marker stripping.

/// Set of bytes removed from every payload before it is written.
///
/// Backed by a 256-entry lookup table, so cleaning is a single pass.
#[derive(Clone, PartialEq, Eq)]
pub struct MarkerSet {
    table: [bool; 256],
}

impl MarkerSet {
    pub fn from_bytes(markers: &[u8]) -> Self {
        let mut table = [false; 256];
        for &b in markers {
            table[b as usize] = true;
        }
        Self { table }
    }

    /// A set that strips nothing.
    pub fn empty() -> Self {
        Self {
            table: [false; 256],
        }
    }

    #[inline]
    pub fn contains(&self, b: u8) -> bool {
        self.table[b as usize]
    }

    pub fn is_empty(&self) -> bool {
        !self.table.iter().any(|&m| m)
    }

    pub fn bytes(&self) -> Vec<u8> {
        (0..=255u8).filter(|&b| self.contains(b)).collect()
    }

    /// Copy of `payload` without marker bytes, order preserved.
    pub fn clean(&self, payload: &[u8]) -> Vec<u8> {
        payload.iter().copied().filter(|&b| !self.contains(b)).collect()
    }

    /// Strips markers in place, reusing the allocation.
    pub fn clean_owned(&self, mut payload: Vec<u8>) -> Vec<u8> {
        if !self.is_empty() {
            payload.retain(|&b| !self.contains(b));
        }
        payload
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::from_bytes(b"N")
    }
}

impl std::fmt::Debug for MarkerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MarkerSet")
            .field(&String::from_utf8_lossy(&self.bytes()))
            .finish()
    }
}
