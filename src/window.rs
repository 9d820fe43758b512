use std::ops::Range;

/// One unit of work cut from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// 0-based, strictly increasing position in the stream.
    pub index: usize,
    pub data: Vec<u8>,
    /// Source bytes consumed to produce this window.
    pub source_range: Range<u64>,
}
