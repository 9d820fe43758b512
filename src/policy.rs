use std::path::PathBuf;

use crate::clean::MarkerSet;
use crate::error::ConfigError;

/// How the input is cut into windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Raw byte windows of exactly `chunk_size` bytes; headers and newlines are content.
    Fixed,
    /// Line-oriented: `>` header lines are skipped, line terminators dropped,
    /// and windows hold exactly `chunk_size` cleaned bytes.
    ///
    /// Marker bytes are already gone from these windows, so the carried
    /// overlap is the last `overlap_size` *cleaned* bases of the previous
    /// window, not raw input bytes as in `Fixed` mode. Long lines are read in
    /// pieces of at most `chunk_size` bytes, so memory stays bounded even when
    /// a whole sequence sits on one line.
    Lines,
}

/// How an artifact reaches its final path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Write to a temporary file in the output directory, then rename.
    Atomic,
    /// Write in place; a failed write may leave a partial file behind.
    Direct,
}

/// What to do with dispatched writes after a fatal read error or cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Let every dispatched write finish.
    Drain,
    /// Drop queued writes that have not started yet.
    Abort,
}

#[derive(Debug, Clone)]
pub struct ChunkerOptions {
    pub chunk_size: usize,
    pub overlap_size: usize,
    pub workers: usize,
    /// Pending writes allowed in the queue; `None` means `2 * workers`.
    pub queue_depth: Option<usize>,
    pub markers: MarkerSet,
    pub input_mode: InputMode,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub extension: String,
    pub write_policy: WritePolicy,
    pub drain_policy: DrainPolicy,
}

impl Default for ChunkerOptions {
    fn default() -> Self {
        Self {
            chunk_size: 10_000_000,
            overlap_size: 100,
            workers: 4,
            queue_depth: None,
            markers: MarkerSet::default(),
            input_mode: InputMode::Fixed,
            output_dir: PathBuf::from("."),
            output_prefix: "output".to_string(),
            extension: "txt".to_string(),
            write_policy: WritePolicy::Atomic,
            drain_policy: DrainPolicy::Drain,
        }
    }
}

impl ChunkerOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.overlap_size >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.overlap_size,
                chunk: self.chunk_size,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_depth == Some(0) {
            return Err(ConfigError::ZeroQueueDepth);
        }
        if self.output_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        Ok(())
    }

    #[inline]
    pub fn effective_queue_depth(&self) -> usize {
        self.queue_depth.unwrap_or(self.workers * 2)
    }
}
