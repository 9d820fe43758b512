//! Streaming FASTA splitter with carried overlap.
//!
//! - Fixed-size raw windows, or line-oriented windows with `>` header skipping.
//! - The tail of each raw window is carried into the next one, so adjacency
//!   survives every cut.
//! - Marker bases (`N` by default) are stripped before writing.
//! - Artifacts `{prefix}_{index}.{ext}` are written by a bounded worker pool
//!   while the next window is being read; atomic temp-file-and-rename by default.
//! - Plain and `.gz` input (auto-detect); optional `mmap` for plain files.
//! - Optional async driver behind the `async` feature.

pub mod buffer;
pub mod carry;
pub mod clean;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod pool;
pub mod reader;
pub mod sink;
pub mod window;
mod util;

#[cfg(feature = "async")]
pub mod async_pipeline;

pub use crate::buffer::SequenceBuffer;
pub use crate::carry::{OverlapState, carry};
pub use crate::clean::MarkerSet;
pub use crate::error::{
    ConfigError, FailedWrite, IoContext, PartialReport, PipelineError, SinkError, SourceError,
};
pub use crate::pipeline::{CancellationToken, Pipeline, PipelineSummary};
pub use crate::policy::{ChunkerOptions, DrainPolicy, InputMode, WritePolicy};
pub use crate::pool::{WorkerPool, WriteHandle, WriteOutcome};
pub use crate::reader::SourceReader;
pub use crate::sink::{ArtifactReport, ArtifactSink, FileSink};
pub use crate::util::artifact_path;
pub use crate::window::Window;

#[cfg(feature = "async")]
pub use crate::async_pipeline::{AsyncPipeline, AsyncSourceReader};
