use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::PipelineSummary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoContext {
    pub byte_pos: u64,
    pub line_num: u64,
}

/// Invalid options, rejected before any input is read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("overlap size ({overlap}) must be smaller than chunk size ({chunk})")]
    OverlapTooLarge { overlap: usize, chunk: usize },
    #[error("at least one worker is required")]
    NoWorkers,
    #[error("queue depth must be greater than zero")]
    ZeroQueueDepth,
    #[error("output prefix must not be empty")]
    EmptyPrefix,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error at {ctx:?}: {source}")]
    Io {
        #[source]
        source: io::Error,
        ctx: IoContext,
    },
}

impl SourceError {
    pub(crate) fn io_err(source: io::Error, ctx: IoContext) -> Self {
        Self::Io { source, ctx }
    }
}

/// Failure of a single artifact write. Never affects sibling writes.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write aborted before it started")]
    Aborted,
    #[error("worker exited without reporting a result")]
    WorkerLost,
}

impl SinkError {
    pub(crate) fn io_err(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug)]
pub struct FailedWrite {
    pub index: usize,
    pub error: SinkError,
}

/// What was written, and what was not, when a run ends unsuccessfully.
#[derive(Debug)]
pub struct PartialReport {
    pub summary: PipelineSummary,
    pub failed: Vec<FailedWrite>,
}

impl PartialReport {
    pub fn written_indices(&self) -> Vec<usize> {
        self.summary.artifacts.iter().map(|a| a.index).collect()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().map(|f| f.index).collect()
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to prepare output: {0}")]
    Prepare(#[from] SinkError),
    #[error("failed to start worker pool: {0}")]
    PoolSpawn(#[source] io::Error),
    #[error(
        "source read failed after {} artifact(s) written, {} failed: {source}",
        .report.summary.chunks_written,
        .report.failed.len()
    )]
    Source {
        #[source]
        source: SourceError,
        report: PartialReport,
    },
    #[error(
        "{} artifact write(s) failed (indices {:?}), {} written",
        .report.failed.len(),
        .report.failed_indices(),
        .report.summary.chunks_written
    )]
    Writes { report: PartialReport },
    #[error(
        "cancelled after {} artifact(s) written, {} not completed",
        .report.summary.chunks_written,
        .report.failed.len()
    )]
    Cancelled { report: PartialReport },
}

impl PipelineError {
    /// The partial report, for every variant raised after work started.
    pub fn report(&self) -> Option<&PartialReport> {
        match self {
            Self::Source { report, .. } | Self::Writes { report } | Self::Cancelled { report } => {
                Some(report)
            }
            Self::Config(_) | Self::Prepare(_) | Self::PoolSpawn(_) => None,
        }
    }
}
