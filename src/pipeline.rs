//! Read → carry → clean → dispatch driver.
//!
//! The driver is the only reader and the only owner of the overlap state. The
//! carry for window `n + 1` is taken from the raw bytes of window `n` as soon as
//! they are read, so reading never waits on a write. Writes run on the
//! [`WorkerPool`] and are joined once, at the end, by the completion barrier.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::carry::OverlapState;
use crate::error::{FailedWrite, PartialReport, PipelineError, SourceError};
use crate::policy::{ChunkerOptions, DrainPolicy};
use crate::pool::{WorkerPool, WriteOutcome};
use crate::reader::SourceReader;
use crate::sink::{ArtifactReport, ArtifactSink, FileSink};

/// Dispatched chunks between two progress lines.
const PROGRESS_EVERY: usize = 10;

/// Aggregate of a run, computed after every write has been joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub chunks_written: usize,
    /// Raw content bytes taken from the source.
    pub characters_processed: u64,
    pub bytes_written: u64,
    /// Successful artifacts, ordered by index.
    pub artifacts: Vec<ArtifactReport>,
}

/// Shared flag for stopping a run from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Reading,
    Carrying,
    Cleaning,
    Dispatching,
    Draining,
    Failed,
    Done,
}

/// Why the read loop ended early.
pub(crate) enum Stop {
    Source(SourceError),
    Cancelled,
}

pub struct Pipeline {
    opts: ChunkerOptions,
    sink: Arc<dyn ArtifactSink>,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Pipeline writing files as described by `opts`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if the options are invalid.
    pub fn new(opts: ChunkerOptions) -> Result<Self, PipelineError> {
        let sink = Arc::new(FileSink::from_options(&opts));
        Self::with_sink(opts, sink)
    }

    /// Pipeline writing through a caller-supplied sink.
    pub fn with_sink(opts: ChunkerOptions, sink: Arc<dyn ArtifactSink>) -> Result<Self, PipelineError> {
        opts.validate()?;
        Ok(Self {
            opts,
            sink,
            cancel: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &ChunkerOptions {
        &self.opts
    }

    /// Opens `path` (plain or gzip) and runs the pipeline over it.
    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<PipelineSummary, PipelineError> {
        let reader = SourceReader::from_path(path, &self.opts).map_err(|source| {
            PipelineError::Source {
                source,
                report: PartialReport {
                    summary: PipelineSummary::default(),
                    failed: Vec::new(),
                },
            }
        })?;
        self.run(reader)
    }

    pub fn run(&self, mut reader: SourceReader) -> Result<PipelineSummary, PipelineError> {
        let mut phase = Phase::Idle;
        self.sink.prepare()?;

        let mut pool = WorkerPool::new(
            self.opts.workers,
            self.opts.effective_queue_depth(),
            Arc::clone(&self.sink),
        )
        .map_err(PipelineError::PoolSpawn)?;
        log::info!(
            "splitting into {}-byte chunks (overlap {}) with {} writer(s)",
            self.opts.chunk_size,
            self.opts.overlap_size,
            pool.num_workers()
        );

        let mut overlap = OverlapState::new(self.opts.overlap_size);
        let mut handles = Vec::new();
        let mut stop = None;

        loop {
            if self.cancel.is_cancelled() {
                stop = Some(Stop::Cancelled);
                break;
            }
            enter(&mut phase, Phase::Reading);
            let window = match reader.next_window() {
                Ok(Some(w)) => w,
                Ok(None) => break,
                Err(e) => {
                    stop = Some(Stop::Source(e));
                    break;
                }
            };

            enter(&mut phase, Phase::Carrying);
            let payload = overlap.attach(&window.data);

            enter(&mut phase, Phase::Cleaning);
            let cleaned = self.opts.markers.clean_owned(payload);

            enter(&mut phase, Phase::Dispatching);
            handles.push(pool.submit(window.index, cleaned));

            if (window.index + 1) % PROGRESS_EVERY == 0 {
                log::info!(
                    "dispatched {} chunk(s), {} characters read",
                    window.index + 1,
                    reader.content_bytes()
                );
            }
        }

        match &stop {
            Some(Stop::Source(e)) => {
                enter(&mut phase, Phase::Failed);
                log::error!("read failed, stopping after {} chunk(s): {e}", handles.len());
            }
            Some(Stop::Cancelled) => {
                enter(&mut phase, Phase::Draining);
                log::warn!("cancelled after {} chunk(s)", handles.len());
            }
            None => enter(&mut phase, Phase::Draining),
        }
        if stop.is_some() && self.opts.drain_policy == DrainPolicy::Abort {
            pool.abort();
        }

        let outcomes = WorkerPool::await_all(handles);
        pool.shutdown();

        let result = finish(outcomes, reader.content_bytes(), stop);
        if result.is_ok() {
            enter(&mut phase, Phase::Done);
        }
        result
    }
}

fn enter(phase: &mut Phase, next: Phase) {
    log::trace!("{phase:?} -> {next:?}");
    *phase = next;
}

/// Folds write outcomes into the final summary or the matching error.
pub(crate) fn finish(
    outcomes: Vec<WriteOutcome>,
    characters_processed: u64,
    stop: Option<Stop>,
) -> Result<PipelineSummary, PipelineError> {
    let mut summary = PipelineSummary {
        characters_processed,
        ..Default::default()
    };
    let mut failed = Vec::new();
    for WriteOutcome { index, result } in outcomes {
        match result {
            Ok(report) => {
                summary.bytes_written += report.len as u64;
                summary.artifacts.push(report);
            }
            Err(error) => failed.push(FailedWrite { index, error }),
        }
    }
    summary.artifacts.sort_by_key(|a| a.index);
    summary.chunks_written = summary.artifacts.len();

    let report = PartialReport { summary, failed };
    match stop {
        Some(Stop::Source(source)) => Err(PipelineError::Source { source, report }),
        Some(Stop::Cancelled) => Err(PipelineError::Cancelled { report }),
        None if !report.failed.is_empty() => Err(PipelineError::Writes { report }),
        None => {
            log::info!(
                "finished: {} chunk(s) written, {} characters processed",
                report.summary.chunks_written,
                report.summary.characters_processed
            );
            Ok(report.summary)
        }
    }
}
