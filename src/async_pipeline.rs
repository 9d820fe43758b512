#![cfg(feature = "async")]

//! The same chunk-and-carry pipeline on tokio.
//!
//! Reads happen on the calling task. Each write runs on the blocking pool and
//! holds one semaphore permit, so at most `workers` writes are in flight and
//! the reader waits for a permit before dispatching more.

use crate::carry::OverlapState;
use crate::error::{IoContext, PartialReport, PipelineError, SinkError, SourceError};
use crate::pipeline::{CancellationToken, PipelineSummary, Stop, finish};
use crate::policy::{ChunkerOptions, DrainPolicy, InputMode};
use crate::pool::WriteOutcome;
use crate::reader::WindowCutter;
use crate::sink::{ArtifactReport, ArtifactSink, FileSink};
use crate::window::Window;

use async_compression::tokio::bufread::GzipDecoder;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Async window cursor (plain/.gz).
pub struct AsyncSourceReader {
    rdr: Box<dyn AsyncBufRead + Unpin + Send>,
    mode: InputMode,
    cut: WindowCutter,
}

impl AsyncSourceReader {
    /// Open async from path; `.gz` auto-detect by extension or magic bytes.
    pub async fn from_path<P: AsRef<Path>>(
        path: P,
        opts: &ChunkerOptions,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let mut f = File::open(path)
            .await
            .map_err(|e| SourceError::io_err(e, IoContext::default()))?;

        let is_gz = path.extension().and_then(|s| s.to_str()) == Some("gz")
            || looks_like_gzip_async(&mut f).await.unwrap_or(false);

        let rdr: Box<dyn AsyncBufRead + Unpin + Send> = if is_gz {
            let mut gz = GzipDecoder::new(BufReader::with_capacity(256 * 1024, f));
            gz.multiple_members(true);
            Box::new(BufReader::with_capacity(256 * 1024, gz))
        } else {
            Box::new(BufReader::with_capacity(256 * 1024, f))
        };

        Ok(Self::new(rdr, opts))
    }

    /// Wrap any async `AsyncBufRead`.
    pub fn from_async_bufread<R>(reader: R, opts: &ChunkerOptions) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        Self::new(Box::new(reader), opts)
    }

    fn new(rdr: Box<dyn AsyncBufRead + Unpin + Send>, opts: &ChunkerOptions) -> Self {
        Self {
            rdr,
            mode: opts.input_mode,
            cut: WindowCutter::new(opts),
        }
    }

    pub fn content_bytes(&self) -> u64 {
        self.cut.content_bytes()
    }

    /// Fetch next window (async).
    pub async fn next_window(&mut self) -> Result<Option<Window>, SourceError> {
        match self.mode {
            InputMode::Fixed => {
                if self.cut.eof {
                    return Ok(None);
                }
                let chunk_size = self.cut.chunk_size();
                let mut data = Vec::with_capacity(chunk_size);
                (&mut self.rdr)
                    .take(chunk_size as u64)
                    .read_to_end(&mut data)
                    .await
                    .map_err(|e| SourceError::io_err(e, self.cut.ctx()))?;
                Ok(self.cut.take_fixed(data))
            }
            InputMode::Lines => loop {
                if let Some(w) = self.cut.drain_full() {
                    return Ok(Some(w));
                }
                if self.cut.eof {
                    return Ok(self.cut.flush_remainder());
                }
                let buf = self
                    .rdr
                    .fill_buf()
                    .await
                    .map_err(|e| SourceError::io_err(e, self.cut.ctx()))?;
                let used = self.cut.push_segment(buf);
                self.rdr.consume(used);
            },
        }
    }
}

async fn looks_like_gzip_async(f: &mut File) -> io::Result<bool> {
    let pos = f.stream_position().await?;
    let mut magic = [0u8; 2];
    let n = f.read(&mut magic).await?;
    f.seek(SeekFrom::Start(pos)).await?;
    Ok(n >= 2 && magic == [0x1F, 0x8B])
}

/// Async driver; same semantics and errors as [`crate::Pipeline`].
pub struct AsyncPipeline {
    opts: ChunkerOptions,
    sink: Arc<dyn ArtifactSink>,
    cancel: CancellationToken,
}

impl AsyncPipeline {
    pub fn new(opts: ChunkerOptions) -> Result<Self, PipelineError> {
        let sink = Arc::new(FileSink::from_options(&opts));
        Self::with_sink(opts, sink)
    }

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

    pub async fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<PipelineSummary, PipelineError> {
        let reader = AsyncSourceReader::from_path(path, &self.opts)
            .await
            .map_err(|source| PipelineError::Source {
                source,
                report: PartialReport {
                    summary: PipelineSummary::default(),
                    failed: Vec::new(),
                },
            })?;
        self.run(reader).await
    }

    pub async fn run(&self, mut reader: AsyncSourceReader) -> Result<PipelineSummary, PipelineError> {
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.prepare())
            .await
            .map_err(|e| {
                log::error!("output preparation did not finish: {e}");
                PipelineError::Prepare(SinkError::WorkerLost)
            })??;

        let permits = Arc::new(Semaphore::new(self.opts.workers));
        let abort = Arc::new(AtomicBool::new(false));
        let mut overlap = OverlapState::new(self.opts.overlap_size);
        let mut tasks: Vec<(usize, JoinHandle<Result<ArtifactReport, SinkError>>)> = Vec::new();
        let mut stop = None;

        loop {
            if self.cancel.is_cancelled() {
                stop = Some(Stop::Cancelled);
                break;
            }
            let window = match reader.next_window().await {
                Ok(Some(w)) => w,
                Ok(None) => break,
                Err(e) => {
                    stop = Some(Stop::Source(e));
                    break;
                }
            };
            let payload = overlap.attach(&window.data);
            let cleaned = self.opts.markers.clean_owned(payload);

            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::PoolSpawn(std::io::Error::other(e)))?;
            let sink = Arc::clone(&self.sink);
            let abort_flag = Arc::clone(&abort);
            let index = window.index;
            let task = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                if abort_flag.load(Ordering::Acquire) {
                    return Err(SinkError::Aborted);
                }
                let result = sink.write(index, &cleaned);
                if let Err(e) = &result {
                    log::warn!("artifact {index} not written: {e}");
                }
                result
            });
            tasks.push((index, task));
        }

        if let Some(Stop::Source(e)) = &stop {
            log::error!("read failed, stopping after {} chunk(s): {e}", tasks.len());
        }
        if stop.is_some() && self.opts.drain_policy == DrainPolicy::Abort {
            abort.store(true, Ordering::Release);
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (index, task) in tasks {
            let result = task.await.unwrap_or(Err(SinkError::WorkerLost));
            outcomes.push(WriteOutcome { index, result });
        }
        finish(outcomes, reader.content_bytes(), stop)
    }
}
