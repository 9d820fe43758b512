//! Bounded pool of artifact writers.
//!
//! Architecture follows a classic producer/worker split:
//! 1. The driver submits `(index, payload)` jobs into a bounded queue
//! 2. `workers` threads pull jobs and hand them to the sink
//! 3. Each job replies on its own one-shot channel, which backs the [`WriteHandle`]
//!
//! A full queue blocks `submit`, which throttles the reader instead of letting
//! pending payloads pile up in memory. Completion order is unconstrained.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::error::SinkError;
use crate::sink::{ArtifactReport, ArtifactSink};

struct Job {
    index: usize,
    payload: Vec<u8>,
    reply: Sender<Result<ArtifactReport, SinkError>>,
}

/// Pending result of one submitted write.
#[derive(Debug)]
pub struct WriteHandle {
    index: usize,
    rx: Receiver<Result<ArtifactReport, SinkError>>,
}

impl WriteHandle {
    /// Blocks until the write finishes. A worker that died mid-job reports `WorkerLost`.
    pub fn wait(self) -> WriteOutcome {
        let result = self.rx.recv().unwrap_or(Err(SinkError::WorkerLost));
        WriteOutcome {
            index: self.index,
            result,
        }
    }
}

#[derive(Debug)]
pub struct WriteOutcome {
    pub index: usize,
    pub result: Result<ArtifactReport, SinkError>,
}

pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    abort: Arc<AtomicBool>,
    submitted: Vec<usize>,
}

impl WorkerPool {
    /// Spawns `workers` writer threads behind a queue of `queue_depth` jobs.
    ///
    /// # Errors
    ///
    /// Returns an error if a thread cannot be spawned; threads already started are joined.
    pub fn new(
        workers: usize,
        queue_depth: usize,
        sink: Arc<dyn ArtifactSink>,
    ) -> io::Result<Self> {
        let (tx, rx) = bounded::<Job>(queue_depth.max(1));
        let abort = Arc::new(AtomicBool::new(false));

        let mut pool = Self {
            tx: Some(tx),
            workers: Vec::with_capacity(workers),
            abort: Arc::clone(&abort),
            submitted: Vec::new(),
        };

        for i in 0..workers.max(1) {
            let rx = rx.clone();
            let sink = Arc::clone(&sink);
            let abort = Arc::clone(&abort);
            let handle = thread::Builder::new()
                .name(format!("chunk-writer-{i}"))
                .spawn(move || Self::worker_loop(&rx, sink.as_ref(), &abort))?;
            pool.workers.push(handle);
        }

        Ok(pool)
    }

    fn worker_loop(rx: &Receiver<Job>, sink: &dyn ArtifactSink, abort: &AtomicBool) {
        while let Ok(job) = rx.recv() {
            let result = if abort.load(Ordering::Acquire) {
                Err(SinkError::Aborted)
            } else {
                sink.write(job.index, &job.payload)
            };
            if let Err(e) = &result {
                log::warn!("artifact {} not written: {e}", job.index);
            }
            // The driver may have stopped listening; nothing to do then.
            let _ = job.reply.send(result);
        }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Queues a write, blocking while the queue is full.
    pub fn submit(&mut self, index: usize, payload: Vec<u8>) -> WriteHandle {
        let (reply, rx) = bounded(1);
        debug_assert!(
            self.submitted.last().is_none_or(|&last| last < index),
            "indices must be submitted in increasing order"
        );
        self.submitted.push(index);

        let job = Job {
            index,
            payload,
            reply,
        };
        if let Some(tx) = &self.tx {
            // On failure the job (and its reply sender) is dropped, so the handle reports WorkerLost.
            if tx.send(job).is_err() {
                log::error!("no writer available for artifact {index}");
            }
        }
        WriteHandle { index, rx }
    }

    /// Indices in the order they were submitted.
    pub fn submitted(&self) -> &[usize] {
        &self.submitted
    }

    /// Queued jobs that have not started yet will report `Aborted` instead of writing.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    /// Barrier over every handle, in the order given.
    pub fn await_all(handles: impl IntoIterator<Item = WriteHandle>) -> Vec<WriteOutcome> {
        handles.into_iter().map(WriteHandle::wait).collect()
    }

    /// Closes the queue and joins all workers.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        drop(self.tx.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("writer thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}
