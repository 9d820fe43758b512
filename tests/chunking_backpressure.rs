mod common;

use common::options;
use crossbeam_channel::{Receiver, bounded};
use kira_fasta_chunker::{ArtifactReport, ArtifactSink, FileSink, Pipeline, SinkError, SourceReader, WritePolicy};
use std::io::{self, BufReader, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

/// File sink whose writes wait until the gate sender is dropped.
struct GatedSink {
    inner: FileSink,
    gate: Receiver<()>,
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl ArtifactSink for GatedSink {
    fn prepare(&self) -> Result<(), SinkError> {
        self.inner.prepare()
    }

    fn write(&self, index: usize, content: &[u8]) -> Result<ArtifactReport, SinkError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _ = self.gate.recv();
        let report = self.inner.write(index, content);
        self.completed.fetch_add(1, Ordering::SeqCst);
        report
    }
}

/// Serves `len` bytes of sequence and counts what has been handed out.
struct CountingReader {
    remaining: usize,
    served: Arc<AtomicUsize>,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining);
        buf[..n].fill(b'A');
        self.remaining -= n;
        self.served.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }
}

fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn reading_runs_ahead_of_blocked_writes_until_queue_is_full() {
    const CHUNK: usize = 8;
    const WINDOWS: usize = 20;
    let workers = 2;
    let queue_depth = 3;

    let dir = tempdir().unwrap();
    let mut opts = options(dir.path(), CHUNK, 2, workers);
    opts.queue_depth = Some(queue_depth);

    let (open, gate) = bounded::<()>(0);
    let sink = Arc::new(GatedSink {
        inner: FileSink::new(dir.path(), "chunk", "txt", WritePolicy::Atomic),
        gate,
        started: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    });
    let served = Arc::new(AtomicUsize::new(0));
    // A one-byte buffer keeps the BufReader from reading ahead of the windows.
    let rdr = BufReader::with_capacity(
        1,
        CountingReader {
            remaining: CHUNK * WINDOWS,
            served: Arc::clone(&served),
        },
    );
    let reader = SourceReader::from_bufread(rdr, &opts);
    let pipeline = Pipeline::with_sink(opts, sink.clone()).unwrap();
    let driver = thread::spawn(move || pipeline.run(reader));

    // Writers hold two windows, the queue three, and the driver is stuck
    // submitting a sixth it has already read.
    let ahead = workers + queue_depth + 1;
    wait_for("reader to fill the queue", || {
        served.load(Ordering::SeqCst) == ahead * CHUNK && sink.started.load(Ordering::SeqCst) == workers
    });
    thread::sleep(Duration::from_millis(100));
    assert_eq!(served.load(Ordering::SeqCst), ahead * CHUNK, "reader did not block");
    assert_eq!(sink.started.load(Ordering::SeqCst), workers);
    assert_eq!(sink.completed.load(Ordering::SeqCst), 0);

    drop(open);
    let summary = driver.join().unwrap().unwrap();
    assert_eq!(summary.chunks_written, WINDOWS);
    assert_eq!(summary.characters_processed, (CHUNK * WINDOWS) as u64);
    assert_eq!(sink.completed.load(Ordering::SeqCst), WINDOWS);
}
