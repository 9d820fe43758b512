use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use kira_fasta_chunker::{
    ChunkerOptions, DrainPolicy, InputMode, MarkerSet, Pipeline, PipelineError, WritePolicy,
};

/// Split a FASTA/flat sequence file into overlapping chunks with masked bases removed.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input file (plain or .gz)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory for the chunk files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// File name stem; chunks are named PREFIX_INDEX.EXT
    #[arg(short, long, default_value = "output")]
    prefix: String,

    /// Chunk file extension (empty for none)
    #[arg(long, default_value = "txt")]
    ext: String,

    /// Characters per chunk
    #[arg(short, long, default_value_t = 10_000_000)]
    chunk_size: usize,

    /// Characters carried from the end of one chunk into the next
    #[arg(short = 'l', long, default_value_t = 100)]
    overlap: usize,

    /// Number of writer threads
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Pending writes allowed before reading pauses (default: 2 * threads)
    #[arg(long)]
    queue_depth: Option<usize>,

    /// Bytes stripped from the output
    #[arg(long, default_value = "N")]
    markers: String,

    /// Line-oriented input: skip '>' headers and newlines, size chunks after cleaning
    #[arg(long)]
    lines: bool,

    /// Write chunk files in place instead of temp-file-and-rename
    #[arg(long)]
    direct: bool,

    /// On a read error, drop queued writes instead of finishing them
    #[arg(long)]
    abort_on_error: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn options(&self) -> ChunkerOptions {
        ChunkerOptions {
            chunk_size: self.chunk_size,
            overlap_size: self.overlap,
            workers: self.threads,
            queue_depth: self.queue_depth,
            markers: MarkerSet::from_bytes(self.markers.as_bytes()),
            input_mode: if self.lines {
                InputMode::Lines
            } else {
                InputMode::Fixed
            },
            output_dir: self.output_dir.clone(),
            output_prefix: self.prefix.clone(),
            extension: self.ext.clone(),
            write_policy: if self.direct {
                WritePolicy::Direct
            } else {
                WritePolicy::Atomic
            },
            drain_policy: if self.abort_on_error {
                DrainPolicy::Abort
            } else {
                DrainPolicy::Drain
            },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let pipeline = Pipeline::new(args.options()).context("invalid options")?;
    match pipeline.run_path(&args.input) {
        Ok(summary) => {
            info!(
                "wrote {} chunk(s) ({} bytes) to {}; {} characters processed",
                summary.chunks_written,
                summary.bytes_written,
                args.output_dir.display(),
                summary.characters_processed
            );
            Ok(())
        }
        Err(e) => {
            if let Some(report) = e.report() {
                error!("written indices: {:?}", report.written_indices());
                for f in &report.failed {
                    error!("failed index {}: {}", f.index, f.error);
                }
            }
            if let PipelineError::Source { .. } = e {
                error!("input: {}", args.input.display());
            }
            Err(e.into())
        }
    }
}
