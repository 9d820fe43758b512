#![allow(dead_code)]

use kira_fasta_chunker::{ChunkerOptions, MarkerSet, Pipeline, PipelineSummary, SourceReader, carry};
use std::fs;
use std::io::Cursor;
use std::path::Path;

pub fn options(dir: &Path, chunk_size: usize, overlap_size: usize, workers: usize) -> ChunkerOptions {
    ChunkerOptions {
        chunk_size,
        overlap_size,
        workers,
        output_dir: dir.to_path_buf(),
        output_prefix: "chunk".into(),
        ..Default::default()
    }
}

pub fn run_bytes(input: &[u8], opts: &ChunkerOptions) -> PipelineSummary {
    let pipeline = Pipeline::new(opts.clone()).unwrap();
    let reader = SourceReader::from_bufread(Cursor::new(input.to_vec()), opts);
    pipeline.run(reader).unwrap()
}

pub fn read_artifacts(summary: &PipelineSummary) -> Vec<Vec<u8>> {
    summary
        .artifacts
        .iter()
        .map(|a| fs::read(&a.path).unwrap())
        .collect()
}

/// Rebuilds the cleaned stream from fixed-mode artifacts by dropping each
/// artifact's carried prefix.
pub fn reconstruct_fixed(
    input: &[u8],
    artifacts: &[Vec<u8>],
    chunk_size: usize,
    overlap_size: usize,
    markers: &MarkerSet,
) -> Vec<u8> {
    let raw: Vec<&[u8]> = input.chunks(chunk_size).collect();
    assert_eq!(raw.len(), artifacts.len());
    let mut out = Vec::new();
    for (i, art) in artifacts.iter().enumerate() {
        let skip = if i == 0 {
            0
        } else {
            markers.clean(carry(raw[i - 1], overlap_size)).len()
        };
        out.extend_from_slice(&art[skip..]);
    }
    out
}
