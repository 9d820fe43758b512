mod common;

use common::{options, read_artifacts, reconstruct_fixed, run_bytes};
use kira_fasta_chunker::{InputMode, MarkerSet, WritePolicy};
use std::fs;
use tempfile::tempdir;

const GENOME: &[u8] = b"\
>chr1 synthetic
ACGTNNNNACGTACGTTTGACNNAGCTAGCTAGGATCCANNNNNNNNGATTACAGATTACA
CCGGTTAANNACGTTGCAACGTNACGT
>chr2
NNNNNNNNNNGGGCCCAAATTTGGGCCCAAATTTNNNN
";

#[test]
fn worked_example_exact_bytes() {
    let dir = tempdir().unwrap();
    let opts = options(dir.path(), 5, 2, 3);
    let summary = run_bytes(b"AANNCGTNNAA\n", &opts);

    assert_eq!(summary.chunks_written, 3);
    assert_eq!(summary.characters_processed, 12);
    assert_eq!(
        read_artifacts(&summary),
        vec![b"AAC".to_vec(), b"CGTA".to_vec(), b"AA\n".to_vec()]
    );
    for (i, a) in summary.artifacts.iter().enumerate() {
        assert_eq!(a.path, dir.path().join(format!("chunk_{i}.txt")));
    }
}

#[test]
fn content_is_preserved_and_markers_removed() {
    let markers = MarkerSet::default();
    for (chunk, overlap) in [(7, 3), (16, 5), (10, 0), (3, 2), (64, 63)] {
        let dir = tempdir().unwrap();
        let opts = options(dir.path(), chunk, overlap, 4);
        let summary = run_bytes(GENOME, &opts);
        let arts = read_artifacts(&summary);

        for a in &arts {
            assert!(!a.contains(&b'N'), "marker left in artifact for chunk={chunk}");
        }
        let rebuilt = reconstruct_fixed(GENOME, &arts, chunk, overlap, &markers);
        assert_eq!(rebuilt, markers.clean(GENOME), "chunk={chunk} overlap={overlap}");
    }
}

#[test]
fn indices_are_contiguous_from_zero() {
    let dir = tempdir().unwrap();
    let opts = options(dir.path(), 9, 2, 4);
    let summary = run_bytes(GENOME, &opts);
    let idx: Vec<usize> = summary.artifacts.iter().map(|a| a.index).collect();
    let expected: Vec<usize> = (0..GENOME.len().div_ceil(9)).collect();
    assert_eq!(idx, expected);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), expected.len());
}

#[test]
fn zero_overlap_is_gap_free_partition() {
    let dir = tempdir().unwrap();
    let opts = options(dir.path(), 11, 0, 2);
    let summary = run_bytes(GENOME, &opts);
    let arts = read_artifacts(&summary);
    let markers = MarkerSet::default();
    let expected: Vec<Vec<u8>> = GENOME.chunks(11).map(|c| markers.clean(c)).collect();
    assert_eq!(arts, expected);
    assert_eq!(arts.concat(), markers.clean(GENOME));
}

#[test]
fn oversized_chunk_yields_single_artifact() {
    let dir = tempdir().unwrap();
    let opts = options(dir.path(), GENOME.len() * 2, 10, 4);
    let summary = run_bytes(GENOME, &opts);
    assert_eq!(summary.chunks_written, 1);
    assert_eq!(read_artifacts(&summary)[0], MarkerSet::default().clean(GENOME));
}

#[test]
fn worker_count_does_not_change_output() {
    let mut runs = Vec::new();
    for workers in [1, 4, 16] {
        let dir = tempdir().unwrap();
        let opts = options(dir.path(), 6, 2, workers);
        let summary = run_bytes(GENOME, &opts);
        let files: Vec<(String, Vec<u8>)> = summary
            .artifacts
            .iter()
            .map(|a| {
                let name = a.path.file_name().unwrap().to_string_lossy().into_owned();
                (name, fs::read(&a.path).unwrap())
            })
            .collect();
        runs.push(files);
    }
    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[0], runs[2]);
}

#[test]
fn empty_input_writes_nothing() {
    let dir = tempdir().unwrap();
    let opts = options(dir.path(), 8, 2, 2);
    let summary = run_bytes(b"", &opts);
    assert_eq!(summary.chunks_written, 0);
    assert_eq!(summary.characters_processed, 0);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn line_mode_skips_headers_and_cuts_on_cleaned_length() {
    let dir = tempdir().unwrap();
    let mut opts = options(dir.path(), 10, 3, 4);
    opts.input_mode = InputMode::Lines;
    let summary = run_bytes(GENOME, &opts);
    let arts = read_artifacts(&summary);

    let markers = MarkerSet::default();
    let stream: Vec<u8> = GENOME
        .split(|&b| b == b'\n')
        .filter(|l| !l.starts_with(b">"))
        .flat_map(|l| markers.clean(l))
        .collect();

    assert_eq!(arts[0].len(), 10);
    for a in &arts[1..arts.len() - 1] {
        assert_eq!(a.len(), 13);
    }
    let mut rebuilt = arts[0].clone();
    for a in &arts[1..] {
        rebuilt.extend_from_slice(&a[3..]);
    }
    assert_eq!(rebuilt, stream);
    assert!(arts.iter().all(|a| !a.contains(&b'>') && !a.contains(&b'\n')));
}

#[test]
fn line_mode_unwrapped_sequence_on_one_line() {
    let dir = tempdir().unwrap();
    let mut opts = options(dir.path(), 4096, 10, 4);
    opts.input_mode = InputMode::Lines;
    let mut input = b">chrU unwrapped\n".to_vec();
    let body: Vec<u8> = b"ACGTNGGCAT".iter().copied().cycle().take(1 << 20).collect();
    input.extend_from_slice(&body);
    input.push(b'\n');

    let summary = run_bytes(&input, &opts);
    let arts = read_artifacts(&summary);
    let cleaned = MarkerSet::default().clean(&body);

    assert_eq!(arts.len(), cleaned.len().div_ceil(4096));
    assert_eq!(summary.characters_processed, body.len() as u64);
    assert_eq!(arts[0].len(), 4096);
    let mut rebuilt = arts[0].clone();
    for a in &arts[1..] {
        rebuilt.extend_from_slice(&a[10..]);
    }
    assert_eq!(rebuilt, cleaned);
}

#[test]
fn custom_markers_prefix_and_direct_writes() {
    let dir = tempdir().unwrap();
    let mut opts = options(dir.path(), 4, 1, 2);
    opts.markers = MarkerSet::from_bytes(b"Nn");
    opts.output_prefix = "part".into();
    opts.extension = "seq".into();
    opts.write_policy = WritePolicy::Direct;
    let summary = run_bytes(b"acgnNNtt", &opts);
    assert_eq!(read_artifacts(&summary), vec![b"acg".to_vec(), b"tt".to_vec()]);
    assert_eq!(summary.artifacts[1].path, dir.path().join("part_1.seq"));
}

#[test]
fn output_dir_is_created() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let opts = options(&nested, 4, 0, 1);
    let summary = run_bytes(b"ACGTACGT", &opts);
    assert_eq!(summary.chunks_written, 2);
    assert!(nested.join("chunk_1.txt").exists());
}
