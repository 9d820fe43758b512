mod common;

use common::{options, read_artifacts, reconstruct_fixed, run_bytes};
use kira_fasta_chunker::MarkerSet;
use proptest::prelude::*;
use tempfile::tempdir;

fn sequence() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"ACGTN\n".to_vec()), 0..300)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn artifacts_rebuild_cleaned_input(
        input in sequence(),
        chunk in 1usize..40,
        overlap_frac in 0.0f64..1.0,
        workers in 1usize..6,
    ) {
        let overlap = ((chunk as f64) * overlap_frac) as usize;
        let overlap = overlap.min(chunk - 1);
        let dir = tempdir().unwrap();
        let opts = options(dir.path(), chunk, overlap, workers);
        let summary = run_bytes(&input, &opts);
        let arts = read_artifacts(&summary);
        let markers = MarkerSet::default();

        prop_assert_eq!(arts.len(), input.len().div_ceil(chunk));
        for (i, a) in summary.artifacts.iter().enumerate() {
            prop_assert_eq!(a.index, i);
        }
        for a in &arts {
            prop_assert!(!a.contains(&b'N'));
        }
        let rebuilt = reconstruct_fixed(&input, &arts, chunk, overlap, &markers);
        prop_assert_eq!(rebuilt, markers.clean(&input));
    }
}
