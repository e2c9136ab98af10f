//! Integration tests for the dataset cursor and the filtering pass

use binned_core::{
    for_each_qualifying, ChunkedDataset, Dataset, DatasetSummary, OwnedChunk, ValueRanges,
};
use proptest::prelude::*;

/// Split `values` into chunks at the given cut points
fn rechunk(values: &[f64], cuts: &[usize]) -> ChunkedDataset {
    let mut cuts: Vec<usize> = cuts.iter().map(|&c| c % (values.len() + 1)).collect();
    cuts.sort_unstable();
    let mut dataset = ChunkedDataset::new();
    let mut start = 0;
    for cut in cuts {
        dataset.push(values[start..cut].to_vec());
        start = cut;
    }
    dataset.push(values[start..].to_vec());
    dataset
}

fn qualifying<D: Dataset<f64>>(dataset: &D) -> Vec<f64> {
    let mut out = Vec::new();
    for_each_qualifying(dataset, |v, _| out.push(v)).unwrap();
    out
}

proptest! {
    #[test]
    fn chunking_preserves_stream(
        values in prop::collection::vec(-1e6f64..1e6, 0..200),
        cuts in prop::collection::vec(0usize..400, 0..6),
    ) {
        let dataset = rechunk(&values, &cuts);
        prop_assert_eq!(qualifying(&dataset), values);
    }

    #[test]
    fn summary_is_chunking_invariant(
        values in prop::collection::vec(-1e3f64..1e3, 1..200),
        cuts in prop::collection::vec(0usize..400, 0..6),
    ) {
        let whole = DatasetSummary::compute(&values).unwrap().unwrap();
        let split = DatasetSummary::compute(&rechunk(&values, &cuts)).unwrap().unwrap();
        prop_assert_eq!(whole.npts, split.npts);
        prop_assert_eq!(whole.min, split.min);
        prop_assert_eq!(whole.max, split.max);
    }
}

#[test]
fn include_ranges_apply_across_chunks() {
    let mut dataset = ChunkedDataset::new();
    dataset.push(vec![0.5, 1.5, 2.5]).push(vec![3.5, 4.5]);
    let dataset = dataset.with_ranges(ValueRanges::include(vec![(1.0, 2.0), (4.0, 5.0)]).unwrap());
    assert_eq!(qualifying(&dataset), vec![1.5, 4.5]);
}

#[test]
fn masked_weighted_strided_chunk() {
    let chunk = OwnedChunk::new(vec![1.0, 99.0, 2.0, 99.0, 3.0, 99.0])
        .with_weights(vec![2.0, 1.0, 0.5, 1.0, 1.0, 1.0])
        .with_mask(vec![true, true, true, true, false, true])
        .with_stride(2);
    let dataset: ChunkedDataset = std::iter::once(chunk).collect();

    let mut seen = Vec::new();
    for_each_qualifying(&dataset, |v, w| seen.push((v, w))).unwrap();
    assert_eq!(seen, vec![(1.0, 2.0), (2.0, 0.5)]);
    assert!(dataset.is_weighted());
}
