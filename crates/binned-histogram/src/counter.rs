//! Single-pass tally of many histograms at once
//!
//! [`BinCounter`] accumulates, for every descriptor, the weighted and raw
//! population of each bin plus whether every value seen inside the
//! descriptor's range was identical. All descriptors are fed from the same
//! stream of qualifying values, so resolving several rank targets together
//! costs no more scans than resolving one.

use crate::descriptor::BinDesc;
use binned_core::{for_each_qualifying, Dataset, Numeric, Result};
use tracing::trace;

/// Where a weighted order position falls within a tally
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinLocation {
    pub bin: usize,
    /// Total weight of all bins before `bin`
    pub weight_before: f64,
    /// Weight of `bin` itself
    pub weight: f64,
    /// Number of elements in `bin`
    pub count: u64,
}

/// Per-bin populations of one histogram after a pass
#[derive(Debug, Clone, PartialEq)]
pub struct BinTally<T: Numeric = f64> {
    weights: Vec<f64>,
    counts: Vec<u64>,
    uniform: Option<T>,
}

impl<T: Numeric> BinTally<T> {
    /// Weighted population of each bin
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of elements in each bin
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// The common value when every counted element was identical
    pub fn uniform(&self) -> Option<T> {
        self.uniform
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Find the bin holding weighted position `position` (0-based, relative
    /// to this histogram's lower edge)
    ///
    /// Bins are walked left to right; a position equal to a cumulative
    /// boundary belongs to the higher bin. A position past the total weight
    /// (accumulated rounding) maps to the last occupied bin. Returns `None`
    /// only for an empty tally.
    pub fn locate(&self, position: f64) -> Option<BinLocation> {
        let mut before = 0.0;
        let mut last_occupied = None;
        for (bin, (&weight, &count)) in self.weights.iter().zip(&self.counts).enumerate() {
            if count == 0 {
                continue;
            }
            let location = BinLocation {
                bin,
                weight_before: before,
                weight,
                count,
            };
            if position < before + weight {
                return Some(location);
            }
            before += weight;
            last_occupied = Some(location);
        }
        last_occupied
    }
}

#[derive(Debug, Clone)]
struct TallyState<T> {
    weights: Vec<f64>,
    counts: Vec<u64>,
    first: Option<T>,
    all_same: bool,
}

impl<T: Numeric> TallyState<T> {
    fn new(n_bins: usize) -> Self {
        Self {
            weights: vec![0.0; n_bins],
            counts: vec![0; n_bins],
            first: None,
            all_same: true,
        }
    }

    #[inline]
    fn record(&mut self, bin: usize, value: T, weight: f64) {
        self.weights[bin] += weight;
        self.counts[bin] += 1;
        match self.first {
            None => self.first = Some(value),
            Some(first) if self.all_same && first != value => self.all_same = false,
            Some(_) => {}
        }
    }

    fn finish(self) -> BinTally<T> {
        BinTally {
            weights: self.weights,
            counts: self.counts,
            uniform: if self.all_same { self.first } else { None },
        }
    }
}

/// Accumulates bin populations for a set of histograms
///
/// Descriptors may overlap; a value is counted in every histogram whose range
/// holds it. When the descriptors are pairwise disjoint (the usual case during
/// refinement) each value is routed with a binary search instead of testing
/// every histogram.
#[derive(Debug, Clone)]
pub struct BinCounter<'a, T: Numeric = f64> {
    descs: &'a [BinDesc<T>],
    states: Vec<TallyState<T>>,
    /// Descriptor indices ordered by lower edge, present when disjoint
    disjoint_order: Option<Vec<usize>>,
    lower_edges: Vec<T>,
}

impl<'a, T: Numeric> BinCounter<'a, T> {
    pub fn new(descs: &'a [BinDesc<T>]) -> Self {
        let states = descs.iter().map(|d| TallyState::new(d.n_bins())).collect();

        let mut order: Vec<usize> = (0..descs.len()).collect();
        order.sort_by(|&a, &b| descs[a].min_limit().order_cmp(&descs[b].min_limit()));
        let disjoint = order.windows(2).all(|pair| {
            let left = &descs[pair[0]];
            let right = &descs[pair[1]];
            left.max_limit() < right.min_limit()
                || (left.max_limit() == right.min_limit() && !left.is_closed())
        });
        let (disjoint_order, lower_edges) = if disjoint && descs.len() > 1 {
            let edges = order.iter().map(|&i| descs[i].min_limit()).collect();
            (Some(order), edges)
        } else {
            (None, Vec::new())
        };

        Self {
            descs,
            states,
            disjoint_order,
            lower_edges,
        }
    }

    /// Count one qualifying value
    #[inline]
    pub fn observe(&mut self, value: T, weight: f64) {
        match &self.disjoint_order {
            Some(order) => {
                let pos = self.lower_edges.partition_point(|&lo| lo <= value);
                if pos == 0 {
                    return;
                }
                let d = order[pos - 1];
                if let Some(bin) = self.descs[d].bin_index(value) {
                    self.states[d].record(bin, value, weight);
                }
            }
            None => {
                for (desc, state) in self.descs.iter().zip(self.states.iter_mut()) {
                    if let Some(bin) = desc.bin_index(value) {
                        state.record(bin, value, weight);
                    }
                }
            }
        }
    }

    /// Tallies in descriptor order
    pub fn finish(self) -> Vec<BinTally<T>> {
        self.states.into_iter().map(TallyState::finish).collect()
    }
}

/// Run one pass over `dataset` and tally every descriptor
pub fn count_bins<T, D>(dataset: &D, descs: &[BinDesc<T>]) -> Result<Vec<BinTally<T>>>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    let mut counter = BinCounter::new(descs);
    for_each_qualifying::<T, D, _>(dataset, |value, weight| counter.observe(value, weight))?;
    let tallies = counter.finish();
    trace!(
        histograms = descs.len(),
        uniform = tallies.iter().filter(|t| t.uniform().is_some()).count(),
        "counted bins"
    );
    Ok(tallies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use binned_core::{ChunkedDataset, OwnedChunk};

    #[test]
    fn test_single_histogram_counts() {
        let data = vec![0.0, 1.0, 2.0, 2.0, 9.9, 10.0];
        let desc = BinDesc::spanning(0.0, 10.0, 5).unwrap();
        let tallies = count_bins(&data, &[desc]).unwrap();
        assert_eq!(tallies[0].counts(), &[2, 2, 0, 0, 2]);
        assert_eq!(tallies[0].total_weight(), 6.0);
        assert_eq!(tallies[0].uniform(), None);
    }

    #[test]
    fn test_values_outside_are_ignored_per_histogram() {
        let data = vec![0.5, 1.5, 2.5, 3.5];
        let descs = [
            BinDesc::half_open(0.0, 2.0, 2).unwrap(),
            BinDesc::half_open(2.0, 4.0, 2).unwrap(),
        ];
        let tallies = count_bins(&data, &descs).unwrap();
        assert_eq!(tallies[0].counts(), &[1, 1]);
        assert_eq!(tallies[1].counts(), &[1, 1]);
    }

    #[test]
    fn test_overlapping_histograms_both_count() {
        let data = vec![1.0, 2.0, 3.0];
        let descs = [
            BinDesc::spanning(0.0, 4.0, 2).unwrap(),
            BinDesc::spanning(1.0, 3.0, 2).unwrap(),
        ];
        let tallies = count_bins(&data, &descs).unwrap();
        assert_eq!(tallies[0].total_count(), 3);
        assert_eq!(tallies[1].counts(), &[1, 2]);
    }

    #[test]
    fn test_uniform_detection() {
        let data = vec![7.0; 1000];
        let desc = BinDesc::spanning(0.0, 10.0, 4).unwrap();
        let tallies = count_bins(&data, &[desc]).unwrap();
        assert_eq!(tallies[0].uniform(), Some(7.0));

        let mixed = vec![7.0, 7.0, 7.5];
        let tallies = count_bins(&mixed, &[desc]).unwrap();
        assert_eq!(tallies[0].uniform(), None);

        // Values outside the range do not break uniformity
        let narrow = BinDesc::half_open(6.0, 7.25, 4).unwrap();
        let tallies = count_bins(&mixed, &[narrow]).unwrap();
        assert_eq!(tallies[0].uniform(), Some(7.0));
    }

    #[test]
    fn test_weighted_tally_and_locate() {
        let chunk = OwnedChunk::new(vec![0.5, 1.5, 2.5, 3.5]).with_weights(vec![1.0, 3.0, 0.5, 2.0]);
        let dataset: ChunkedDataset = std::iter::once(chunk).collect();
        let desc = BinDesc::spanning(0.0, 4.0, 4).unwrap();
        let tally = count_bins(&dataset, &[desc]).unwrap().remove(0);
        assert_eq!(tally.weights(), &[1.0, 3.0, 0.5, 2.0]);

        assert_eq!(tally.locate(0.0).unwrap().bin, 0);
        // Exactly on a cumulative boundary goes to the higher bin
        assert_eq!(tally.locate(1.0).unwrap().bin, 1);
        let loc = tally.locate(4.2).unwrap();
        assert_eq!(loc.bin, 2);
        assert_eq!(loc.weight_before, 4.0);
        // Past the end falls back to the last occupied bin
        assert_eq!(tally.locate(100.0).unwrap().bin, 3);
    }

    #[test]
    fn test_locate_skips_empty_bins() {
        let data = vec![0.5, 3.5];
        let desc = BinDesc::spanning(0.0, 4.0, 4).unwrap();
        let tally = count_bins(&data, &[desc]).unwrap().remove(0);
        let loc = tally.locate(1.0).unwrap();
        assert_eq!(loc.bin, 3);
        assert_eq!(loc.weight_before, 1.0);

        let empty: Vec<f64> = vec![];
        let tally = count_bins(&empty, &[desc]).unwrap().remove(0);
        assert!(tally.locate(0.0).is_none());
    }

    #[test]
    fn test_disjoint_routing_matches_linear_routing() {
        let data: Vec<f64> = (0..500).map(|i| (i as f64 * 0.37).sin() * 10.0).collect();
        let parent = BinDesc::spanning(-10.0, 10.0, 8).unwrap();
        let children: Vec<_> = [1, 3, 6].iter().map(|&i| parent.refine(i, 5).unwrap()).collect();

        let routed = count_bins(&data, &children).unwrap();
        for (child, tally) in children.iter().zip(&routed) {
            let alone = count_bins(&data, std::slice::from_ref(child)).unwrap().remove(0);
            assert_eq!(&alone, tally);
        }
    }
}
