//! Median absolute deviation about the median (MAD)
//!
//! MAD needs the median first. The deviations `|x - median|` are then treated
//! as a new virtual dataset ([`AbsDeviation`]) and the same histogram
//! refinement resolves its median, so the whole computation stays within the
//! configured memory bounds and costs one extra resolution.

use crate::adapters::AbsDeviation;
use binned_core::{Dataset, Numeric, QuantileConfig};
use binned_quantile::{
    CandidateBuffer, ClassicalQuantileComputer, Error, QuantileComputer, RankPlan, RankTarget,
    Result, ScanStats, SortedSnapshot,
};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// MAD resolution on a quantile computer
pub trait MedianAbsDevMed<T: Numeric = f64> {
    /// Median and MAD together
    fn median_and_mad(&mut self, npts: u64, min: T, max: T) -> Result<(T, T)>;

    /// Median of `|x - median(x)|`
    fn median_abs_dev_med(&mut self, npts: u64, min: T, max: T) -> Result<T> {
        Ok(self.median_and_mad(npts, min, max)?.1)
    }
}

impl<'d, T, D> MedianAbsDevMed<T> for ClassicalQuantileComputer<'d, T, D>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    #[instrument(level = "debug", skip(self))]
    fn median_and_mad(&mut self, npts: u64, min: T, max: T) -> Result<(T, T)> {
        let median = self.median(npts, min, max)?;

        if let Some(snapshot) = self.snapshot() {
            let mad = mad_from_snapshot(snapshot, median)?;
            self.absorb_stats(ScanStats {
                snapshot_hits: 1,
                ..ScanStats::default()
            });
            return Ok((median, mad));
        }

        let deviations = AbsDeviation::new(self.dataset(), median);
        let max_deviation = deviations.max_deviation(min, max);
        let mut inner = ClassicalQuantileComputer::new(&deviations, *self.config());
        let mad = inner.median(npts, T::zero(), max_deviation)?;
        debug!(
            "MAD {} about median {}, {} extra passes",
            mad,
            median,
            inner.stats().passes
        );
        self.absorb_stats(inner.stats());
        Ok((median, mad))
    }
}

/// MAD read from a sorted snapshot without touching the dataset
fn mad_from_snapshot<T: Numeric>(snapshot: &SortedSnapshot<T>, median: T) -> Result<T> {
    let mut buffer = CandidateBuffer::new();
    for (value, weight) in snapshot.iter() {
        buffer.push((value - median).abs(), weight);
    }
    let plan = RankPlan::new(&[RankTarget::Median], buffer.total_weight());
    let positions: Vec<f64> = plan.positions().iter().map(|&k| k as f64).collect();
    let selected = buffer.select(&positions)?;
    let found: BTreeMap<u64, T> = plan.positions().iter().copied().zip(selected).collect();
    plan.evaluate(|k| found.get(&k).copied())?
        .pop()
        .ok_or(Error::EmptyData)
}

/// Median absolute deviation about the median, out of core
///
/// Holds only the configuration; every call binds a fresh computer to the
/// dataset it is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MedianAbsDeviation {
    config: QuantileConfig,
}

impl MedianAbsDeviation {
    pub fn new(config: QuantileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QuantileConfig {
        &self.config
    }

    /// MAD of `dataset`
    pub fn estimate<T, D>(&self, dataset: &D, npts: u64, min: T, max: T) -> Result<T>
    where
        T: Numeric,
        D: Dataset<T> + ?Sized,
    {
        Ok(self.estimate_with_median(dataset, npts, min, max)?.1)
    }

    /// Median and MAD of `dataset`
    pub fn estimate_with_median<T, D>(&self, dataset: &D, npts: u64, min: T, max: T) -> Result<(T, T)>
    where
        T: Numeric,
        D: Dataset<T> + ?Sized,
    {
        ClassicalQuantileComputer::<T, D>::new(dataset, self.config).median_and_mad(npts, min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binned_core::{ChunkedDataset, DatasetSummary, OwnedChunk};

    fn coarse() -> QuantileConfig {
        QuantileConfig::builder()
            .budget_bytes(8 * 8)
            .bin_count_hint(4)
            .build()
            .unwrap()
    }

    #[test]
    fn test_small_mad() {
        // Median 3, deviations 2, 1, 0, 1, 2 -> MAD 1
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let mad = MedianAbsDeviation::default();
        assert_eq!(mad.estimate_with_median(&data, 5, 1.0, 5.0).unwrap(), (3.0, 1.0));
    }

    #[test]
    fn test_outlier_does_not_move_mad() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 100.0];
        let mad = MedianAbsDeviation::new(coarse());
        assert_eq!(mad.estimate(&data, 5, 1.0, 100.0).unwrap(), 1.0);
    }

    #[test]
    fn test_refined_mad_matches_in_memory() {
        let data: Vec<f64> = (0..500).map(|i| ((i * 211) % 500) as f64 * 0.1).collect();
        // 499 * 0.1 rounds above 49.9, so take the extent from the data
        let s = DatasetSummary::compute(&data).unwrap().unwrap();
        let in_memory = MedianAbsDeviation::default().estimate(&data, s.npts, s.min, s.max).unwrap();
        let refined = MedianAbsDeviation::new(coarse()).estimate(&data, s.npts, s.min, s.max).unwrap();
        assert_eq!(in_memory, refined);

        // The literal extent hides the largest value from refinement
        let err = MedianAbsDeviation::new(coarse()).estimate(&data, 500, 0.0, 49.9).unwrap_err();
        assert!(err.is_precondition(), "{err}");
        // Values 0.0..49.9, median 24.95, deviations are 0.05, 0.05, 0.15, ...
        assert!((refined - 12.5).abs() < 1e-9, "{refined}");
    }

    #[test]
    fn test_constant_data_mad_without_extraction() {
        let data = vec![7.0; 1000];
        let mut computer = ClassicalQuantileComputer::new(&data, coarse());
        let (median, mad) = computer.median_and_mad(1000, 0.0, 10.0).unwrap();
        assert_eq!((median, mad), (7.0, 0.0));
        let stats = computer.stats();
        assert_eq!(stats.extracted_bins, 0);
        assert_eq!(stats.uniform_hits, 2);
    }

    #[test]
    fn test_snapshot_mad_needs_no_scan() {
        let data = vec![9.0, 1.0, 5.0, 3.0, 7.0];
        let config = QuantileConfig::builder().persist_sorted(true).build().unwrap();
        let mut computer = ClassicalQuantileComputer::new(&data, config);
        assert_eq!(computer.median(5, 1.0, 9.0).unwrap(), 5.0);
        let passes = computer.stats().passes;

        // Deviations 4, 4, 0, 2, 2 -> MAD 2
        assert_eq!(computer.median_abs_dev_med(5, 1.0, 9.0).unwrap(), 2.0);
        assert_eq!(computer.stats().passes, passes);
    }

    #[test]
    fn test_weighted_mad() {
        // Expands to [1, 2, 2, 2, 10]: median 2, deviations 1, 0, 0, 0, 8 -> MAD 0
        let chunk = OwnedChunk::new(vec![1.0, 2.0, 10.0]).with_weights(vec![1.0, 3.0, 1.0]);
        let dataset: ChunkedDataset = std::iter::once(chunk).collect();
        let mad = MedianAbsDeviation::default();
        assert_eq!(mad.estimate_with_median(&dataset, 3, 1.0, 10.0).unwrap(), (2.0, 0.0));
    }
}
