//! Exact quantiles by iterative histogram refinement
//!
//! The computer never loads more of the dataset than the configured budget.
//! Each round tallies one histogram per unresolved group of positions; the
//! bin holding a position is either small enough to materialize, or becomes
//! the range of a finer histogram in the next round. Extraction of resolved
//! bins rides along with the next counting pass, so a call costs roughly one
//! pass per refinement level no matter how many quantiles are requested.

use crate::extractor::{extract_all, RangeExtractor};
use crate::selector::CandidateBuffer;
use crate::snapshot::SortedSnapshot;
use crate::targets::{check_request, RankPlan, RankTarget};
use crate::traits::QuantileComputer;
use crate::{Error, Result};
use binned_core::{for_each_qualifying, Dataset, Numeric, QuantileConfig};
use binned_histogram::{BinCounter, BinDesc, BinLocation, BinRange, BinTally};
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace};

/// Counters describing the work done since construction or the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Full passes over the dataset
    pub passes: usize,
    /// Deepest refinement level reached (0 when the first histogram sufficed)
    pub refinement_rounds: usize,
    /// Bins materialized for selection
    pub extracted_bins: usize,
    /// Whole-dataset loads
    pub full_loads: usize,
    /// Histograms resolved because every value in range was identical
    pub uniform_hits: usize,
    /// Calls answered from the persisted snapshot without scanning
    pub snapshot_hits: usize,
}

impl ScanStats {
    /// Add up the counters of two computations
    pub fn merge(&mut self, other: ScanStats) {
        self.passes += other.passes;
        self.refinement_rounds = self.refinement_rounds.max(other.refinement_rounds);
        self.extracted_bins += other.extracted_bins;
        self.full_loads += other.full_loads;
        self.uniform_hits += other.uniform_hits;
        self.snapshot_hits += other.snapshot_hits;
    }
}

/// Positions still searched for inside one histogram
#[derive(Debug, Clone)]
struct Group<T: Numeric> {
    desc: BinDesc<T>,
    /// Total weight of all qualifying values below `desc`
    offset: f64,
    positions: Vec<u64>,
    depth: usize,
}

/// A bin waiting to be materialized
#[derive(Debug, Clone)]
struct Job<T: Numeric> {
    /// The histogram the bin belongs to
    desc: BinDesc<T>,
    bin: usize,
    offset: f64,
    positions: Vec<u64>,
    population: u64,
    depth: usize,
}

impl<T: Numeric> Job<T> {
    fn range(&self) -> BinRange<T> {
        self.desc.bin_range(self.bin)
    }
}

/// Histogram-refinement quantile computer bound to one dataset
pub struct ClassicalQuantileComputer<'d, T: Numeric, D: ?Sized> {
    dataset: &'d D,
    config: QuantileConfig,
    snapshot: Option<SortedSnapshot<T>>,
    stats: ScanStats,
}

impl<'d, T, D> ClassicalQuantileComputer<'d, T, D>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    pub fn new(dataset: &'d D, config: QuantileConfig) -> Self {
        Self {
            dataset,
            config,
            snapshot: None,
            stats: ScanStats::default(),
        }
    }

    /// A computer using [`QuantileConfig::default`]
    pub fn with_defaults(dataset: &'d D) -> Self {
        Self::new(dataset, QuantileConfig::default())
    }

    pub fn dataset(&self) -> &'d D {
        self.dataset
    }

    pub fn config(&self) -> &QuantileConfig {
        &self.config
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// The persisted sorted copy of the dataset, if one was kept
    pub fn snapshot(&self) -> Option<&SortedSnapshot<T>> {
        self.snapshot.as_ref()
    }

    /// Fold in work done on this computer's behalf, such as a nested
    /// computation over a derived dataset
    pub fn absorb_stats(&mut self, other: ScanStats) {
        self.stats.merge(other);
    }

    fn resolve_from_snapshot(snapshot: &SortedSnapshot<T>, targets: &[RankTarget]) -> Result<Vec<T>> {
        let plan = RankPlan::new(targets, snapshot.total_weight());
        plan.evaluate(|k| snapshot.value_at(k as f64))
    }

    /// Load everything in one pass and select directly
    fn resolve_in_memory(&mut self, targets: &[RankTarget], npts: u64) -> Result<Vec<T>> {
        let mut buffer = extract_all(self.dataset, self.config.max_buffer_len::<T>())?;
        self.stats.passes += 1;
        self.stats.full_loads += 1;

        let total = buffer.total_weight();
        if !(total > 0.0) {
            return Err(Error::EmptyData);
        }
        if buffer.len() as u64 != npts {
            return Err(binned_core::Error::count_mismatch(npts, buffer.len() as u64).into());
        }
        debug!(points = buffer.len(), total_weight = total, "loaded whole dataset");

        if self.config.persist_sorted {
            let snapshot = buffer.into_snapshot();
            let values = Self::resolve_from_snapshot(&snapshot, targets);
            self.snapshot = Some(snapshot);
            return values;
        }

        let plan = RankPlan::new(targets, total);
        let positions: Vec<f64> = plan.positions().iter().map(|&k| k as f64).collect();
        let selected = buffer.select(&positions)?;
        let found: BTreeMap<u64, T> = plan.positions().iter().copied().zip(selected).collect();
        plan.evaluate(|k| found.get(&k).copied())
    }

    fn resolve_by_refinement(
        &mut self,
        targets: &[RankTarget],
        npts: u64,
        min: T,
        max: T,
    ) -> Result<Vec<T>> {
        let top = BinDesc::spanning(min, max, self.config.effective_bins())?;
        let (tallies, _) = self.scan_round(std::slice::from_ref(&top), Vec::new())?;
        let tally = tallies.into_iter().next().ok_or(Error::EmptyData)?;

        let total = tally.total_weight();
        if !(total > 0.0) {
            return Err(Error::EmptyData);
        }
        // Values outside [min, max] are invisible to every histogram
        if tally.total_count() != npts {
            return Err(binned_core::Error::count_mismatch(npts, tally.total_count()).into());
        }
        let plan = RankPlan::new(targets, total);
        debug!(total_weight = total, positions = plan.positions().len(), "counted top-level histogram");

        let mut found: BTreeMap<u64, T> = BTreeMap::new();
        let mut groups = Vec::new();
        let mut jobs = Vec::new();
        let root = Group {
            desc: top,
            offset: 0.0,
            positions: plan.positions().to_vec(),
            depth: 0,
        };
        self.plan_group(root, &tally, &mut found, &mut groups, &mut jobs)?;

        let mut round = 1;
        while !groups.is_empty() || !jobs.is_empty() {
            self.fit_jobs(&mut jobs, &mut groups)?;
            debug!(
                round,
                histograms = groups.len(),
                extractions = jobs.len(),
                "starting pass"
            );

            let descs: Vec<BinDesc<T>> = groups.iter().map(|g| g.desc).collect();
            let ranges: Vec<BinRange<T>> = jobs.iter().map(Job::range).collect();
            let (tallies, buffers) = self.scan_round(&descs, ranges)?;

            for (job, mut buffer) in jobs.drain(..).zip(buffers) {
                let local: Vec<f64> = job.positions.iter().map(|&k| k as f64 - job.offset).collect();
                let values = buffer.select(&local)?;
                found.extend(job.positions.iter().copied().zip(values));
            }

            let current = std::mem::take(&mut groups);
            for (group, tally) in current.into_iter().zip(&tallies) {
                self.plan_group(group, tally, &mut found, &mut groups, &mut jobs)?;
            }
            round += 1;
        }

        plan.evaluate(|k| found.get(&k).copied())
    }

    /// Decide, for every bin holding a position, whether to resolve it,
    /// materialize it, or refine it further
    fn plan_group(
        &mut self,
        group: Group<T>,
        tally: &BinTally<T>,
        found: &mut BTreeMap<u64, T>,
        next: &mut Vec<Group<T>>,
        jobs: &mut Vec<Job<T>>,
    ) -> Result<()> {
        if let Some(value) = tally.uniform() {
            trace!(range = %group.desc, "uniform histogram");
            self.stats.uniform_hits += 1;
            found.extend(group.positions.iter().map(|&k| (k, value)));
            return Ok(());
        }

        let materialize = self.config.materialize_len::<T>() as u64;
        let max_buffer = self.config.max_buffer_len::<T>() as u64;

        let mut by_bin: BTreeMap<usize, (BinLocation, Vec<u64>)> = BTreeMap::new();
        for &k in &group.positions {
            let location = tally.locate(k as f64 - group.offset).ok_or(Error::EmptyData)?;
            by_bin
                .entry(location.bin)
                .or_insert_with(|| (location, Vec::new()))
                .1
                .push(k);
        }

        for (bin, (location, positions)) in by_bin {
            let job = Job {
                desc: group.desc,
                bin,
                offset: group.offset + location.weight_before,
                positions,
                population: location.count,
                depth: group.depth,
            };
            if job.population > materialize {
                match self.refine_job(job) {
                    Ok(child) => next.push(child),
                    Err(job) if job.population > max_buffer => {
                        return Err(Error::BufferOverflow {
                            population: job.population,
                            limit: max_buffer,
                        });
                    }
                    Err(job) => jobs.push(job),
                }
            } else {
                jobs.push(job);
            }
        }
        Ok(())
    }

    /// Turn a bin into a finer histogram, or hand it back when the refinement
    /// cap is reached or the bin cannot be split
    fn refine_job(&mut self, job: Job<T>) -> std::result::Result<Group<T>, Job<T>> {
        if job.depth >= self.config.max_refinements {
            return Err(job);
        }
        let Some(desc) = job.desc.refine(job.bin, self.config.effective_bins()) else {
            return Err(job);
        };
        let depth = job.depth + 1;
        self.stats.refinement_rounds = self.stats.refinement_rounds.max(depth);
        Ok(Group {
            desc,
            offset: job.offset,
            positions: job.positions,
            depth,
        })
    }

    /// Keep the bins extracted in one pass within the buffer cap
    ///
    /// While the pending bins hold more than the cap, the most populated ones
    /// are refined instead; their histograms are tallied in the same pass, so
    /// the pass count stays tied to refinement depth.
    fn fit_jobs(&mut self, jobs: &mut Vec<Job<T>>, groups: &mut Vec<Group<T>>) -> Result<()> {
        let limit = self.config.max_buffer_len::<T>() as u64;
        let mut planned: u64 = jobs.iter().map(|job| job.population).sum();
        if planned <= limit {
            return Ok(());
        }

        jobs.sort_by(|a, b| b.population.cmp(&a.population));
        let mut kept = Vec::with_capacity(jobs.len());
        for job in jobs.drain(..) {
            if planned <= limit {
                kept.push(job);
                continue;
            }
            let population = job.population;
            match self.refine_job(job) {
                Ok(child) => {
                    planned -= population;
                    groups.push(child);
                }
                Err(job) => kept.push(job),
            }
        }
        *jobs = kept;

        if planned > limit {
            return Err(Error::BufferOverflow {
                population: planned,
                limit,
            });
        }
        Ok(())
    }

    /// One pass: tally `descs` and extract `ranges` together
    fn scan_round(
        &mut self,
        descs: &[BinDesc<T>],
        ranges: Vec<BinRange<T>>,
    ) -> Result<(Vec<BinTally<T>>, Vec<CandidateBuffer<T>>)> {
        let mut counter = BinCounter::new(descs);
        let mut extractor = RangeExtractor::new(ranges, self.config.max_buffer_len::<T>());
        for_each_qualifying::<T, D, _>(self.dataset, |value, weight| {
            counter.observe(value, weight);
            extractor.offer(value, weight);
        })?;
        self.stats.passes += 1;

        let buffers = extractor.finish()?;
        self.stats.extracted_bins += buffers.len();
        Ok((counter.finish(), buffers))
    }
}

impl<'d, T, D> QuantileComputer<T> for ClassicalQuantileComputer<'d, T, D>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    #[instrument(level = "debug", skip(self, targets), fields(targets = targets.len()))]
    fn resolve(&mut self, targets: &[RankTarget], npts: u64, min: T, max: T) -> Result<Vec<T>> {
        check_request(targets, npts, min, max)?;
        self.config.validate()?;
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(snapshot) = &self.snapshot {
            let values = Self::resolve_from_snapshot(snapshot, targets);
            self.stats.snapshot_hits += 1;
            return values;
        }
        if min == max {
            debug!("degenerate range, every value equals min");
            return Ok(vec![min; targets.len()]);
        }

        if npts <= self.config.materialize_len::<T>() as u64 {
            return self.resolve_in_memory(targets, npts);
        }
        self.resolve_by_refinement(targets, npts, min, max)
    }

    fn reset(&mut self) {
        self.snapshot = None;
        self.stats = ScanStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use binned_core::{ChunkedDataset, OwnedChunk};

    fn tiny_budget(bins: usize) -> QuantileConfig {
        QuantileConfig::builder()
            .budget_bytes(8 * 4)
            .bin_count_hint(bins)
            .build()
            .unwrap()
    }

    #[test]
    fn test_small_odd_and_even_medians() {
        let odd = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        let mut computer = ClassicalQuantileComputer::with_defaults(&odd);
        assert_eq!(computer.median(5, 1.0, 5.0).unwrap(), 3.0);
        assert_eq!(computer.stats().full_loads, 1);

        let even = vec![4.0, 1.0, 3.0, 2.0];
        let mut computer = ClassicalQuantileComputer::with_defaults(&even);
        assert_eq!(computer.median(4, 1.0, 4.0).unwrap(), 2.5);
    }

    #[test]
    fn test_refinement_matches_sorted_positions() {
        let data: Vec<f64> = (0..200).map(|i| ((i * 73) % 200) as f64 * 0.5).collect();
        let mut computer = ClassicalQuantileComputer::new(&data, tiny_budget(4));
        let (median, quantiles) = computer
            .median_and_quantiles(&[0.1, 0.9], 200, 0.0, 99.5)
            .unwrap();
        // Sorted values are 0, 0.5, ..., 99.5
        assert_eq!(median, 49.75);
        assert_relative_eq!(quantiles[&0.1.into()], 9.95, epsilon = 1e-12);
        assert_relative_eq!(quantiles[&0.9.into()], 89.55, epsilon = 1e-12);

        let stats = computer.stats();
        assert!(stats.refinement_rounds >= 2, "{stats:?}");
        assert_eq!(stats.full_loads, 0);
        assert!(stats.extracted_bins >= 1);
    }

    #[test]
    fn test_degenerate_range_needs_no_scan() {
        let data = vec![3.0; 10];
        let mut computer = ClassicalQuantileComputer::new(&data, tiny_budget(4));
        assert_eq!(computer.median(10, 3.0, 3.0).unwrap(), 3.0);
        assert_eq!(computer.stats().passes, 0);
    }

    #[test]
    fn test_uniform_short_circuit() {
        let data = vec![7.0; 1000];
        let mut computer = ClassicalQuantileComputer::new(&data, tiny_budget(16));
        assert_eq!(computer.median(1000, 0.0, 10.0).unwrap(), 7.0);
        let stats = computer.stats();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.uniform_hits, 1);
        assert_eq!(stats.extracted_bins, 0);
    }

    #[test]
    fn test_unsplittable_bin_is_extracted_or_rejected() {
        // Two distinct values one ulp apart cannot be separated by refinement
        let lo = 1.0f64;
        let hi = f64::from_bits(lo.to_bits() + 1);
        let mut data = vec![lo; 30];
        data.extend(vec![hi; 30]);

        let config = QuantileConfig::builder()
            .budget_bytes(8 * 4)
            .max_buffer_bytes(8 * 100)
            .bin_count_hint(4)
            .build()
            .unwrap();
        let mut computer = ClassicalQuantileComputer::new(&data, config);
        assert_eq!(computer.quantiles(&[0.25], 60, lo, hi).unwrap()[&0.25.into()], lo);

        let strict = QuantileConfig::builder()
            .budget_bytes(8 * 4)
            .max_buffer_bytes(8 * 10)
            .bin_count_hint(4)
            .build()
            .unwrap();
        let mut computer = ClassicalQuantileComputer::new(&data, strict);
        let err = computer.median(60, lo, hi).unwrap_err();
        assert!(err.is_resource(), "{err}");
    }

    #[test]
    fn test_refinement_cap_falls_back_to_extraction() {
        let data: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let config = QuantileConfig::builder()
            .budget_bytes(8 * 2)
            .max_buffer_bytes(8 * 64)
            .bin_count_hint(2)
            .max_refinements(0)
            .build()
            .unwrap();
        let mut computer = ClassicalQuantileComputer::new(&data, config);
        assert_eq!(computer.median(64, 0.0, 63.0).unwrap(), 31.5);
        assert_eq!(computer.stats().refinement_rounds, 0);
    }

    #[test]
    fn test_weighted_refinement() {
        // Value i appears with weight i + 1
        let values: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let weights: Vec<f64> = (0..50).map(|i| (i + 1) as f64).collect();
        let chunk = OwnedChunk::new(values).with_weights(weights);
        let dataset: ChunkedDataset = std::iter::once(chunk).collect();

        let mut expanded = Vec::new();
        for i in 0..50u32 {
            expanded.extend(std::iter::repeat(i as f64).take(i as usize + 1));
        }
        let mut reference = ClassicalQuantileComputer::with_defaults(&expanded);
        let expected = reference
            .quantiles(&[0.2, 0.5, 0.8], expanded.len() as u64, 0.0, 49.0)
            .unwrap();

        let mut computer = ClassicalQuantileComputer::new(&dataset, tiny_budget(3));
        let got = computer.quantiles(&[0.2, 0.5, 0.8], 50, 0.0, 49.0).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_snapshot_reuse_and_reset() {
        let data: Vec<f64> = (1..=9).map(|i| i as f64).collect();
        let config = QuantileConfig::builder().persist_sorted(true).build().unwrap();
        let mut computer = ClassicalQuantileComputer::new(&data, config);
        assert_eq!(computer.median(9, 1.0, 9.0).unwrap(), 5.0);
        assert!(computer.snapshot().is_some());
        let passes = computer.stats().passes;

        let q = computer.quantiles(&[0.25, 0.75], 9, 1.0, 9.0).unwrap();
        assert_eq!(q[&0.25.into()], 3.0);
        assert_eq!(q[&0.75.into()], 7.0);
        assert_eq!(computer.stats().passes, passes);
        assert_eq!(computer.stats().snapshot_hits, 1);

        computer.reset();
        assert!(computer.snapshot().is_none());
        assert_eq!(computer.stats(), ScanStats::default());
    }

    #[test]
    fn test_validation_and_preconditions() {
        let data = vec![1.0, 2.0, 3.0];
        let mut computer = ClassicalQuantileComputer::with_defaults(&data);
        assert!(computer.quantiles(&[0.5, 0.0], 3, 1.0, 3.0).unwrap_err().is_validation());
        assert!(computer.quantiles(&[1.2], 3, 1.0, 3.0).unwrap_err().is_validation());
        assert!(computer.median(0, 1.0, 3.0).unwrap_err().is_precondition());
        assert!(computer.median(3, 3.0, 1.0).unwrap_err().is_precondition());
        assert_eq!(computer.stats().passes, 0);

        // Nothing qualifies although the caller claimed points
        let masked = OwnedChunk::new(vec![1.0, 2.0]).with_mask(vec![false, false]);
        let dataset: ChunkedDataset = std::iter::once(masked).collect();
        let mut computer = ClassicalQuantileComputer::with_defaults(&dataset);
        assert!(matches!(computer.median(2, 1.0, 2.0), Err(Error::EmptyData)));
    }

    /// A cursor that yields weighted chunks but keeps the default flags
    struct Unflagged(Vec<f64>, Vec<f64>);

    impl Dataset<f64> for Unflagged {
        fn scan(
            &self,
            visit: &mut dyn FnMut(binned_core::Chunk<'_, f64>) -> binned_core::Result<()>,
        ) -> binned_core::Result<()> {
            visit(binned_core::Chunk::new(&self.0).with_weights(&self.1))
        }
    }

    #[test]
    fn test_weights_detected_from_chunks() {
        let dataset = Unflagged(vec![1.0, 2.0, 10.0], vec![1.0, 8.0, 1.0]);
        assert!(!dataset.is_weighted());
        // Total weight 10: value 2 covers positions [1, 9)
        let in_memory = ClassicalQuantileComputer::with_defaults(&dataset)
            .quantiles(&[0.8, 0.9], 3, 1.0, 10.0)
            .unwrap();
        assert_eq!(in_memory[&0.8.into()], 2.0);
        assert_relative_eq!(in_memory[&0.9.into()], 2.8, epsilon = 1e-9);

        let config = QuantileConfig::builder()
            .budget_bytes(8 * 2)
            .bin_count_hint(4)
            .build()
            .unwrap();
        let mut computer = ClassicalQuantileComputer::new(&dataset, config);
        let refined = computer.quantiles(&[0.8, 0.9], 3, 1.0, 10.0).unwrap();
        assert_eq!(computer.stats().full_loads, 0);
        assert_eq!(refined[&0.8.into()], 2.0);
        assert_relative_eq!(refined[&0.9.into()], 2.8, epsilon = 1e-9);
    }

    #[test]
    fn test_claimed_count_must_match_data() {
        let data: Vec<f64> = (0..200).map(|i| ((i * 73) % 200) as f64 * 0.5).collect();

        // An understated max hides the values above it from every histogram
        let mut computer = ClassicalQuantileComputer::new(&data, tiny_budget(4));
        let err = computer.median(200, 0.0, 90.0).unwrap_err();
        assert!(err.is_precondition(), "{err}");

        let mut computer = ClassicalQuantileComputer::new(&data, tiny_budget(4));
        assert!(computer.median(150, 0.0, 99.5).unwrap_err().is_precondition());

        let mut computer = ClassicalQuantileComputer::with_defaults(&data);
        assert!(computer.median(199, 0.0, 99.5).unwrap_err().is_precondition());
        assert_eq!(computer.median(200, 0.0, 99.5).unwrap(), 49.75);
    }

    #[test]
    fn test_many_targets_refine_instead_of_queueing() {
        let data: Vec<f64> = (0..4000).map(|i| ((i * 1237) % 4000) as f64).collect();
        let config = QuantileConfig::builder()
            .budget_bytes(8 * 16)
            .bin_count_hint(8)
            .build()
            .unwrap();

        let mut single = ClassicalQuantileComputer::new(&data, config);
        assert_eq!(single.median(4000, 0.0, 3999.0).unwrap(), 1999.5);
        let single_passes = single.stats().passes;

        let fractions: Vec<f64> = (1..40).map(|i| i as f64 / 40.0).collect();
        let mut many = ClassicalQuantileComputer::new(&data, config);
        let got = many.quantiles(&fractions, 4000, 0.0, 3999.0).unwrap();
        for &fraction in &fractions {
            assert_relative_eq!(got[&fraction.into()], fraction * 3999.0, epsilon = 1e-9);
        }
        let stats = many.stats();
        assert!(stats.passes <= single_passes + 2, "{stats:?} vs {single_passes}");
        assert_eq!(stats.full_loads, 0);
    }
}
