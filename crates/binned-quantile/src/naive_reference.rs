//! Naive reference strategy: load everything, sort, read positions
//!
//! This strategy is intentionally simple and makes no attempt to bound
//! memory. It shares the position and interpolation rules with the
//! histogram-refinement computer but none of its binning, which makes it the
//! oracle for verifying that computer. Prefer it only when the whole dataset
//! comfortably fits in memory and many calls will follow.

use crate::selector::CandidateBuffer;
use crate::snapshot::SortedSnapshot;
use crate::targets::{check_request, RankPlan, RankTarget};
use crate::traits::QuantileComputer;
use crate::{Error, Result};
use binned_core::{for_each_qualifying, Dataset, Numeric};

/// Materialize-and-sort quantile computer bound to one dataset
///
/// The sorted copy is built on the first call and kept until [`reset`].
///
/// [`reset`]: QuantileComputer::reset
pub struct SortingQuantileComputer<'d, T: Numeric, D: ?Sized> {
    dataset: &'d D,
    sorted: Option<SortedSnapshot<T>>,
}

impl<'d, T, D> SortingQuantileComputer<'d, T, D>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    pub fn new(dataset: &'d D) -> Self {
        Self {
            dataset,
            sorted: None,
        }
    }

    fn load(&self) -> Result<SortedSnapshot<T>> {
        let mut buffer = CandidateBuffer::new();
        for_each_qualifying::<T, D, _>(self.dataset, |value, weight| buffer.push(value, weight))?;
        Ok(buffer.into_snapshot())
    }
}

impl<'d, T, D> QuantileComputer<T> for SortingQuantileComputer<'d, T, D>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    fn resolve(&mut self, targets: &[RankTarget], npts: u64, min: T, max: T) -> Result<Vec<T>> {
        check_request(targets, npts, min, max)?;
        let sorted = match self.sorted.take() {
            Some(sorted) => sorted,
            None => self.load()?,
        };
        let sorted = self.sorted.insert(sorted);
        if !(sorted.total_weight() > 0.0) {
            return Err(Error::EmptyData);
        }
        let plan = RankPlan::new(targets, sorted.total_weight());
        plan.evaluate(|k| sorted.value_at(k as f64))
    }

    fn reset(&mut self) {
        self.sorted = None;
    }
}
