//! Core traits for quantile computation

use crate::targets::RankTarget;
use crate::{Error, Result};
use binned_core::Numeric;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

/// Quantile results keyed by fraction
pub type QuantileMap<T = f64> = BTreeMap<OrderedFloat<f64>, T>;

/// A strategy for resolving order statistics over one dataset
///
/// Implementations are bound to a dataset at construction; `npts`, `min` and
/// `max` are supplied by the caller on every call and are trusted (they are
/// not checked against the data). Two strategies ship with this crate:
/// [`ClassicalQuantileComputer`](crate::ClassicalQuantileComputer), which
/// never holds more than a bounded slice of the data, and
/// [`SortingQuantileComputer`](crate::SortingQuantileComputer), which sorts
/// everything in memory.
pub trait QuantileComputer<T: Numeric = f64> {
    /// Resolve several rank targets together, returning one value per target
    /// in the order given
    fn resolve(&mut self, targets: &[RankTarget], npts: u64, min: T, max: T) -> Result<Vec<T>>;

    /// Drop any state kept between calls (persisted snapshot, pass counters)
    ///
    /// Call this whenever the underlying data changes.
    fn reset(&mut self);

    /// Median, averaging the two middle values for an even count
    fn median(&mut self, npts: u64, min: T, max: T) -> Result<T> {
        let values = self.resolve(&[RankTarget::Median], npts, min, max)?;
        values.first().copied().ok_or(Error::EmptyData)
    }

    /// Quantiles at each fraction in the open interval (0, 1)
    ///
    /// A single invalid fraction rejects the whole call.
    fn quantiles(&mut self, fractions: &[f64], npts: u64, min: T, max: T) -> Result<QuantileMap<T>> {
        Error::check_fractions(fractions)?;
        let targets: Vec<RankTarget> = fractions.iter().map(|&p| RankTarget::Fraction(p)).collect();
        let values = self.resolve(&targets, npts, min, max)?;
        Ok(fractions.iter().map(|&p| OrderedFloat(p)).zip(values).collect())
    }

    /// Median and quantiles from one shared set of passes
    fn median_and_quantiles(
        &mut self,
        fractions: &[f64],
        npts: u64,
        min: T,
        max: T,
    ) -> Result<(T, QuantileMap<T>)> {
        Error::check_fractions(fractions)?;
        let targets: Vec<RankTarget> = std::iter::once(RankTarget::Median)
            .chain(fractions.iter().map(|&p| RankTarget::Fraction(p)))
            .collect();
        let mut values = self.resolve(&targets, npts, min, max)?.into_iter();
        let median = values.next().ok_or(Error::EmptyData)?;
        let quantiles = fractions.iter().map(|&p| OrderedFloat(p)).zip(values).collect();
        Ok((median, quantiles))
    }
}
