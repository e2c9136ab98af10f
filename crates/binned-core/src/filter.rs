//! The single filtering pass every algorithm is built on
//!
//! A value qualifies when it is not NaN, its mask entry (if any) is `true`,
//! it passes the chunk's range filter (if any) and its weight (if any) is
//! strictly positive. Unweighted values carry weight `1.0`.

use crate::dataset::{Chunk, ChunkFlags, Dataset};
use crate::numeric::Numeric;
use crate::Result;

/// Run one full pass over `dataset`, calling `visit(value, weight)` for every
/// qualifying element
pub fn for_each_qualifying<T, D, F>(dataset: &D, mut visit: F) -> Result<()>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
    F: FnMut(T, f64),
{
    dataset.scan(&mut |chunk: Chunk<'_, T>| visit_chunk(&chunk, &mut visit))
}

/// Apply the chunk's filters and forward the qualifying values
///
/// Fails without visiting anything when the mask or weights do not match the
/// values in length.
#[inline]
pub fn visit_chunk<T, F>(chunk: &Chunk<'_, T>, visit: &mut F) -> Result<()>
where
    T: Numeric,
    F: FnMut(T, f64),
{
    chunk.check()?;
    let flags = chunk.flags();
    if flags.is_empty() {
        // Plain contiguous values
        for &value in chunk.values {
            if !value.is_nan() {
                visit(value, 1.0);
            }
        }
        return Ok(());
    }

    let stride = chunk.stride;
    for i in (0..chunk.values.len()).step_by(stride) {
        if flags.contains(ChunkFlags::MASK) && !chunk.mask.is_some_and(|mask| mask[i]) {
            continue;
        }
        let value = chunk.values[i];
        if value.is_nan() {
            continue;
        }
        if let Some(ranges) = chunk.ranges {
            if !ranges.admits(value) {
                continue;
            }
        }
        let weight = match chunk.weights {
            Some(weights) => {
                let weight = weights[i].as_f64();
                // Also rejects NaN weights
                if !(weight > 0.0) {
                    continue;
                }
                weight
            }
            None => 1.0,
        };
        visit(value, weight);
    }
    Ok(())
}

/// Count, extent and total weight of the qualifying values
///
/// The quantile computers require the caller's `npts`, `min` and `max` to
/// match the data; this is the one-pass helper callers can use to obtain them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetSummary<T: Numeric = f64> {
    pub npts: u64,
    pub min: T,
    pub max: T,
    pub total_weight: f64,
}

impl<T: Numeric> DatasetSummary<T> {
    /// Scan `dataset` once; `None` when nothing qualifies
    pub fn compute<D: Dataset<T> + ?Sized>(dataset: &D) -> Result<Option<Self>> {
        let mut summary: Option<Self> = None;
        for_each_qualifying::<T, D, _>(dataset, |value, weight| {
            let s = summary.get_or_insert(Self {
                npts: 0,
                min: value,
                max: value,
                total_weight: 0.0,
            });
            s.npts += 1;
            s.total_weight += weight;
            if value < s.min {
                s.min = value;
            }
            if value > s.max {
                s.max = value;
            }
        })?;
        Ok(summary)
    }
}
