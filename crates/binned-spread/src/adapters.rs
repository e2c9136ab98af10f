//! Virtual datasets derived from another dataset

use binned_core::filter::visit_chunk;
use binned_core::{Chunk, ChunkFlags, Dataset, Numeric, Result};

/// The absolute deviations `|x - center|` of every qualifying value of an
/// inner dataset
///
/// Filters (mask, ranges, stride, non-positive weights, NaN) are applied to
/// the original values, so the derived dataset carries only weights. Each
/// inner chunk is transformed into a reused scratch buffer; nothing larger
/// than one chunk is ever held.
#[derive(Debug, Clone, Copy)]
pub struct AbsDeviation<'a, T: Numeric, D: ?Sized> {
    inner: &'a D,
    center: T,
}

impl<'a, T: Numeric, D: Dataset<T> + ?Sized> AbsDeviation<'a, T, D> {
    pub fn new(inner: &'a D, center: T) -> Self {
        Self { inner, center }
    }

    pub fn center(&self) -> T {
        self.center
    }

    /// Largest possible deviation given the inner dataset's extent
    pub fn max_deviation(&self, min: T, max: T) -> T {
        (min - self.center).abs().max((max - self.center).abs())
    }
}

impl<'a, T: Numeric, D: Dataset<T> + ?Sized> Dataset<T> for AbsDeviation<'a, T, D> {
    fn scan(&self, visit: &mut dyn FnMut(Chunk<'_, T>) -> Result<()>) -> Result<()> {
        let center = self.center;
        let mut deviations: Vec<T> = Vec::new();
        let mut weights: Vec<T> = Vec::new();

        self.inner.scan(&mut |chunk| {
            let weighted = chunk.weights.is_some();
            deviations.clear();
            weights.clear();
            visit_chunk(&chunk, &mut |value: T, weight: f64| {
                deviations.push((value - center).abs());
                if weighted {
                    weights.push(T::from_f64(weight));
                }
            })?;
            let derived = Chunk::new(&deviations);
            if weighted {
                visit(derived.with_weights(&weights))
            } else {
                visit(derived)
            }
        })
    }

    fn flags(&self) -> ChunkFlags {
        self.inner.flags() & ChunkFlags::WEIGHTS
    }
}
