//! Pulling the values of narrowed bins into memory
//!
//! Extraction never truncates: every qualifying value inside a requested
//! range is either stored or counted as rejected, and any rejection turns the
//! whole pass into a [`Error::BufferOverflow`].

use crate::selector::CandidateBuffer;
use crate::{Error, Result};
use binned_core::{for_each_qualifying, Dataset, Numeric};
use binned_histogram::BinRange;

/// Collects the values of several non-overlapping ranges in one pass, with a
/// shared element limit
#[derive(Debug, Clone)]
pub struct RangeExtractor<T: Numeric = f64> {
    ranges: Vec<BinRange<T>>,
    /// Range indices ordered by lower edge
    order: Vec<usize>,
    lower_edges: Vec<T>,
    buffers: Vec<CandidateBuffer<T>>,
    limit: u64,
    taken: u64,
    rejected: u64,
}

impl<T: Numeric> RangeExtractor<T> {
    /// `ranges` must not overlap; buffers come back in the order given
    pub fn new(ranges: Vec<BinRange<T>>, limit: usize) -> Self {
        let mut order: Vec<usize> = (0..ranges.len()).collect();
        order.sort_by(|&a, &b| ranges[a].lo.order_cmp(&ranges[b].lo));
        let lower_edges = order.iter().map(|&i| ranges[i].lo).collect();
        let buffers = ranges.iter().map(|_| CandidateBuffer::new()).collect();
        Self {
            ranges,
            order,
            lower_edges,
            buffers,
            limit: limit as u64,
            taken: 0,
            rejected: 0,
        }
    }

    #[inline]
    pub fn offer(&mut self, value: T, weight: f64) {
        let pos = self.lower_edges.partition_point(|&lo| lo <= value);
        if pos == 0 {
            return;
        }
        let i = self.order[pos - 1];
        if !self.ranges[i].contains(value) {
            return;
        }
        if self.taken >= self.limit {
            self.rejected += 1;
            return;
        }
        self.taken += 1;
        self.buffers[i].push(value, weight);
    }

    /// The filled buffers, or an overflow error if anything was rejected
    pub fn finish(self) -> Result<Vec<CandidateBuffer<T>>> {
        if self.rejected > 0 {
            return Err(Error::BufferOverflow {
                population: self.taken + self.rejected,
                limit: self.limit,
            });
        }
        Ok(self.buffers)
    }
}

/// Extract the qualifying values of each range in one pass
pub fn extract<T, D>(
    dataset: &D,
    ranges: Vec<BinRange<T>>,
    limit: usize,
) -> Result<Vec<CandidateBuffer<T>>>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    let mut extractor = RangeExtractor::new(ranges, limit);
    for_each_qualifying::<T, D, _>(dataset, |value, weight| extractor.offer(value, weight))?;
    extractor.finish()
}

/// Load every qualifying value, failing if there are more than `limit`
pub fn extract_all<T, D>(dataset: &D, limit: usize) -> Result<CandidateBuffer<T>>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    let mut buffer = CandidateBuffer::new();
    let mut seen: u64 = 0;
    for_each_qualifying::<T, D, _>(dataset, |value, weight| {
        seen += 1;
        if seen <= limit as u64 {
            buffer.push(value, weight);
        }
    })?;
    if seen > limit as u64 {
        return Err(Error::BufferOverflow {
            population: seen,
            limit: limit as u64,
        });
    }
    Ok(buffer)
}
