//! Exact selection from an in-memory candidate buffer
//!
//! Selection uses partial ordering (`select_nth_unstable_by`, expected linear
//! time) and never sorts the whole buffer. Weighted buffers use a quickselect
//! that tracks the weight on each side of the pivot.

use crate::snapshot::SortedSnapshot;
use crate::{Error, Result};
use binned_core::Numeric;

/// Values pulled out of the dataset for one bin (or the whole dataset)
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateBuffer<T: Numeric = f64> {
    Unweighted(Vec<T>),
    Weighted(Vec<(T, f64)>),
}

impl<T: Numeric> Default for CandidateBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Numeric> CandidateBuffer<T> {
    /// An empty buffer; it switches to carrying weights on the first
    /// non-unit weight pushed
    pub fn new() -> Self {
        CandidateBuffer::Unweighted(Vec::new())
    }

    #[inline]
    pub fn push(&mut self, value: T, weight: f64) {
        match self {
            CandidateBuffer::Unweighted(values) if weight == 1.0 => values.push(value),
            CandidateBuffer::Unweighted(values) => {
                let mut items: Vec<(T, f64)> = values.drain(..).map(|v| (v, 1.0)).collect();
                items.push((value, weight));
                *self = CandidateBuffer::Weighted(items);
            }
            CandidateBuffer::Weighted(items) => items.push((value, weight)),
        }
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self, CandidateBuffer::Weighted(_))
    }

    pub fn len(&self) -> usize {
        match self {
            CandidateBuffer::Unweighted(values) => values.len(),
            CandidateBuffer::Weighted(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_weight(&self) -> f64 {
        match self {
            CandidateBuffer::Unweighted(values) => values.len() as f64,
            CandidateBuffer::Weighted(items) => items.iter().map(|&(_, w)| w).sum(),
        }
    }

    /// Values at the given weighted positions (relative to the buffer's
    /// smallest element), which must be ascending
    pub fn select(&mut self, positions: &[f64]) -> Result<Vec<T>> {
        if self.is_empty() {
            return Err(Error::EmptyData);
        }
        match self {
            CandidateBuffer::Unweighted(values) => {
                let ranks: Vec<usize> = positions.iter().map(|&p| p.max(0.0) as usize).collect();
                Ok(select_ranks(values, &ranks))
            }
            CandidateBuffer::Weighted(items) => positions
                .iter()
                .map(|&p| select_weighted(items, p).ok_or(Error::EmptyData))
                .collect(),
        }
    }

    /// Sort the buffer into a reusable snapshot
    pub fn into_snapshot(self) -> SortedSnapshot<T> {
        match self {
            CandidateBuffer::Unweighted(values) => SortedSnapshot::from_values(values),
            CandidateBuffer::Weighted(items) => SortedSnapshot::from_weighted(items),
        }
    }
}

/// The values of rank `ranks[i]` (0-based) in `values`
///
/// `ranks` must be ascending; ranks past the end read the largest value. Each
/// selection only partitions the part of the slice above the previous rank.
pub fn select_ranks<T: Numeric>(values: &mut [T], ranks: &[usize]) -> Vec<T> {
    let Some(last) = values.len().checked_sub(1) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(ranks.len());
    let mut start = 0;
    let mut previous: Option<(usize, T)> = None;
    for &rank in ranks {
        let rank = rank.min(last);
        if let Some((r, v)) = previous {
            if r == rank {
                out.push(v);
                continue;
            }
        }
        let (_, nth, _) = values[start..].select_nth_unstable_by(rank - start, |a, b| a.order_cmp(b));
        let value = *nth;
        out.push(value);
        previous = Some((rank, value));
        start = rank + 1;
    }
    out
}

/// The element whose cumulative weight interval holds `position`
///
/// Positions past the total weight read the largest value. Returns `None`
/// only for an empty slice.
pub fn select_weighted<T: Numeric>(items: &mut [(T, f64)], position: f64) -> Option<T> {
    let mut slice = items;
    let mut position = position;
    loop {
        match slice.len() {
            0 => return None,
            1 => return Some(slice[0].0),
            _ => {}
        }
        let mid = slice.len() / 2;
        slice.select_nth_unstable_by(mid, |a, b| a.0.order_cmp(&b.0));
        let (pivot, pivot_weight) = slice[mid];
        let below: f64 = slice[..mid].iter().map(|&(_, w)| w).sum();

        if position < below {
            slice = &mut std::mem::take(&mut slice)[..mid];
        } else if position < below + pivot_weight {
            return Some(pivot);
        } else {
            position -= below + pivot_weight;
            if mid + 1 == slice.len() {
                return Some(pivot);
            }
            slice = &mut std::mem::take(&mut slice)[mid + 1..];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_ranks_multiple() {
        let mut values = vec![9.0, 1.0, 8.0, 2.0, 7.0, 3.0, 6.0, 4.0, 5.0, 0.0];
        let picked = select_ranks(&mut values, &[0, 4, 4, 5, 9, 20]);
        assert_eq!(picked, vec![0.0, 4.0, 4.0, 5.0, 9.0, 9.0]);
    }

    #[test]
    fn test_select_ranks_with_duplicates() {
        let mut values = vec![2.0, 1.0, 2.0, 2.0, 3.0];
        assert_eq!(select_ranks(&mut values, &[1, 3, 4]), vec![2.0, 2.0, 3.0]);
        let mut empty: Vec<f64> = vec![];
        assert!(select_ranks(&mut empty, &[0]).is_empty());
    }

    #[test]
    fn test_select_weighted() {
        // Sorted: 1 (w 1), 2 (w 3), 3 (w 0.5), 4 (w 2) -> cumulative 1, 4, 4.5, 6.5
        let items = vec![(3.0, 0.5), (1.0, 1.0), (4.0, 2.0), (2.0, 3.0)];
        let cases = [(0.0, 1.0), (0.99, 1.0), (1.0, 2.0), (3.9, 2.0), (4.0, 3.0), (4.5, 4.0), (10.0, 4.0)];
        for (position, expected) in cases {
            let mut scratch = items.clone();
            assert_eq!(select_weighted(&mut scratch, position), Some(expected), "position {position}");
        }
        assert_eq!(select_weighted::<f64>(&mut [], 0.0), None);
    }

    #[test]
    fn test_unit_weights_match_ranks() {
        let raw: Vec<f64> = (0..101).map(|i| ((i * 37) % 101) as f64).collect();
        for rank in [0usize, 1, 50, 99, 100] {
            let mut weighted: Vec<(f64, f64)> = raw.iter().map(|&v| (v, 1.0)).collect();
            let mut plain = raw.clone();
            assert_eq!(
                select_weighted(&mut weighted, rank as f64),
                select_ranks(&mut plain, &[rank]).first().copied()
            );
        }
    }

    #[test]
    fn test_buffer_select_and_snapshot() {
        let mut buffer = CandidateBuffer::new();
        for v in [4.0, 2.0, 3.0, 1.0] {
            buffer.push(v, 1.0);
        }
        assert_eq!(buffer.total_weight(), 4.0);
        assert_eq!(buffer.select(&[1.0, 2.0]).unwrap(), vec![2.0, 3.0]);
        let snapshot = buffer.into_snapshot();
        assert_eq!(snapshot.values(), &[1.0, 2.0, 3.0, 4.0]);

        let mut empty = CandidateBuffer::<f64>::new();
        assert!(empty.select(&[0.0]).is_err());
    }

    #[test]
    fn test_buffer_switches_to_weights_on_first_non_unit_weight() {
        let mut buffer = CandidateBuffer::new();
        buffer.push(10.0, 1.0);
        buffer.push(1.0, 1.0);
        assert!(!buffer.is_weighted());

        buffer.push(2.0, 8.0);
        assert!(buffer.is_weighted());
        assert_eq!(
            buffer,
            CandidateBuffer::Weighted(vec![(10.0, 1.0), (1.0, 1.0), (2.0, 8.0)])
        );
        buffer.push(5.0, 1.0);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.total_weight(), 11.0);
        // Cumulative weights: 1 -> [0, 1), 2 -> [1, 9), 5 -> [9, 10), 10 -> [10, 11)
        assert_eq!(buffer.select(&[0.5, 8.9, 9.0, 10.0]).unwrap(), vec![1.0, 2.0, 5.0, 10.0]);
    }
}
