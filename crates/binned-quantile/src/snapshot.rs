//! Sorted in-memory copy of a whole filtered dataset

use binned_core::Numeric;

/// All qualifying values in ascending order, with cumulative weights when the
/// data is weighted
///
/// Built only when the caller opts in with `persist_sorted`; later calls on
/// the same computer read every position straight from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedSnapshot<T: Numeric = f64> {
    values: Vec<T>,
    /// `cumulative[i]` is the total weight of `values[..=i]`
    cumulative: Option<Vec<f64>>,
}

impl<T: Numeric> SortedSnapshot<T> {
    pub fn from_values(mut values: Vec<T>) -> Self {
        values.sort_unstable_by(|a, b| a.order_cmp(b));
        Self {
            values,
            cumulative: None,
        }
    }

    pub fn from_weighted(mut items: Vec<(T, f64)>) -> Self {
        items.sort_unstable_by(|a, b| a.0.order_cmp(&b.0));
        let mut running = 0.0;
        let cumulative = items
            .iter()
            .map(|&(_, w)| {
                running += w;
                running
            })
            .collect();
        Self {
            values: items.into_iter().map(|(v, _)| v).collect(),
            cumulative: Some(cumulative),
        }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Values in ascending order with their weights (1 when unweighted)
    pub fn iter(&self) -> impl Iterator<Item = (T, f64)> + '_ {
        let mut previous = 0.0;
        self.values.iter().enumerate().map(move |(i, &v)| match &self.cumulative {
            Some(cumulative) => {
                let weight = cumulative[i] - previous;
                previous = cumulative[i];
                (v, weight)
            }
            None => (v, 1.0),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_weighted(&self) -> bool {
        self.cumulative.is_some()
    }

    pub fn total_weight(&self) -> f64 {
        match &self.cumulative {
            Some(cumulative) => cumulative.last().copied().unwrap_or(0.0),
            None => self.values.len() as f64,
        }
    }

    /// Value at weighted position `position`; positions past the end read the
    /// largest value
    pub fn value_at(&self, position: f64) -> Option<T> {
        let last = self.values.len().checked_sub(1)?;
        let index = match &self.cumulative {
            Some(cumulative) => cumulative.partition_point(|&c| c <= position),
            None => position.max(0.0) as usize,
        };
        Some(self.values[index.min(last)])
    }
}
