//! Equal-width bin descriptors
//!
//! A [`BinDesc`] partitions `[min_limit, max_limit)` into `n_bins` bins of
//! equal width. Bin membership is decided by the explicit bin edges, never by
//! the scaled offset alone, so a value lands in the same bin no matter how the
//! range was reached: refining bin `i` produces a descriptor whose range is
//! exactly `[edge(i), edge(i + 1))`. A value on an edge belongs to the higher
//! bin.

use binned_core::{Error, Numeric, Result, MAX_BIN_COUNT};
use num_traits::ToPrimitive;
use std::fmt;

/// A half-open value interval, optionally closed on the right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinRange<T: Numeric = f64> {
    pub lo: T,
    pub hi: T,
    /// Whether `hi` itself belongs to the range
    pub closed: bool,
}

impl<T: Numeric> BinRange<T> {
    #[inline]
    pub fn contains(&self, value: T) -> bool {
        value >= self.lo && (value < self.hi || (self.closed && value == self.hi))
    }

    /// Whether the range can hold anything at all
    pub fn is_empty(&self) -> bool {
        !(self.lo < self.hi || (self.closed && self.lo == self.hi))
    }
}

/// One histogram: `n_bins` equal-width bins starting at `min_limit`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinDesc<T: Numeric = f64> {
    min_limit: T,
    bin_width: T,
    n_bins: usize,
    max_limit: T,
    closed: bool,
}

impl<T: Numeric> BinDesc<T> {
    /// Histogram over a whole dataset, `[min, max]` with `max` included in
    /// the last bin
    pub fn spanning(min: T, max: T, n_bins: usize) -> Result<Self> {
        Self::build(min, max, n_bins, true)
    }

    /// Histogram over the half-open interval `[lo, hi)`
    pub fn half_open(lo: T, hi: T, n_bins: usize) -> Result<Self> {
        Self::build(lo, hi, n_bins, false)
    }

    fn build(lo: T, hi: T, n_bins: usize, closed: bool) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::InvalidParameter(
                "a histogram needs at least one bin".to_string(),
            ));
        }
        if n_bins > MAX_BIN_COUNT {
            return Err(Error::InvalidParameter(format!(
                "{n_bins} bins exceeds the maximum of {MAX_BIN_COUNT}"
            )));
        }
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(Error::invalid_range(lo, hi));
        }
        let n = T::from_f64(n_bins as f64);
        let mut bin_width = (hi - lo) / n;
        if !bin_width.is_finite() {
            // hi - lo overflowed
            bin_width = hi / n - lo / n;
        }
        if !(bin_width > T::zero()) {
            return Err(Error::InvalidParameter(format!(
                "bin width underflows for [{lo}, {hi}) with {n_bins} bins"
            )));
        }
        Ok(Self {
            min_limit: lo,
            bin_width,
            n_bins,
            max_limit: hi,
            closed,
        })
    }

    pub fn min_limit(&self) -> T {
        self.min_limit
    }

    pub fn max_limit(&self) -> T {
        self.max_limit
    }

    pub fn bin_width(&self) -> T {
        self.bin_width
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Whether `max_limit` itself is counted (only for top-level histograms)
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Lower edge of bin `i`; `edge(n_bins)` is `max_limit`
    #[inline]
    pub fn edge(&self, i: usize) -> T {
        if i == 0 {
            self.min_limit
        } else if i >= self.n_bins {
            self.max_limit
        } else {
            (self.min_limit + self.bin_width * T::from_f64(i as f64)).min(self.max_limit)
        }
    }

    /// The value interval covered by bin `i`
    pub fn bin_range(&self, i: usize) -> BinRange<T> {
        BinRange {
            lo: self.edge(i),
            hi: self.edge(i + 1),
            closed: self.closed && i + 1 == self.n_bins,
        }
    }

    /// The value interval covered by the whole histogram
    pub fn range(&self) -> BinRange<T> {
        BinRange {
            lo: self.min_limit,
            hi: self.max_limit,
            closed: self.closed,
        }
    }

    #[inline]
    pub fn contains(&self, value: T) -> bool {
        self.range().contains(value)
    }

    /// Index of the bin holding `value`, or `None` when it is out of range
    #[inline]
    pub fn bin_index(&self, value: T) -> Option<usize> {
        if !self.contains(value) {
            return None;
        }
        let last = self.n_bins - 1;
        let scaled = ((value - self.min_limit) / self.bin_width).floor();
        let mut idx = ToPrimitive::to_usize(&scaled).unwrap_or(0).min(last);
        // Rounding in the division can be off by one; the edges decide
        while idx > 0 && value < self.edge(idx) {
            idx -= 1;
        }
        while idx < last && value >= self.edge(idx + 1) {
            idx += 1;
        }
        Some(idx)
    }

    /// A finer histogram over bin `i`, or `None` when the bin cannot be split
    /// any further in floating point
    pub fn refine(&self, i: usize, n_bins: usize) -> Option<Self> {
        let range = self.bin_range(i);
        if !(range.lo < range.hi) {
            return None;
        }
        if range.lo == self.min_limit && range.hi == self.max_limit {
            // No narrower than this histogram
            return None;
        }
        Self::build(range.lo, range.hi, n_bins, range.closed).ok()
    }
}

impl<T: Numeric> fmt::Display for BinDesc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}{} x {} bins of width {}",
            self.min_limit,
            self.max_limit,
            if self.closed { "]" } else { ")" },
            self.n_bins,
            self.bin_width
        )
    }
}
