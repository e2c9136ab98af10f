//! Rescannable dataset cursor
//!
//! The binned algorithms never own data. They consume a [`Dataset`], which
//! hands out [`Chunk`]s on every [`Dataset::scan`] call. A chunk carries the
//! values plus the optional weight, mask and value-range filters that decide
//! which values qualify. Every scan must yield the same chunks in the same
//! order; the algorithms rescan several times per call.

use crate::numeric::Numeric;
use crate::{Error, Result};
use bitflags::bitflags;

bitflags! {
    /// Filter capabilities carried by a chunk or a whole dataset
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChunkFlags: u8 {
        /// Per-element weights are present
        const WEIGHTS = 0b0001;
        /// A validity mask is present
        const MASK = 0b0010;
        /// Inclusion or exclusion value ranges are present
        const RANGES = 0b0100;
        /// Elements are read with a stride greater than one
        const STRIDED = 0b1000;
    }
}

/// Whether value ranges select or reject the values they contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    /// Only values inside at least one range qualify
    Include,
    /// Values inside any range are dropped
    Exclude,
}

/// A set of closed value intervals `[lo, hi]` with an include/exclude mode
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRanges<T: Numeric = f64> {
    ranges: Vec<(T, T)>,
    mode: RangeMode,
}

impl<T: Numeric> ValueRanges<T> {
    /// Create a range set, rejecting inverted or NaN intervals
    pub fn new(ranges: Vec<(T, T)>, mode: RangeMode) -> Result<Self> {
        if let Some((lo, hi)) = ranges.iter().find(|(lo, hi)| !(lo <= hi)) {
            return Err(Error::InvalidParameter(format!(
                "value range [{lo}, {hi}] is inverted or NaN"
            )));
        }
        Ok(Self { ranges, mode })
    }

    /// Ranges whose values are kept
    pub fn include(ranges: Vec<(T, T)>) -> Result<Self> {
        Self::new(ranges, RangeMode::Include)
    }

    /// Ranges whose values are dropped
    pub fn exclude(ranges: Vec<(T, T)>) -> Result<Self> {
        Self::new(ranges, RangeMode::Exclude)
    }

    pub fn mode(&self) -> RangeMode {
        self.mode
    }

    pub fn ranges(&self) -> &[(T, T)] {
        &self.ranges
    }

    /// Check whether a value passes this range filter
    #[inline]
    pub fn admits(&self, value: T) -> bool {
        let inside = self
            .ranges
            .iter()
            .any(|&(lo, hi)| value >= lo && value <= hi);
        match self.mode {
            RangeMode::Include => inside,
            RangeMode::Exclude => !inside,
        }
    }
}

/// A borrowed, read-only view of one contiguous piece of a dataset
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a, T: Numeric = f64> {
    pub values: &'a [T],
    pub weights: Option<&'a [T]>,
    pub mask: Option<&'a [bool]>,
    pub ranges: Option<&'a ValueRanges<T>>,
    /// Read every `stride`-th element of values, weights and mask
    pub stride: usize,
}

impl<'a, T: Numeric> Chunk<'a, T> {
    /// An unweighted, unmasked chunk
    pub fn new(values: &'a [T]) -> Self {
        Self {
            values,
            weights: None,
            mask: None,
            ranges: None,
            stride: 1,
        }
    }

    pub fn with_weights(mut self, weights: &'a [T]) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_mask(mut self, mask: &'a [bool]) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_ranges(mut self, ranges: &'a ValueRanges<T>) -> Self {
        self.ranges = Some(ranges);
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Filters this chunk carries
    pub fn flags(&self) -> ChunkFlags {
        let mut flags = ChunkFlags::empty();
        flags.set(ChunkFlags::WEIGHTS, self.weights.is_some());
        flags.set(ChunkFlags::MASK, self.mask.is_some());
        flags.set(ChunkFlags::RANGES, self.ranges.is_some());
        flags.set(ChunkFlags::STRIDED, self.stride > 1);
        flags
    }

    /// Number of elements visited, before filtering
    pub fn len(&self) -> usize {
        if self.stride == 0 {
            return 0;
        }
        self.values.len().div_ceil(self.stride)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate that the parallel slices line up with the values
    pub fn check(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::InvalidInput("chunk stride must be positive".to_string()));
        }
        if let Some(weights) = self.weights {
            if weights.len() != self.values.len() {
                return Err(Error::size_mismatch(self.values.len(), weights.len(), "weights"));
            }
        }
        if let Some(mask) = self.mask {
            if mask.len() != self.values.len() {
                return Err(Error::size_mismatch(self.values.len(), mask.len(), "mask"));
            }
        }
        Ok(())
    }
}

/// A rescannable, chunked, read-only source of values
///
/// Implementations may be backed by anything (memory, files, tables); the
/// only contract is that every call to `scan` visits the same chunks in the
/// same order and that the data does not change during a computation.
pub trait Dataset<T: Numeric = f64> {
    /// Visit every chunk once, in order. An error from `visit` aborts the scan
    /// and must be returned unchanged.
    fn scan(&self, visit: &mut dyn FnMut(Chunk<'_, T>) -> Result<()>) -> Result<()>;

    /// Union of the filters any chunk may carry
    ///
    /// Descriptive only. Selection decides weight-awareness from the weights
    /// the chunks actually carry, so the default of no flags is always safe.
    fn flags(&self) -> ChunkFlags {
        ChunkFlags::empty()
    }

    /// Whether any chunk carries weights
    fn is_weighted(&self) -> bool {
        self.flags().contains(ChunkFlags::WEIGHTS)
    }
}

impl<T: Numeric> Dataset<T> for [T] {
    fn scan(&self, visit: &mut dyn FnMut(Chunk<'_, T>) -> Result<()>) -> Result<()> {
        visit(Chunk::new(self))
    }
}

impl<T: Numeric> Dataset<T> for Vec<T> {
    fn scan(&self, visit: &mut dyn FnMut(Chunk<'_, T>) -> Result<()>) -> Result<()> {
        visit(Chunk::new(self.as_slice()))
    }
}

impl<T: Numeric, D: Dataset<T> + ?Sized> Dataset<T> for &D {
    fn scan(&self, visit: &mut dyn FnMut(Chunk<'_, T>) -> Result<()>) -> Result<()> {
        (**self).scan(visit)
    }

    fn flags(&self) -> ChunkFlags {
        (**self).flags()
    }
}

/// Owned storage for one chunk of a [`ChunkedDataset`]
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedChunk<T: Numeric = f64> {
    pub values: Vec<T>,
    pub weights: Option<Vec<T>>,
    pub mask: Option<Vec<bool>>,
    pub stride: usize,
}

impl<T: Numeric> OwnedChunk<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self {
            values,
            weights: None,
            mask: None,
            stride: 1,
        }
    }

    pub fn with_weights(mut self, weights: Vec<T>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_mask(mut self, mask: Vec<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    fn view<'a>(&'a self, ranges: Option<&'a ValueRanges<T>>) -> Chunk<'a, T> {
        Chunk {
            values: &self.values,
            weights: self.weights.as_deref(),
            mask: self.mask.as_deref(),
            ranges,
            stride: self.stride,
        }
    }
}

/// In-memory dataset made of non-contiguous chunks sharing one range filter
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedDataset<T: Numeric = f64> {
    chunks: Vec<OwnedChunk<T>>,
    ranges: Option<ValueRanges<T>>,
}

impl<T: Numeric> Default for ChunkedDataset<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Numeric> ChunkedDataset<T> {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            ranges: None,
        }
    }

    /// Append an unweighted chunk
    pub fn push(&mut self, values: Vec<T>) -> &mut Self {
        self.chunks.push(OwnedChunk::new(values));
        self
    }

    /// Append a fully described chunk
    pub fn push_chunk(&mut self, chunk: OwnedChunk<T>) -> &mut Self {
        self.chunks.push(chunk);
        self
    }

    /// Apply an inclusion or exclusion range filter to every chunk
    pub fn with_ranges(mut self, ranges: ValueRanges<T>) -> Self {
        self.ranges = Some(ranges);
        self
    }

    pub fn chunks(&self) -> &[OwnedChunk<T>] {
        &self.chunks
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }
}

impl<T: Numeric> From<Vec<T>> for ChunkedDataset<T> {
    fn from(values: Vec<T>) -> Self {
        let mut dataset = Self::new();
        dataset.push(values);
        dataset
    }
}

impl<T: Numeric> FromIterator<OwnedChunk<T>> for ChunkedDataset<T> {
    fn from_iter<I: IntoIterator<Item = OwnedChunk<T>>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
            ranges: None,
        }
    }
}

impl<T: Numeric> Dataset<T> for ChunkedDataset<T> {
    fn scan(&self, visit: &mut dyn FnMut(Chunk<'_, T>) -> Result<()>) -> Result<()> {
        for chunk in &self.chunks {
            visit(chunk.view(self.ranges.as_ref()))?;
        }
        Ok(())
    }

    fn flags(&self) -> ChunkFlags {
        self.chunks
            .iter()
            .map(|chunk| chunk.view(self.ranges.as_ref()).flags())
            .fold(ChunkFlags::empty(), |acc, flags| acc | flags)
    }
}
