//! Core types for exact, out-of-core order statistics
//!
//! This crate holds the pieces every binned algorithm shares:
//!
//! - **Dataset cursor**: the [`Dataset`] trait, a rescannable chunked view
//!   over values with optional weights, validity mask and value ranges
//! - **Filtering pass**: [`for_each_qualifying`], one configurable pass that
//!   covers every combination of weights, mask, ranges and stride
//! - **Configuration**: [`QuantileConfig`], the memory budgets and binning
//!   knobs of the refinement algorithm
//! - **Errors**: the shared [`Error`] type
//!
//! # Example
//!
//! ```rust
//! use binned_core::{ChunkedDataset, DatasetSummary, OwnedChunk};
//!
//! let mut dataset = ChunkedDataset::new();
//! dataset.push(vec![3.0, 1.0, 2.0]);
//! dataset.push_chunk(OwnedChunk::new(vec![10.0, 4.0]).with_mask(vec![false, true]));
//!
//! let summary = DatasetSummary::compute(&dataset).unwrap().unwrap();
//! assert_eq!(summary.npts, 4);
//! assert_eq!(summary.max, 4.0);
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod numeric;

// Re-export core types
pub use error::{Error, Result};

pub use config::{QuantileConfig, QuantileConfigBuilder, MAX_BIN_COUNT};
pub use dataset::{
    Chunk, ChunkFlags, ChunkedDataset, Dataset, OwnedChunk, RangeMode, ValueRanges,
};
pub use filter::{for_each_qualifying, DatasetSummary};
pub use numeric::Numeric;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ChunkedDataset, Dataset, DatasetSummary, Error, Numeric, OwnedChunk, QuantileConfig,
        Result, ValueRanges,
    };
}
