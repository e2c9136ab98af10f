//! Exact order statistics over datasets too large to sort in memory
//!
//! This crate re-exports the workspace:
//!
//! - [`core`]: the dataset cursor, the filtering pass, configuration and errors
//! - [`histogram`]: bin descriptors and weighted bin counting
//! - [`quantile`]: median and quantile resolution by histogram refinement
//! - [`spread`]: median absolute deviation about the median
//!
//! # Example
//!
//! ```rust
//! use binned_stats::prelude::*;
//!
//! let mut dataset = ChunkedDataset::new();
//! dataset.push((0..5000).map(|i| i as f64).collect());
//! dataset.push((5000..10_000).map(|i| i as f64).collect());
//!
//! let summary = DatasetSummary::compute(&dataset).unwrap().unwrap();
//! let config = QuantileConfig::builder().budget_bytes(8 * 256).build().unwrap();
//!
//! let mut computer = ClassicalQuantileComputer::new(&dataset, config);
//! let median = computer.median(summary.npts, summary.min, summary.max).unwrap();
//! let mad = computer
//!     .median_abs_dev_med(summary.npts, summary.min, summary.max)
//!     .unwrap();
//! assert_eq!(median, 4999.5);
//! assert_eq!(mad, 2500.0);
//! ```

pub use binned_core as core;
pub use binned_histogram as histogram;
pub use binned_quantile as quantile;
pub use binned_spread as spread;

pub use binned_core::{Dataset, DatasetSummary, Numeric, QuantileConfig};
pub use binned_quantile::{
    median, median_and_quantiles, quantiles, ClassicalQuantileComputer, Error, QuantileComputer,
    QuantileMap, Result,
};
pub use binned_spread::{median_abs_dev_med, MedianAbsDevMed, MedianAbsDeviation};

/// Everything needed for typical use
pub mod prelude {
    pub use binned_core::{ChunkedDataset, Dataset, DatasetSummary, Numeric, OwnedChunk, ValueRanges};
    pub use binned_histogram::{count_bins, BinDesc, BinTally};
    pub use binned_quantile::prelude::*;
    pub use binned_spread::prelude::*;
}
