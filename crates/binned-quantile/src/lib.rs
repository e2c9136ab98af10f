//! Exact quantiles over datasets too large to sort in memory
//!
//! This crate resolves medians and arbitrary quantiles exactly while holding
//! only a bounded slice of the data, using iterative histogram refinement:
//! count values into equal-width bins, find the bin holding each requested
//! rank, and zoom into that bin until it is small enough to materialize.
//!
//! # Features
//!
//! - **Exact answers**: selection from materialized bins, never approximation
//! - **Bounded memory**: a materialization budget and a hard buffer cap, both
//!   in [`QuantileConfig`]
//! - **Shared passes**: any number of quantiles resolved with the same scans
//! - **Weighted data**: positions measured in cumulative weight
//! - **Snapshot reuse**: an opt-in sorted copy answers repeat calls without
//!   scanning
//!
//! # Example
//!
//! ```rust
//! use binned_quantile::{ClassicalQuantileComputer, QuantileComputer};
//! use binned_core::QuantileConfig;
//!
//! let data: Vec<f64> = (0..10_000).map(|i| (i % 1000) as f64).collect();
//! let config = QuantileConfig::builder()
//!     .budget_bytes(4096)
//!     .bin_count_hint(64)
//!     .build()
//!     .unwrap();
//!
//! let mut computer = ClassicalQuantileComputer::new(&data, config);
//! let (median, quantiles) = computer
//!     .median_and_quantiles(&[0.25, 0.75], 10_000, 0.0, 999.0)
//!     .unwrap();
//! assert_eq!(median, 499.5);
//! assert_eq!(quantiles[&0.25.into()], 249.75);
//! ```

pub mod computer;
pub mod error;
pub mod extractor;
pub mod naive_reference;
pub mod selector;
pub mod snapshot;
pub mod targets;
pub mod traits;

// Re-export main types
pub use computer::{ClassicalQuantileComputer, ScanStats};
pub use error::{Error, Result};
pub use naive_reference::SortingQuantileComputer;
pub use selector::{select_ranks, select_weighted, CandidateBuffer};
pub use snapshot::SortedSnapshot;
pub use targets::{Bracket, RankPlan, RankTarget};
pub use traits::{QuantileComputer, QuantileMap};
// Re-export from binned-core
pub use binned_core::QuantileConfig;

use binned_core::{Dataset, Numeric};

/// Median of `dataset` with a one-shot [`ClassicalQuantileComputer`]
pub fn median<T, D>(dataset: &D, npts: u64, min: T, max: T, config: &QuantileConfig) -> Result<T>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    ClassicalQuantileComputer::<T, D>::new(dataset, *config).median(npts, min, max)
}

/// Quantiles of `dataset` with a one-shot [`ClassicalQuantileComputer`]
pub fn quantiles<T, D>(
    dataset: &D,
    fractions: &[f64],
    npts: u64,
    min: T,
    max: T,
    config: &QuantileConfig,
) -> Result<QuantileMap<T>>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    ClassicalQuantileComputer::<T, D>::new(dataset, *config).quantiles(fractions, npts, min, max)
}

/// Median and quantiles of `dataset` from one shared set of passes
pub fn median_and_quantiles<T, D>(
    dataset: &D,
    fractions: &[f64],
    npts: u64,
    min: T,
    max: T,
    config: &QuantileConfig,
) -> Result<(T, QuantileMap<T>)>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    ClassicalQuantileComputer::<T, D>::new(dataset, *config).median_and_quantiles(fractions, npts, min, max)
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ClassicalQuantileComputer, Error, QuantileComputer, QuantileConfig, QuantileMap, Result,
        RankTarget, SortingQuantileComputer,
    };
}
