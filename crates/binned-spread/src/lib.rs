//! Robust spread estimators over out-of-core datasets
//!
//! The median absolute deviation about the median (MAD) is resolved with the
//! same bounded-memory histogram refinement as the median itself, running a
//! second resolution over a virtual dataset of absolute deviations.
//!
//! # Example
//!
//! ```rust
//! use binned_spread::{median_abs_dev_med, QuantileConfig};
//!
//! let data = vec![1.0, 2.0, 3.0, 4.0, 100.0];
//! let mad = median_abs_dev_med(&data, 5, 1.0, 100.0, &QuantileConfig::default()).unwrap();
//! assert_eq!(mad, 1.0);
//! ```

pub mod adapters;
pub mod mad;

pub use adapters::AbsDeviation;
pub use mad::{MedianAbsDevMed, MedianAbsDeviation};
// Re-export from binned-quantile
pub use binned_quantile::{Error, QuantileConfig, Result};

use binned_core::{Dataset, Numeric};

/// MAD of `dataset` with a one-shot computer
pub fn median_abs_dev_med<T, D>(
    dataset: &D,
    npts: u64,
    min: T,
    max: T,
    config: &QuantileConfig,
) -> Result<T>
where
    T: Numeric,
    D: Dataset<T> + ?Sized,
{
    MedianAbsDeviation::new(*config).estimate(dataset, npts, min, max)
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{AbsDeviation, MedianAbsDevMed, MedianAbsDeviation};
}
