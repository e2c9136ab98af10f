//! Equal-width histograms for locating order statistics
//!
//! This crate provides the two histogram pieces the refinement algorithm
//! alternates between:
//!
//! - **Descriptors**: [`BinDesc`] defines `n_bins` equal-width bins over a
//!   value interval, with edge-exact membership and [`BinDesc::refine`] to zoom
//!   into one bin
//! - **Counting**: [`count_bins`] tallies any number of descriptors in a
//!   single pass over a dataset, producing one [`BinTally`] per descriptor
//!
//! # Example
//!
//! ```rust
//! use binned_histogram::{count_bins, BinDesc};
//!
//! let data = vec![1.0, 2.0, 2.5, 6.0, 9.0];
//! let desc = BinDesc::spanning(1.0, 9.0, 4).unwrap();
//! let tally = count_bins(&data, &[desc]).unwrap().remove(0);
//!
//! assert_eq!(tally.counts(), &[3, 0, 1, 1]);
//! // The third smallest value (position 2) lives in bin 0
//! assert_eq!(tally.locate(2.0).unwrap().bin, 0);
//! ```

pub mod counter;
pub mod descriptor;

pub use counter::{count_bins, BinCounter, BinLocation, BinTally};
pub use descriptor::{BinDesc, BinRange};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{count_bins, BinDesc, BinRange, BinTally};
}
