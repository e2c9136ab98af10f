//! Error types for binned quantile computation

use thiserror::Error;

/// Errors that can occur while resolving order statistics
#[derive(Error, Debug)]
pub enum Error {
    /// No point qualifies (zero `npts`, or zero total weight found in a pass)
    #[error("Cannot compute quantile of empty data")]
    EmptyData,

    /// Requested fraction outside the open interval (0, 1)
    #[error("Quantile fraction {p} must be in (0, 1)")]
    InvalidFraction { p: f64 },

    /// A bin that cannot be refined further holds more points than the
    /// configured maximum buffer
    #[error("Bin population {population} exceeds the maximum buffer of {limit} elements")]
    BufferOverflow { population: u64, limit: u64 },

    /// Core computation error
    #[error("Core computation error: {0}")]
    Core(#[from] binned_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions
impl Error {
    /// Check that every fraction lies strictly inside (0, 1)
    pub fn check_fractions(fractions: &[f64]) -> Result<()> {
        match fractions.iter().find(|&&p| !(p > 0.0 && p < 1.0)) {
            Some(&p) => Err(Error::InvalidFraction { p }),
            None => Ok(()),
        }
    }

    /// Whether the caller asked for something that can never be answered
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidFraction { .. } | Error::Core(binned_core::Error::InvalidParameter(_))
        )
    }

    /// Whether the configured memory bounds were too small for the data
    pub fn is_resource(&self) -> bool {
        matches!(self, Error::BufferOverflow { .. })
    }

    /// Whether a caller-side contract (`npts`, `min`, `max`) was violated
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::EmptyData | Error::Core(binned_core::Error::Precondition(_))
        )
    }
}
