//! Error types for binned order statistics
//!
//! Provides the error type shared by all binned-stats crates.

use thiserror::Error;

/// Core error type for binned statistical operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A caller-side contract was violated (empty dataset, inverted range, ...)
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// The dataset cursor failed while scanning
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration could not be parsed or serialized
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error (for cursors backed by files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for an empty dataset
    pub fn empty_dataset() -> Self {
        Self::Precondition("dataset has no qualifying points".to_string())
    }

    /// Create an error for an inverted or non-finite value range
    pub fn invalid_range<T: std::fmt::Display>(min: T, max: T) -> Self {
        Self::Precondition(format!("invalid data range [{min}, {max}]"))
    }

    /// Create an error for a caller-supplied point count that the data does
    /// not bear out
    pub fn count_mismatch(claimed: u64, found: u64) -> Self {
        Self::Precondition(format!(
            "caller claimed {claimed} qualifying points inside [min, max], found {found}"
        ))
    }

    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }
}
