//! Configuration for the quantile computers
//!
//! `QuantileConfig` carries the caller-tunable knobs of the histogram
//! refinement algorithm. It is plain data (serde-friendly) so that callers can
//! load it from a settings file; use [`QuantileConfig::builder`] to get a
//! validated value in code.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::mem::size_of;

/// Default materialization budget: 16 MiB
pub const DEFAULT_BUDGET_BYTES: usize = 4096 * 4096;

/// Default number of bins per histogram
pub const DEFAULT_BIN_COUNT: usize = 10_000;

/// Largest number of bins a histogram may have
pub const MAX_BIN_COUNT: usize = 1 << 20;

/// Default cap on refinement rounds
pub const DEFAULT_MAX_REFINEMENTS: usize = 64;

/// The hard buffer cap defaults to this multiple of the budget
const DEFAULT_BUFFER_FACTOR: usize = 4;

/// Tuning parameters for binned quantile computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantileConfig {
    /// A bin (or the whole dataset) whose population fits in this many bytes
    /// is materialized and selected from directly
    pub budget_bytes: usize,

    /// Hard cap for extraction buffers. A bin that cannot be refined any
    /// further and still exceeds this is reported as a resource error.
    /// `None` means four times `budget_bytes`.
    pub max_buffer_bytes: Option<usize>,

    /// Keep a sorted copy of the whole dataset when it fits the budget, so
    /// later calls on the same computer need no scan
    pub persist_sorted: bool,

    /// Number of bins per histogram (clamped to at least 2)
    pub bin_count_hint: usize,

    /// Maximum number of refinement rounds before giving up on splitting
    pub max_refinements: usize,
}

impl Default for QuantileConfig {
    fn default() -> Self {
        Self {
            budget_bytes: DEFAULT_BUDGET_BYTES,
            max_buffer_bytes: None,
            persist_sorted: false,
            bin_count_hint: DEFAULT_BIN_COUNT,
            max_refinements: DEFAULT_MAX_REFINEMENTS,
        }
    }
}

impl QuantileConfig {
    /// Start building a configuration from the defaults
    pub fn builder() -> QuantileConfigBuilder {
        QuantileConfigBuilder::default()
    }

    /// Number of elements of type `T` that may be materialized at once
    pub fn materialize_len<T>(&self) -> usize {
        (self.budget_bytes / size_of::<T>().max(1)).max(1)
    }

    /// Hard cap, in elements, for any extraction buffer
    pub fn max_buffer_len<T>(&self) -> usize {
        let bytes = self
            .max_buffer_bytes
            .unwrap_or_else(|| self.budget_bytes.saturating_mul(DEFAULT_BUFFER_FACTOR));
        (bytes / size_of::<T>().max(1)).max(self.materialize_len::<T>())
    }

    /// Bins per histogram actually used
    pub fn effective_bins(&self) -> usize {
        self.bin_count_hint.max(2)
    }

    /// Check the invariants the computers rely on
    pub fn validate(&self) -> Result<()> {
        if self.budget_bytes == 0 {
            return Err(Error::InvalidParameter(
                "budget_bytes must be positive".to_string(),
            ));
        }
        if let Some(max) = self.max_buffer_bytes {
            if max < self.budget_bytes {
                return Err(Error::InvalidParameter(format!(
                    "max_buffer_bytes ({max}) must be at least budget_bytes ({})",
                    self.budget_bytes
                )));
            }
        }
        if self.bin_count_hint == 0 {
            return Err(Error::InvalidParameter(
                "bin_count_hint must be positive".to_string(),
            ));
        }
        if self.bin_count_hint > MAX_BIN_COUNT {
            return Err(Error::InvalidParameter(format!(
                "bin_count_hint ({}) exceeds the maximum of {MAX_BIN_COUNT}",
                self.bin_count_hint
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for [`QuantileConfig`]
#[derive(Debug, Clone, Default)]
pub struct QuantileConfigBuilder {
    config: QuantileConfig,
}

impl QuantileConfigBuilder {
    pub fn budget_bytes(mut self, bytes: usize) -> Self {
        self.config.budget_bytes = bytes;
        self
    }

    pub fn max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.config.max_buffer_bytes = Some(bytes);
        self
    }

    pub fn persist_sorted(mut self, persist: bool) -> Self {
        self.config.persist_sorted = persist;
        self
    }

    pub fn bin_count_hint(mut self, bins: usize) -> Self {
        self.config.bin_count_hint = bins;
        self
    }

    pub fn max_refinements(mut self, rounds: usize) -> Self {
        self.config.max_refinements = rounds;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<QuantileConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
