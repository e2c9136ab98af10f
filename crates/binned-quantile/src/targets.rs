//! Rank targets and their weighted order positions
//!
//! A fraction `f` over qualifying data of total weight `W` denotes the
//! weighted position `p = f * (W - 1)`, clamped at zero. The value at an
//! integral position `k` is the element whose cumulative weight interval
//! `[C(i-1), C(i))` in ascending order contains `k`. A non-integral `p` is
//! linearly interpolated between the values at `floor(p)` and `floor(p) + 1`,
//! which for unit weights reproduces the usual even-count median average.

use crate::{Error, Result};
use binned_core::Numeric;
use std::collections::BTreeSet;

/// An order statistic requested by a caller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankTarget {
    /// The middle of the weighted order
    Median,
    /// An explicit fraction in (0, 1)
    Fraction(f64),
}

impl RankTarget {
    pub fn fraction(&self) -> f64 {
        match self {
            RankTarget::Median => 0.5,
            RankTarget::Fraction(p) => *p,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            RankTarget::Median => Ok(()),
            RankTarget::Fraction(p) => Error::check_fractions(&[*p]),
        }
    }
}

/// The one or two integral positions a target reads, and how to blend them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lo: u64,
    /// Present only when the position is non-integral
    pub hi: Option<u64>,
    /// Distance of the position above `lo`, in `[0, 1)`
    pub frac: f64,
}

impl Bracket {
    pub fn at(fraction: f64, total_weight: f64) -> Self {
        let p = (fraction * (total_weight - 1.0)).max(0.0);
        let floor = p.floor();
        let frac = p - floor;
        let lo = floor as u64;
        Self {
            lo,
            hi: (frac > 0.0).then_some(lo + 1),
            frac,
        }
    }

    /// Blend the values read at `lo` and `hi`
    pub fn interpolate<T: Numeric>(&self, lo: T, hi: T) -> T {
        if self.frac == 0.0 || lo == hi {
            lo
        } else {
            lo + (hi - lo) * T::from_f64(self.frac)
        }
    }
}

/// Positions needed to answer a set of targets, deduplicated across targets
#[derive(Debug, Clone, PartialEq)]
pub struct RankPlan {
    brackets: Vec<Bracket>,
    positions: Vec<u64>,
}

impl RankPlan {
    pub fn new(targets: &[RankTarget], total_weight: f64) -> Self {
        let brackets: Vec<Bracket> = targets
            .iter()
            .map(|t| Bracket::at(t.fraction(), total_weight))
            .collect();
        let positions: BTreeSet<u64> = brackets
            .iter()
            .flat_map(|b| std::iter::once(b.lo).chain(b.hi))
            .collect();
        Self {
            brackets,
            positions: positions.into_iter().collect(),
        }
    }

    /// Every distinct integral position, ascending
    pub fn positions(&self) -> &[u64] {
        &self.positions
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    /// Combine the values found at each position into one result per target
    pub fn evaluate<T, F>(&self, mut lookup: F) -> Result<Vec<T>>
    where
        T: Numeric,
        F: FnMut(u64) -> Option<T>,
    {
        self.brackets
            .iter()
            .map(|b| {
                let lo = lookup(b.lo).ok_or(Error::EmptyData)?;
                match b.hi {
                    Some(k) => {
                        let hi = lookup(k).ok_or(Error::EmptyData)?;
                        Ok(b.interpolate(lo, hi))
                    }
                    None => Ok(lo),
                }
            })
            .collect()
    }
}

/// Reject targets and caller-supplied extents that can never be answered
pub fn check_request<T: Numeric>(targets: &[RankTarget], npts: u64, min: T, max: T) -> Result<()> {
    for target in targets {
        target.validate()?;
    }
    if npts == 0 {
        return Err(Error::EmptyData);
    }
    if !(min.is_finite() && max.is_finite() && min <= max) {
        return Err(binned_core::Error::invalid_range(min, max).into());
    }
    Ok(())
}
