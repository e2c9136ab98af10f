//! Numeric trait for values the binned algorithms operate on
//!
//! Values are floating point: bin edges, widths and interpolation all need
//! fractional arithmetic. Weights are always accumulated in `f64` so that
//! `f32` datasets do not lose counts once tallies exceed 2^24.

use num_traits::Float;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt::{Debug, Display};

/// Floating point element type of a dataset
pub trait Numeric: Float + Debug + Display + Default + Send + Sync + 'static {
    /// Total order used by the selector (NaN never reaches it)
    fn order_cmp(&self, other: &Self) -> Ordering;

    /// Widen to `f64` for weight accumulation
    fn as_f64(self) -> f64;

    /// Narrow from `f64` (interpolation factors, deviations)
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_numeric {
    ($t:ty) => {
        impl Numeric for $t {
            #[inline]
            fn order_cmp(&self, other: &Self) -> Ordering {
                OrderedFloat(*self).cmp(&OrderedFloat(*other))
            }

            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }
        }
    };
}

impl_numeric!(f32);
impl_numeric!(f64);
