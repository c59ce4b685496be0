//! Numeric aggregates over stochastic outcomes.
//!
//! A [`ValueSpan`] represents a quantity (score, gold, cleared counts) whose
//! value varies across randomized simulation runs. It records the observed
//! minimum, maximum, and mean along with the number of samples that produced
//! them.
//!
//! ## Ordering
//!
//! Spans are ranked by central tendency: the total order compares
//! `(mean, min, max, samples)` lexicographically using `f64::total_cmp`.
//! This is the order used everywhere results are ranked; equal-ranked
//! elements are broken by insertion order in the containing collection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// An immutable numeric aggregate over one or more stochastic outcomes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ValueSpan {
    min: f64,
    max: f64,
    mean: f64,
    samples: u32,
}

impl ValueSpan {
    /// The zero span: no observed value, everything at 0.
    pub const ZERO: ValueSpan = ValueSpan {
        min: 0.0,
        max: 0.0,
        mean: 0.0,
        samples: 1,
    };

    /// Create a span from a single observed value.
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            mean: value,
            samples: 1,
        }
    }

    /// Create a span summarizing a collection of observed values.
    ///
    /// An empty iterator yields [`ValueSpan::ZERO`].
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return Self::ZERO;
        };
        let mut span = Self::from_value(first);
        for v in iter {
            span = span.merge(&Self::from_value(v));
        }
        span
    }

    /// Smallest observed value.
    #[must_use]
    pub fn min(self) -> f64 {
        self.min
    }

    /// Largest observed value.
    #[must_use]
    pub fn max(self) -> f64 {
        self.max
    }

    /// Mean of the observed values.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of samples this span summarizes.
    #[must_use]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Sum of two spans as random quantities: bounds and means add.
    ///
    /// The sample count carries over as the larger of the two.
    #[must_use]
    pub fn add(&self, other: &ValueSpan) -> ValueSpan {
        ValueSpan {
            min: self.min + other.min,
            max: self.max + other.max,
            mean: self.mean + other.mean,
            samples: self.samples.max(other.samples),
        }
    }

    /// Scale every component by `factor`.
    ///
    /// A negative factor swaps the bounds so `min <= max` still holds.
    #[must_use]
    pub fn scale(&self, factor: f64) -> ValueSpan {
        let (lo, hi) = if factor < 0.0 {
            (self.max * factor, self.min * factor)
        } else {
            (self.min * factor, self.max * factor)
        };
        ValueSpan {
            min: lo,
            max: hi,
            mean: self.mean * factor,
            samples: self.samples,
        }
    }

    /// Statistical union of two spans: pooled bounds, sample-weighted mean.
    ///
    /// This combination rule is linear in member count, so merging `{A, B}`
    /// and then `{C}` equals merging `{A, B, C}` directly.
    #[must_use]
    pub fn merge(&self, other: &ValueSpan) -> ValueSpan {
        let samples = self.samples + other.samples;
        let mean = if samples == 0 {
            0.0
        } else {
            (self.mean * f64::from(self.samples) + other.mean * f64::from(other.samples))
                / f64::from(samples)
        };
        ValueSpan {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            mean,
            samples,
        }
    }
}

impl Default for ValueSpan {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for ValueSpan {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ValueSpan {}

impl PartialOrd for ValueSpan {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValueSpan {
    fn cmp(&self, other: &Self) -> Ordering {
        self.mean
            .total_cmp(&other.mean)
            .then_with(|| self.min.total_cmp(&other.min))
            .then_with(|| self.max.total_cmp(&other.max))
            .then_with(|| self.samples.cmp(&other.samples))
    }
}

impl Hash for ValueSpan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.min.to_bits().hash(state);
        self.max.to_bits().hash(state);
        self.mean.to_bits().hash(state);
        self.samples.hash(state);
    }
}

impl std::fmt::Display for ValueSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.mean)
        } else {
            write!(f, "{} ({}..{})", self.mean, self.min, self.max)
        }
    }
}
