//! Core value types shared across the crate.
//!
//! - [`ValueSpan`]: numeric aggregate over stochastic outcomes
//! - [`SimRng`]: deterministic, forkable RNG for feeder sampling

pub mod rng;
pub mod span;

pub use rng::SimRng;
pub use span::ValueSpan;
