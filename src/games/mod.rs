//! Reference implementations that exercise the simulation core.
//!
//! The cascade module provides the deterministic match-3 resolution engine
//! and span aggregator wired in by default and driven by the integration
//! tests.

pub mod cascade;

pub use cascade::{CascadeExecutor, SpanAggregator};
