//! Analysis modules.
//!
//! Trend computation over stored job records.

pub mod aggregator;

pub use aggregator::*;
