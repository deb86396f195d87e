//! ChiMerge discretization of continuous numeric attributes.
//!
//! Builds one interval per distinct attribute value, then repeatedly merges
//! the adjacent pair whose class-frequency distributions are least
//! distinguishable (lowest chi-square score) until a stopping criterion
//! halts the loop.

mod chi;
mod dataset;
mod errors;
mod interval;
mod utils;

pub use chi::ChiSquareTest;
pub use dataset::Dataset;
pub use errors::ChiMergeError;
pub use interval::{ChiMergeConfig, Interval, IntervalTable};
