//! Metric names for clawline, on top of the `metrics` crate facade.
//!
//! Crates depend on this behind an optional `metrics` feature and record
//! through the re-exported macros:
//!
//! ```rust,ignore
//! use clawline_metrics::{counter, media_understanding, labels};
//!
//! counter!(media_understanding::RUNS_TOTAL, labels::CAPABILITY => "image").increment(1);
//! ```
//!
//! Installing a recorder/exporter is left to the embedding binary.

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, histogram};
