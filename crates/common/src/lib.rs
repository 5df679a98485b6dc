//! Shared message types and error helpers used across all clawline crates.

pub mod error;
pub mod types;

pub use error::FromMessage;
