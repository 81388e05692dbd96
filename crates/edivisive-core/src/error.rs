//! Error types for change point analysis
//!
//! Provides a unified error type for all edivisive crates. Collaborators that
//! feed series into the analysis can surface their own failures through
//! [`Error::Other`]:
//!
//! ```rust
//! use edivisive_core::{Error, Result};
//!
//! fn parse_sample(raw: &str) -> Result<f64> {
//!     let value = raw
//!         .trim()
//!         .parse::<f64>()
//!         .map_err(|e| anyhow::anyhow!("bad sample {raw:?}: {e}"))?;
//!     Ok(value)
//! }
//!
//! assert_eq!(parse_sample(" 1.5 ").unwrap(), 1.5);
//! assert!(matches!(parse_sample("n/a"), Err(Error::Other(_))));
//! ```

use thiserror::Error;

/// Core error type for change point analysis
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Fewer observations than the operation needs
    #[error("Insufficient data: expected at least {expected} samples, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Parallel columns disagree on length
    #[error("Length mismatch in {context}: expected {expected}, got {actual}")]
    LengthMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Timestamps went backwards
    #[error("Non-monotonic time axis at position {index}")]
    NonMonotonicTime { index: usize },

    /// Metric name not tracked by the series
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Append request carried no metric data
    #[error("Append must contain data for at least one metric")]
    EmptyAppend,

    /// Change points handed to interval derivation were not sorted by index
    #[error("Change points are not sorted by index (position {position})")]
    UnsortedChangePoints { position: usize },

    /// Interval does not fit the series it is applied to
    #[error("Interval [{start}, {end}) is out of bounds for series of length {len}")]
    IntervalOutOfBounds { start: usize, end: usize, len: usize },

    /// Report serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::LengthMismatch {
            context: context.to_string(),
            expected,
            actual,
        }
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::InvalidInput(format!("{context} contains NaN or infinite values"))
    }
}
