//! Core types for e-divisive change point detection
//!
//! This crate provides the pieces shared by every layer of the workspace:
//!
//! - [`Error`] / [`Result`]: the unified error type. Input invariant
//!   violations, contract violations (unsorted change points) and
//!   serialization failures all surface here.
//! - [`math`]: descriptive statistics and the Student's t tail probability
//!   used by the parametric significance test.
//!
//! # Example
//!
//! ```rust
//! use edivisive_core::math::{mean, std_dev, distributions::students_t};
//!
//! let left = [1.02, 0.95, 0.99, 1.00];
//! let m = mean(&left).unwrap();
//! let s = std_dev(&left);
//! let p = students_t::two_sided_pvalue(3.5, 9.0).unwrap();
//!
//! println!("mean={m:.3} sd={s:.3} p={p:.4}");
//! ```

pub mod error;
pub mod math;

// Re-export core types
pub use error::{Error, Result};
pub use math::SegmentSummary;
