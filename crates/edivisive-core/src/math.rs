//! Mathematical utilities for change point analysis
//!
//! Basic descriptive statistics and the Student's t machinery needed by the
//! parametric significance test.

use crate::{Error, Result};

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator)
///
/// Returns 0 for fewer than two observations; a single observation carries no
/// spread information and is treated as a zero-variance segment.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values
        .iter()
        .map(|&x| {
            let d = x - m;
            d * d
        })
        .sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Relative change from `before` to `after`, i.e. `after / before - 1`
///
/// A zero baseline yields an infinite change (signed by `after`) unless both
/// values are zero, in which case there is no change.
pub fn relative_change(before: f64, after: f64) -> f64 {
    if before == 0.0 {
        if after == 0.0 {
            return 0.0;
        }
        return f64::INFINITY.copysign(after);
    }
    after / before - 1.0
}

/// Distribution-related mathematical functions
pub mod distributions {
    /// Student's t distribution utilities
    pub mod students_t {
        use crate::{Error, Result};
        use statrs::distribution::{ContinuousCDF, StudentsT};

        /// Two-sided tail probability `P(|T| >= |t|)` for `df` degrees of freedom
        pub fn two_sided_pvalue(t: f64, df: f64) -> Result<f64> {
            if df.is_nan() || df <= 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "degrees of freedom must be positive, got {df}"
                )));
            }
            if t.is_nan() {
                return Err(Error::non_finite("t statistic"));
            }
            let dist = StudentsT::new(0.0, 1.0, df)
                .map_err(|e| Error::InvalidParameter(e.to_string()))?;
            // Lower tail of -|t| keeps precision for tiny p-values
            let p = 2.0 * dist.cdf(-t.abs());
            Ok(p.clamp(0.0, 1.0))
        }

    }
}

/// Summary of a contiguous segment used by the two-sample comparisons
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSummary {
    /// Number of observations
    pub len: usize,
    /// Arithmetic mean (0 for an empty segment)
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
}

impl SegmentSummary {
    /// Summarize a slice of observations
    pub fn of(values: &[f64]) -> Self {
        Self {
            len: values.len(),
            mean: mean(values).unwrap_or(0.0),
            std_dev: std_dev(values),
        }
    }
}

/// Ensure every value is finite
pub fn check_finite(values: &[f64], context: &str) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::non_finite(context));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std() {
        assert_eq!(mean(&[]), None);
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5);
        assert_eq!(std_dev(&[5.0]), 0.0);
        assert_relative_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.138089935299395, epsilon = 1e-12);
    }

    #[test]
    fn test_relative_change() {
        assert_relative_eq!(relative_change(1.0, 0.5), -0.5);
        assert_relative_eq!(relative_change(2.0, 3.0), 0.5);
        assert_eq!(relative_change(0.0, 0.0), 0.0);
        assert_eq!(relative_change(0.0, 1.0), f64::INFINITY);
        assert_eq!(relative_change(0.0, -1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_segment_summary() {
        let s = SegmentSummary::of(&[0.0, 0.0, 0.0]);
        assert_eq!(s.len, 3);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.std_dev, 0.0);

        let empty = SegmentSummary::of(&[]);
        assert_eq!(empty.len, 0);
        assert_eq!(empty.mean, 0.0);
    }

    #[test]
    fn test_check_finite() {
        assert!(check_finite(&[1.0, 2.0], "data").is_ok());
        assert!(check_finite(&[1.0, f64::NAN], "data").is_err());
        assert!(check_finite(&[f64::INFINITY], "data").is_err());
    }

    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_std_dev_shift_invariant(
                xs in prop::collection::vec(-1e3f64..1e3, 2..50),
                shift in -1e3f64..1e3,
            ) {
                let shifted: Vec<f64> = xs.iter().map(|x| x + shift).collect();
                let a = std_dev(&xs);
                let b = std_dev(&shifted);
                prop_assert!(a >= 0.0);
                prop_assert!((a - b).abs() <= 1e-9 * a.max(1.0));
            }

            #[test]
            fn prop_pvalue_in_unit_interval(t in -50.0f64..50.0, df in 1.0f64..200.0) {
                let p = distributions::students_t::two_sided_pvalue(t, df).unwrap();
                prop_assert!((0.0..=1.0).contains(&p));
            }
        }
    }
}
