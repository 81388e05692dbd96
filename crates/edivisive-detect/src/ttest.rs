//! Parametric significance test
//!
//! Student's two-sample t-test with pooled variance between the segments on
//! either side of a candidate, bounded by the surrounding interval.

use crate::traits::SignificanceTester;
use crate::types::{CandidateChangePoint, ChangePoint, Interval, TestStats};
use edivisive_core::math::{distributions::students_t, relative_change, SegmentSummary};
use edivisive_core::{Error, Result};
use serde::Serialize;

/// Statistics of a two-sample t-test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TTestStats {
    /// Two-sided p-value
    pub pvalue: f64,
    /// Mean of the segment before the split
    pub mean_before: f64,
    /// Mean of the segment after the split
    pub mean_after: f64,
    /// Sample standard deviation before the split
    pub std_before: f64,
    /// Sample standard deviation after the split
    pub std_after: f64,
    /// Observations before the split
    pub n_before: usize,
    /// Observations after the split
    pub n_after: usize,
    /// t statistic, 0 when the test is degenerate
    pub t_statistic: f64,
}

impl TTestStats {
    /// `mean_after / mean_before - 1`
    pub fn forward_change(&self) -> f64 {
        relative_change(self.mean_before, self.mean_after)
    }

    /// `mean_before / mean_after - 1`
    pub fn backward_change(&self) -> f64 {
        relative_change(self.mean_after, self.mean_before)
    }

    /// Absolute relative change of the mean across the split
    pub fn magnitude(&self) -> f64 {
        self.forward_change().abs()
    }
}

impl TestStats for TTestStats {
    fn pvalue(&self) -> f64 {
        self.pvalue
    }
}

/// Compare two segments with Student's t-test
///
/// Degenerate inputs are defined rather than rejected: an empty side or fewer
/// than three observations overall yield p = 1, a zero standard error yields
/// p = 0 when the means differ and p = 1 otherwise.
pub fn compare(before: &[f64], after: &[f64]) -> Result<TTestStats> {
    let left = SegmentSummary::of(before);
    let right = SegmentSummary::of(after);
    let mut stats = TTestStats {
        pvalue: 1.0,
        mean_before: left.mean,
        mean_after: right.mean,
        std_before: left.std_dev,
        std_after: right.std_dev,
        n_before: left.len,
        n_after: right.len,
        t_statistic: 0.0,
    };

    let (n1, n2) = (left.len, right.len);
    if n1 == 0 || n2 == 0 || n1 + n2 <= 2 {
        return Ok(stats);
    }

    let df = (n1 + n2 - 2) as f64;
    let pooled = ((n1 - 1) as f64 * left.std_dev * left.std_dev
        + (n2 - 1) as f64 * right.std_dev * right.std_dev)
        / df;
    let se = (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
    if se == 0.0 {
        stats.pvalue = if left.mean != right.mean { 0.0 } else { 1.0 };
        return Ok(stats);
    }

    let t = (left.mean - right.mean) / se;
    stats.t_statistic = t;
    stats.pvalue = students_t::two_sided_pvalue(t, df)?;
    Ok(stats)
}

/// Parametric tester, the fast default for windowed analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestTester {
    alpha: f64,
}

impl TTestTester {
    /// Create a tester with significance level `alpha` in (0, 1]
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "significance level must be in (0, 1], got {alpha}"
            )));
        }
        Ok(Self { alpha })
    }

    /// Test the split at `index` against the interval of `intervals` containing it
    pub fn test_at(&self, index: usize, series: &[f64], intervals: &[Interval]) -> Result<TTestStats> {
        let interval = intervals
            .iter()
            .find(|iv| iv.contains(index))
            .ok_or_else(|| {
                Error::InvalidInput(format!("split {index} is not inside any interval"))
            })?;
        interval.check_bounds(series.len())?;
        compare(&series[interval.start..index], &series[index..interval.end])
    }
}

impl SignificanceTester for TTestTester {
    type Stats = TTestStats;

    fn test_name(&self) -> &'static str {
        "t-test"
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn evaluate(
        &mut self,
        candidate: CandidateChangePoint,
        series: &[f64],
        intervals: &[Interval],
    ) -> Result<ChangePoint<TTestStats>> {
        let stats = self.test_at(candidate.index, series, intervals)?;
        Ok(ChangePoint::from_candidate(candidate, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clear_shift_is_significant() {
        let before = [1.02, 0.95, 0.99, 1.00, 1.12, 0.90];
        let after = [0.50, 0.51, 0.48, 0.48, 0.55];
        let stats = compare(&before, &after).unwrap();
        assert!(stats.pvalue < 1e-6);
        assert!(stats.t_statistic > 0.0);
        assert_eq!(stats.n_before, 6);
        assert_eq!(stats.n_after, 5);
        assert_relative_eq!(stats.mean_after, 0.504, epsilon = 1e-12);
    }

    #[test]
    fn test_identical_segments_are_not_significant() {
        let stats = compare(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(stats.pvalue, 1.0, epsilon = 1e-12);
        assert_eq!(stats.t_statistic, 0.0);
    }

    #[test]
    fn test_degenerate_cases() {
        assert_eq!(compare(&[], &[1.0, 2.0]).unwrap().pvalue, 1.0);
        assert_eq!(compare(&[1.0], &[5.0]).unwrap().pvalue, 1.0);
        // Zero variance on both sides
        assert_eq!(compare(&[0.0, 0.0, 0.0], &[1.0, 1.0]).unwrap().pvalue, 0.0);
        assert_eq!(compare(&[2.0, 2.0], &[2.0, 2.0]).unwrap().pvalue, 1.0);
    }

    #[test]
    fn test_relative_changes() {
        let stats = compare(&[2.0, 2.0, 2.0], &[1.0, 1.0]).unwrap();
        assert_relative_eq!(stats.forward_change(), -0.5);
        assert_relative_eq!(stats.backward_change(), 1.0);
        assert_relative_eq!(stats.magnitude(), 0.5);

        let from_zero = compare(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert_eq!(from_zero.magnitude(), f64::INFINITY);
    }

    #[test]
    fn test_evaluate_uses_enclosing_interval() {
        let series = [0.0, 0.1, 0.0, 5.0, 5.1, 5.0, 9.0, 9.1, 9.0];
        let mut tester = TTestTester::new(0.01).unwrap();
        let intervals = [Interval::new(0, 6), Interval::new(6, 9)];
        let cp = tester
            .evaluate(CandidateChangePoint::new(3, 1.0), &series, &intervals)
            .unwrap();
        // Only [0, 6) takes part; the last segment is ignored
        assert_eq!(cp.stats.n_before, 3);
        assert_eq!(cp.stats.n_after, 3);
        assert!(tester.is_significant(&cp));

        let outside = tester.evaluate(CandidateChangePoint::new(9, 1.0), &series, &intervals);
        assert!(outside.is_err());
    }

    #[test]
    fn test_alpha_validation() {
        assert!(TTestTester::new(0.0).is_err());
        assert!(TTestTester::new(1.5).is_err());
        assert!(TTestTester::new(1.0).is_ok());
    }
}
