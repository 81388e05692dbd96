//! Core traits for e-divisive change point detection
//!
//! The detector is split into two seams:
//! - a [`CandidateCalculator`] proposes the strongest split of each interval
//! - a [`SignificanceTester`] decides whether a proposed split is real
//!
//! Calculators are built through a [`CalculatorFactory`] so that testers
//! which need fresh calculators (the permutation test) can create them for
//! shuffled copies of the data.

use crate::types::{intervals_for, CandidateChangePoint, ChangePoint, Interval, TestStats};
use edivisive_core::Result;
use std::fmt;

/// Scores splits of a fixed series
pub trait CandidateCalculator {
    /// The series the calculator was built for
    fn series(&self) -> &[f64];

    /// Divergence statistic for splitting `interval` at `tau`
    ///
    /// `tau` must satisfy `interval.start < tau < interval.end`.
    fn score(&self, interval: Interval, tau: usize) -> Result<f64>;

    /// Best split of a single interval, `None` when it has fewer than two points
    fn best_split(&self, interval: Interval) -> Result<Option<CandidateChangePoint>>;

    /// Strongest split across all intervals
    ///
    /// Ties keep the candidate from the earliest interval.
    fn next_candidate(&self, intervals: &[Interval]) -> Result<Option<CandidateChangePoint>> {
        let mut best: Option<CandidateChangePoint> = None;
        for &interval in intervals {
            if let Some(candidate) = self.best_split(interval)? {
                if best.map_or(true, |b| candidate.qhat > b.qhat) {
                    best = Some(candidate);
                }
            }
        }
        Ok(best)
    }
}

/// Builds calculators for arbitrary series
pub trait CalculatorFactory: Clone {
    /// Calculator produced by this factory
    type Calculator: CandidateCalculator;

    /// Build a calculator owning `series`
    fn calculator(&self, series: Vec<f64>) -> Self::Calculator;

    /// Name of the divergence statistic
    fn algorithm_name(&self) -> &'static str;
}

/// Decides whether a candidate split is statistically significant
pub trait SignificanceTester {
    /// Statistics attached to every tested candidate
    type Stats: TestStats + Clone + fmt::Debug;

    /// Name of the test
    fn test_name(&self) -> &'static str;

    /// Significance level
    fn alpha(&self) -> f64;

    /// Test `candidate` against the current partition of `series`
    ///
    /// Takes `&mut self` because randomized testers advance their generator.
    fn evaluate(
        &mut self,
        candidate: CandidateChangePoint,
        series: &[f64],
        intervals: &[Interval],
    ) -> Result<ChangePoint<Self::Stats>>;

    /// Whether a tested change point passes the significance level
    fn is_significant(&self, point: &ChangePoint<Self::Stats>) -> bool {
        point.stats.pvalue() <= self.alpha()
    }

    /// Partition `[0, len)` at the given change points, which must be sorted
    fn intervals_for(&self, change_points: &[ChangePoint<Self::Stats>], len: usize) -> Result<Vec<Interval>> {
        let indices: Vec<usize> = change_points.iter().map(|cp| cp.index).collect();
        intervals_for(&indices, len)
    }
}
