//! Types used for change point detection

use crate::permutation::PermutationStats;
use crate::ttest::TTestStats;
use edivisive_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Half-open range of positions `[start, end)` within a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// First position (inclusive)
    pub start: usize,
    /// One past the last position
    pub end: usize,
}

impl Interval {
    /// Create a new interval
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Interval covering a whole series of `len` elements
    pub fn whole(len: usize) -> Self {
        Self { start: 0, end: len }
    }

    /// Number of positions in the interval
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the interval is empty
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `index` falls inside the interval
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Convert to a standard Range
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Check that the interval fits a series of `len` elements
    pub fn check_bounds(&self, len: usize) -> Result<()> {
        if self.start > self.end || self.end > len {
            return Err(Error::IntervalOutOfBounds {
                start: self.start,
                end: self.end,
                len,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Tile `[0, len)` with the non-empty intervals bounded by `indices`
///
/// `indices` must be sorted in non-decreasing order; anything else is a
/// contract violation and is reported as [`Error::UnsortedChangePoints`].
pub fn intervals_for(indices: &[usize], len: usize) -> Result<Vec<Interval>> {
    if let Some(position) = indices.windows(2).position(|w| w[0] > w[1]) {
        return Err(Error::UnsortedChangePoints {
            position: position + 1,
        });
    }
    if let Some(&last) = indices.last() {
        if last > len {
            return Err(Error::IntervalOutOfBounds {
                start: last,
                end: len,
                len,
            });
        }
    }

    let mut intervals = Vec::with_capacity(indices.len() + 1);
    let mut start = 0;
    for &end in indices.iter().chain(std::iter::once(&len)) {
        if end != start {
            intervals.push(Interval::new(start, end));
        }
        start = end;
    }
    Ok(intervals)
}

/// Best split of an interval, not yet tested for significance
///
/// `index` is the first element of the right-hand segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateChangePoint {
    /// Position of the split
    pub index: usize,
    /// Divergence statistic at the split
    pub qhat: f64,
}

impl CandidateChangePoint {
    /// Create a new candidate
    pub fn new(index: usize, qhat: f64) -> Self {
        Self { index, qhat }
    }
}

impl fmt::Display for CandidateChangePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Candidate {{ index: {}, qhat: {:.4} }}", self.index, self.qhat)
    }
}

/// Statistics produced by a significance test
pub trait TestStats {
    /// Probability of a split at least this strong under the null hypothesis
    fn pvalue(&self) -> f64;
}

/// A candidate upgraded with the statistics of its significance test
///
/// Two change points are equal when they sit at the same index, regardless
/// of their statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ChangePoint<S> {
    /// Position of the change (first element of the new regime)
    pub index: usize,
    /// Divergence statistic at the split
    pub qhat: f64,
    /// Significance test statistics
    pub stats: S,
}

impl<S> ChangePoint<S> {
    /// Attach test statistics to a candidate
    pub fn from_candidate(candidate: CandidateChangePoint, stats: S) -> Self {
        Self {
            index: candidate.index,
            qhat: candidate.qhat,
            stats,
        }
    }

    /// Drop the statistics, e.g. to re-test a weak change point
    pub fn to_candidate(&self) -> CandidateChangePoint {
        CandidateChangePoint::new(self.index, self.qhat)
    }

    /// Convert the statistics into another representation
    pub fn map_stats<U>(self, f: impl FnOnce(S) -> U) -> ChangePoint<U> {
        ChangePoint {
            index: self.index,
            qhat: self.qhat,
            stats: f(self.stats),
        }
    }

    /// Shift the position by `offset`, used when detecting inside a sub-window
    pub fn shifted(mut self, offset: usize) -> Self {
        self.index += offset;
        self
    }
}

impl<S: TestStats> ChangePoint<S> {
    /// P-value of the significance test
    pub fn pvalue(&self) -> f64 {
        self.stats.pvalue()
    }
}

impl<S> PartialEq for ChangePoint<S> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<S> Eq for ChangePoint<S> {}

impl<S: TestStats> fmt::Display for ChangePoint<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChangePoint {{ index: {}, qhat: {:.4}, pvalue: {:.6} }}",
            self.index,
            self.qhat,
            self.stats.pvalue()
        )
    }
}

/// Statistics of either significance test
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum TestStatistics {
    /// Parametric two-sample t-test
    TTest(TTestStats),
    /// Permutation test
    Permutation(PermutationStats),
}

impl TestStatistics {
    /// Name of the test that produced these statistics
    pub fn test_name(&self) -> &'static str {
        match self {
            TestStatistics::TTest(_) => "t-test",
            TestStatistics::Permutation(_) => "permutation",
        }
    }
}

impl TestStats for TestStatistics {
    fn pvalue(&self) -> f64 {
        match self {
            TestStatistics::TTest(s) => s.pvalue,
            TestStatistics::Permutation(s) => s.pvalue,
        }
    }
}

impl From<TTestStats> for TestStatistics {
    fn from(stats: TTestStats) -> Self {
        TestStatistics::TTest(stats)
    }
}

impl From<PermutationStats> for TestStatistics {
    fn from(stats: PermutationStats) -> Self {
        TestStatistics::Permutation(stats)
    }
}
