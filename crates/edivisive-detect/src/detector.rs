//! Greedy recursive-partitioning detector
//!
//! Repeatedly finds the strongest split across the current interval tiling,
//! tests it against that tiling and inserts it into the sorted list of
//! confirmed change points. Stops when no interval can be split or the first
//! candidate fails the significance test.

use crate::calculator::PairDistance;
use crate::traits::{CalculatorFactory, CandidateCalculator, SignificanceTester};
use crate::types::{ChangePoint, TestStats};
use edivisive_core::math::check_finite;
use edivisive_core::Result;
use std::fmt;
use tracing::{debug, instrument};

/// Why the detection loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No interval had two or more observations left to split
    Exhausted,
    /// The strongest remaining candidate was not significant
    Insignificant,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => write!(f, "exhausted"),
            Termination::Insignificant => write!(f, "first insignificant"),
        }
    }
}

/// Result of one detection pass
#[derive(Debug, Clone)]
pub struct Detection<S> {
    change_points: Vec<ChangePoint<S>>,
    rejected: Option<ChangePoint<S>>,
    termination: Termination,
    sample_size: usize,
}

impl<S> Detection<S> {
    /// Confirmed change points sorted by index
    pub fn change_points(&self) -> &[ChangePoint<S>] {
        &self.change_points
    }

    /// Consume the result, keeping the confirmed change points
    pub fn into_change_points(self) -> Vec<ChangePoint<S>> {
        self.change_points
    }

    /// Candidate that failed the test and ended the loop
    pub fn rejected(&self) -> Option<&ChangePoint<S>> {
        self.rejected.as_ref()
    }

    /// Terminal state of the loop
    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Number of observations analyzed
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Indices of the confirmed change points
    pub fn indices(&self) -> Vec<usize> {
        self.change_points.iter().map(|cp| cp.index).collect()
    }
}

/// E-divisive change point detector
#[derive(Debug, Clone)]
pub struct ChangePointDetector<T, F = PairDistance> {
    tester: T,
    factory: F,
}

impl<T: SignificanceTester> ChangePointDetector<T, PairDistance> {
    /// Detector with the default absolute-difference calculator
    pub fn new(tester: T) -> Self {
        Self::with_factory(tester, PairDistance::default())
    }
}

impl<T: SignificanceTester, F: CalculatorFactory> ChangePointDetector<T, F> {
    /// Detector building calculators with `factory`
    pub fn with_factory(tester: T, factory: F) -> Self {
        Self { tester, factory }
    }

    /// The significance tester
    pub fn tester(&self) -> &T {
        &self.tester
    }

    /// Consume the detector, returning its tester
    pub fn into_tester(self) -> T {
        self.tester
    }

    /// Confirmed change points of `series`, shifted by `offset`
    pub fn change_points(&mut self, series: &[f64], offset: usize) -> Result<Vec<ChangePoint<T::Stats>>> {
        Ok(self.detect(series, offset)?.into_change_points())
    }

    /// Run the detection loop over `series`
    ///
    /// Every reported index (confirmed and rejected) is shifted by `offset` so
    /// detection over a sub-window reports positions in the enclosing series.
    #[instrument(
        skip(self, series),
        fields(len = series.len(), algorithm = self.factory.algorithm_name(), test = self.tester.test_name())
    )]
    pub fn detect(&mut self, series: &[f64], offset: usize) -> Result<Detection<T::Stats>> {
        check_finite(series, "series")?;
        let calculator = self.factory.calculator(series.to_vec());
        let mut confirmed: Vec<ChangePoint<T::Stats>> = Vec::new();

        let (termination, rejected) = loop {
            let intervals = self.tester.intervals_for(&confirmed, series.len())?;
            let Some(candidate) = calculator.next_candidate(&intervals)? else {
                break (Termination::Exhausted, None);
            };

            let point = self.tester.evaluate(candidate, series, &intervals)?;
            let pvalue = point.stats.pvalue();
            if !self.tester.is_significant(&point) {
                debug!(index = point.index + offset, qhat = point.qhat, pvalue, "candidate rejected");
                break (Termination::Insignificant, Some(point));
            }

            debug!(index = point.index + offset, qhat = point.qhat, pvalue, "change point confirmed");
            let position = confirmed.partition_point(|cp| cp.index < point.index);
            confirmed.insert(position, point);
        };

        debug!(found = confirmed.len(), %termination, "detection finished");
        Ok(Detection {
            change_points: confirmed.into_iter().map(|cp| cp.shifted(offset)).collect(),
            rejected: rejected.map(|cp| cp.shifted(offset)),
            termination,
            sample_size: series.len(),
        })
    }
}
