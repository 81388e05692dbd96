//! E-divisive candidate calculator
//!
//! Scores two-way splits with the energy-distance divergence
//!
//! ```text
//! Q(τ, κ) = 2/(κ-s) Σ_{s≤i<τ≤j<κ} d(i, j)
//!         - 2(κ-τ)/((κ-s)(τ-s-1)) Σ_{s≤i<k<τ} d(i, k)
//!         - 2(τ-s)/((κ-s)(κ-τ-1)) Σ_{τ≤j<k<κ} d(j, k)
//! ```
//!
//! where `d(i, j) = |x_i - x_j|^power`. Candidates fix `κ` at the end of the
//! interval so that every split partitions the whole interval.

use crate::kernel::{DistanceKernel, PrefixTable};
use crate::traits::{CalculatorFactory, CandidateCalculator};
use crate::types::{CandidateChangePoint, Interval};
use edivisive_core::{Error, Result};
use std::cell::OnceCell;

/// Factory for [`PairDistanceCalculator`]s with a fixed distance exponent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairDistance {
    kernel: DistanceKernel,
}

impl PairDistance {
    /// Create a factory; `power` must lie in the open interval (0, 2)
    pub fn new(power: f64) -> Result<Self> {
        if !(power > 0.0 && power < 2.0) {
            return Err(Error::InvalidParameter(format!(
                "distance exponent must be in (0, 2), got {power}"
            )));
        }
        Ok(Self {
            kernel: DistanceKernel::new(power),
        })
    }

    /// Distance exponent
    pub fn power(&self) -> f64 {
        self.kernel.power()
    }
}

impl Default for PairDistance {
    fn default() -> Self {
        Self {
            kernel: DistanceKernel::default(),
        }
    }
}

impl CalculatorFactory for PairDistance {
    type Calculator = PairDistanceCalculator;

    fn calculator(&self, series: Vec<f64>) -> PairDistanceCalculator {
        PairDistanceCalculator::with_kernel(series, self.kernel)
    }

    fn algorithm_name(&self) -> &'static str {
        "E-divisive"
    }
}

/// Calculator bound to one revision of a series
///
/// The prefix table is built on first use and cached; a calculator must be
/// rebuilt when the series changes.
#[derive(Debug, Clone)]
pub struct PairDistanceCalculator {
    series: Vec<f64>,
    kernel: DistanceKernel,
    table: OnceCell<PrefixTable>,
}

impl PairDistanceCalculator {
    /// Calculator with plain absolute differences
    pub fn new(series: Vec<f64>) -> Self {
        Self::with_kernel(series, DistanceKernel::default())
    }

    fn with_kernel(series: Vec<f64>, kernel: DistanceKernel) -> Self {
        Self {
            series,
            kernel,
            table: OnceCell::new(),
        }
    }

    fn table(&self) -> &PrefixTable {
        self.table
            .get_or_init(|| PrefixTable::build(&self.series, &self.kernel))
    }

    /// Divergence for every `(τ, κ)` with `start < τ < κ <= end`
    pub fn q_matrix(&self, interval: Interval) -> Result<QMatrix> {
        interval.check_bounds(self.series.len())?;
        let dim = interval.len().saturating_sub(1);
        let mut values = vec![0.0; dim * dim];
        if dim > 0 {
            let table = self.table();
            let s = interval.start;
            for tau in s + 1..interval.end {
                for kappa in tau + 1..=interval.end {
                    values[(tau - s - 1) * dim + (kappa - s - 2)] = table.q(s, tau, kappa);
                }
            }
        }
        Ok(QMatrix {
            interval,
            dim,
            values,
        })
    }
}

impl CandidateCalculator for PairDistanceCalculator {
    fn series(&self) -> &[f64] {
        &self.series
    }

    fn score(&self, interval: Interval, tau: usize) -> Result<f64> {
        interval.check_bounds(self.series.len())?;
        if tau <= interval.start || tau >= interval.end {
            return Err(Error::InvalidParameter(format!(
                "split {tau} must lie strictly inside {interval}"
            )));
        }
        Ok(self.table().q(interval.start, tau, interval.end))
    }

    fn best_split(&self, interval: Interval) -> Result<Option<CandidateChangePoint>> {
        interval.check_bounds(self.series.len())?;
        if interval.len() < 2 {
            return Ok(None);
        }
        let table = self.table();
        let mut best: Option<CandidateChangePoint> = None;
        for tau in interval.start + 1..interval.end {
            let q = table.q(interval.start, tau, interval.end);
            if best.map_or(true, |b| q > b.qhat) {
                best = Some(CandidateChangePoint::new(tau, q));
            }
        }
        Ok(best)
    }
}

/// Divergence over all `(τ, κ)` pairs of an interval
#[derive(Debug, Clone)]
pub struct QMatrix {
    interval: Interval,
    dim: usize,
    values: Vec<f64>,
}

impl QMatrix {
    /// Interval the matrix was computed for
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Divergence at `(τ, κ)`, `None` outside `start < τ < κ <= end`
    pub fn get(&self, tau: usize, kappa: usize) -> Option<f64> {
        let s = self.interval.start;
        if tau <= s || kappa <= tau || kappa > self.interval.end {
            return None;
        }
        Some(self.values[(tau - s - 1) * self.dim + (kappa - s - 2)])
    }

    /// Maximum over all valid pairs in row-major `(τ, κ)` order, first on ties
    pub fn argmax(&self) -> Option<(usize, usize, f64)> {
        let s = self.interval.start;
        let mut best: Option<(usize, usize, f64)> = None;
        for tau in s + 1..self.interval.end {
            for kappa in tau + 1..=self.interval.end {
                let q = self.values[(tau - s - 1) * self.dim + (kappa - s - 2)];
                if best.map_or(true, |(_, _, b)| q > b) {
                    best = Some((tau, kappa, q));
                }
            }
        }
        best
    }

    /// Best split with `κ` fixed at the interval end, first on ties
    pub fn best_at_end(&self) -> Option<CandidateChangePoint> {
        let s = self.interval.start;
        let end = self.interval.end;
        let mut best: Option<CandidateChangePoint> = None;
        for tau in s + 1..end {
            let q = self.values[(tau - s - 1) * self.dim + (end - s - 2)];
            if best.map_or(true, |b| q > b.qhat) {
                best = Some(CandidateChangePoint::new(tau, q));
            }
        }
        best
    }
}
