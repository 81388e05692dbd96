//! Permutation significance test
//!
//! Distribution-free: the observed divergence is compared with the best
//! divergence of copies of the series shuffled within each current interval.

use crate::calculator::PairDistance;
use crate::traits::{CalculatorFactory, CandidateCalculator, SignificanceTester};
use crate::types::{CandidateChangePoint, ChangePoint, Interval, TestStats};
use edivisive_core::{Error, Result};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::trace;

/// Statistics of a permutation test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermutationStats {
    /// `extreme_qhat_perm / (n_perm + 1)`
    pub pvalue: f64,
    /// Best divergence of every permuted series, in permutation order
    pub permuted_qhats: Vec<f64>,
    /// Permutations scoring at least the observed divergence
    pub extreme_qhat_perm: usize,
    /// Number of permutations
    pub n_perm: usize,
}

impl TestStats for PermutationStats {
    fn pvalue(&self) -> f64 {
        self.pvalue
    }
}

/// Permutation tester owning its random generator
///
/// Two testers built with the same seed produce identical statistics for the
/// same sequence of calls.
#[derive(Debug, Clone)]
pub struct PermutationTester<F: CalculatorFactory = PairDistance> {
    alpha: f64,
    permutations: usize,
    factory: F,
    seed: u64,
    rng: ChaCha8Rng,
}

impl PermutationTester<PairDistance> {
    /// Tester with the default calculator, seeded from entropy
    pub fn new(alpha: f64, permutations: usize) -> Result<Self> {
        Self::with_factory(alpha, permutations, PairDistance::default())
    }
}

impl<F: CalculatorFactory> PermutationTester<F> {
    /// Tester building permuted calculators with `factory`
    pub fn with_factory(alpha: f64, permutations: usize, factory: F) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "significance level must be in (0, 1], got {alpha}"
            )));
        }
        if permutations == 0 {
            return Err(Error::InvalidParameter(
                "permutation count must be positive".to_string(),
            ));
        }
        let seed = thread_rng().gen();
        Ok(Self {
            alpha,
            permutations,
            factory,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Reseed the generator for reproducible results
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Seed the generator was created from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of permutations per test
    pub fn permutations(&self) -> usize {
        self.permutations
    }
}

impl<F: CalculatorFactory> SignificanceTester for PermutationTester<F> {
    type Stats = PermutationStats;

    fn test_name(&self) -> &'static str {
        "permutation"
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn evaluate(
        &mut self,
        candidate: CandidateChangePoint,
        series: &[f64],
        intervals: &[Interval],
    ) -> Result<ChangePoint<PermutationStats>> {
        for interval in intervals {
            interval.check_bounds(series.len())?;
        }

        let mut permuted_qhats = Vec::with_capacity(self.permutations);
        for _ in 0..self.permutations {
            let mut shuffled = series.to_vec();
            for interval in intervals {
                shuffled[interval.as_range()].shuffle(&mut self.rng);
            }
            let calculator = self.factory.calculator(shuffled);
            let qhat = calculator
                .next_candidate(intervals)?
                .map_or(f64::NEG_INFINITY, |c| c.qhat);
            permuted_qhats.push(qhat);
        }

        let extreme_qhat_perm = permuted_qhats.iter().filter(|&&q| q >= candidate.qhat).count();
        let pvalue = extreme_qhat_perm as f64 / (self.permutations + 1) as f64;
        trace!(
            index = candidate.index,
            extreme = extreme_qhat_perm,
            pvalue,
            "permutation test"
        );

        Ok(ChangePoint::from_candidate(
            candidate,
            PermutationStats {
                pvalue,
                permuted_qhats,
                extreme_qhat_perm,
                n_perm: self.permutations,
            },
        ))
    }
}
