//! Analysis configuration

use edivisive_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of permutations of the permutation test
pub const DEFAULT_PERMUTATIONS: usize = 100;

/// Significance test driving the candidate search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestStrategy {
    /// Student's t-test on the segments around the candidate
    TTest,
    /// Shuffle within intervals and compare divergences
    Permutation {
        /// Number of shuffled copies per test
        permutations: usize,
    },
}

impl TestStrategy {
    /// Permutation test with the default permutation count
    pub fn permutation() -> Self {
        Self::Permutation {
            permutations: DEFAULT_PERMUTATIONS,
        }
    }
}

impl Default for TestStrategy {
    fn default() -> Self {
        Self::TTest
    }
}

/// Options for [`crate::AnalyzedSeries`]
///
/// Deserializes from partial documents; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Significance threshold for confirmed change points
    pub max_pvalue: f64,
    /// Minimum `|mean_after / mean_before - 1|` of a reported change point
    pub min_magnitude: f64,
    /// Number of observations per analysis window
    pub window_len: usize,
    /// Run the plain recursive algorithm over the whole series
    pub orig_edivisive: bool,
    /// Significance test used by the detector
    pub strategy: TestStrategy,
    /// Base seed of the permutation test; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Exponent of the pairwise distance, in (0, 2)
    pub power: f64,
    /// Maximum index distance between change points reported as one event
    pub group_tolerance: usize,
    /// Drop weak change points this far before the re-analysis start
    pub weak_retention: Option<usize>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_pvalue: 0.001,
            min_magnitude: 0.0,
            window_len: 50,
            orig_edivisive: false,
            strategy: TestStrategy::TTest,
            seed: None,
            power: 1.0,
            group_tolerance: 0,
            weak_retention: None,
        }
    }
}

impl AnalysisOptions {
    /// Set the significance threshold
    pub fn with_max_pvalue(mut self, max_pvalue: f64) -> Self {
        self.max_pvalue = max_pvalue;
        self
    }

    /// Set the minimum magnitude
    pub fn with_min_magnitude(mut self, min_magnitude: f64) -> Self {
        self.min_magnitude = min_magnitude;
        self
    }

    /// Set the window length
    pub fn with_window_len(mut self, window_len: usize) -> Self {
        self.window_len = window_len;
        self
    }

    /// Toggle the plain, non-windowed algorithm
    pub fn with_orig_edivisive(mut self, orig_edivisive: bool) -> Self {
        self.orig_edivisive = orig_edivisive;
        self
    }

    /// Set the significance test
    pub fn with_strategy(mut self, strategy: TestStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set random seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the distance exponent
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    /// Set the grouping tolerance
    pub fn with_group_tolerance(mut self, group_tolerance: usize) -> Self {
        self.group_tolerance = group_tolerance;
        self
    }

    /// Set the weak change point retention distance
    pub fn with_weak_retention(mut self, weak_retention: usize) -> Self {
        self.weak_retention = Some(weak_retention);
        self
    }

    /// Relaxed threshold used while searching windows for candidates
    pub fn weak_pvalue(&self) -> f64 {
        (self.max_pvalue * 10.0).min(1.0)
    }

    /// Seed of the metric at `ordinal`
    pub fn metric_seed(&self, ordinal: usize) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(ordinal as u64))
    }

    /// Check every parameter
    pub fn validate(&self) -> Result<()> {
        if !(self.max_pvalue > 0.0 && self.max_pvalue <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "max_pvalue must be in (0, 1], got {}",
                self.max_pvalue
            )));
        }
        if !self.min_magnitude.is_finite() || self.min_magnitude < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "min_magnitude must be finite and non-negative, got {}",
                self.min_magnitude
            )));
        }
        if self.window_len < 2 {
            return Err(Error::InvalidParameter(format!(
                "window_len must be at least 2, got {}",
                self.window_len
            )));
        }
        if let TestStrategy::Permutation { permutations: 0 } = self.strategy {
            return Err(Error::InvalidParameter(
                "permutation count must be positive".to_string(),
            ));
        }
        if !(self.power > 0.0 && self.power < 2.0) {
            return Err(Error::InvalidParameter(format!(
                "power must be in (0, 2), got {}",
                self.power
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AnalysisOptions::default();
        assert_eq!(options.max_pvalue, 0.001);
        assert_eq!(options.window_len, 50);
        assert_eq!(options.strategy, TestStrategy::TTest);
        assert!(options.validate().is_ok());
        approx::assert_relative_eq!(options.weak_pvalue(), 0.01);
    }

    #[test]
    fn test_weak_pvalue_capped() {
        let options = AnalysisOptions::default().with_max_pvalue(0.5);
        assert_eq!(options.weak_pvalue(), 1.0);
    }

    #[test]
    fn test_validation() {
        assert!(AnalysisOptions::default().with_max_pvalue(0.0).validate().is_err());
        assert!(AnalysisOptions::default().with_max_pvalue(1.1).validate().is_err());
        assert!(AnalysisOptions::default().with_min_magnitude(-0.1).validate().is_err());
        assert!(AnalysisOptions::default().with_window_len(1).validate().is_err());
        assert!(AnalysisOptions::default().with_power(2.0).validate().is_err());
        assert!(AnalysisOptions::default()
            .with_strategy(TestStrategy::Permutation { permutations: 0 })
            .validate()
            .is_err());
        assert!(AnalysisOptions::default()
            .with_strategy(TestStrategy::permutation())
            .validate()
            .is_ok());
    }

    #[test]
    fn test_metric_seeds() {
        assert_eq!(AnalysisOptions::default().metric_seed(3), None);
        let options = AnalysisOptions::default().with_seed(u64::MAX);
        assert_eq!(options.metric_seed(0), Some(u64::MAX));
        assert_eq!(options.metric_seed(2), Some(1));
    }

    #[test]
    fn test_partial_json() {
        let options: AnalysisOptions =
            serde_json::from_str(r#"{"max_pvalue": 0.01, "strategy": {"kind": "permutation", "permutations": 20}}"#)
                .unwrap();
        assert_eq!(options.max_pvalue, 0.01);
        assert_eq!(options.window_len, 50);
        assert_eq!(options.strategy, TestStrategy::Permutation { permutations: 20 });

        let json = serde_json::to_string(&AnalysisOptions::default()).unwrap();
        let back: AnalysisOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AnalysisOptions::default());
    }
}
