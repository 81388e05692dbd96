//! E-divisive change point detection
//!
//! This crate provides the divisive search at the heart of the analysis:
//!
//! - **Calculator**: scores every two-way split of an interval with an
//!   energy-distance divergence, using prefix sums of pairwise distances so an
//!   interval costs O(n²) instead of O(n³)
//! - **Significance testers**: a distribution-free permutation test and a fast
//!   parametric Student's t-test
//! - **Detector**: the greedy loop turning candidates into sorted, confirmed
//!   change points
//!
//! ## Usage
//!
//! ```rust
//! use edivisive_detect::{ChangePointDetector, PermutationTester};
//!
//! let data = vec![
//!     0.3, 2.4, 1.5, -0.9, -0.5, 99.7, 98.3, 99.1, 149.0, 149.7, 149.5, 149.1, 148.8, 150.0,
//! ];
//!
//! // A seed whose permutations accept both splits at this alpha
//! let tester = PermutationTester::new(0.01, 100).unwrap().with_seed(4);
//! let mut detector = ChangePointDetector::new(tester);
//! let points = detector.change_points(&data, 0).unwrap();
//!
//! let indices: Vec<usize> = points.iter().map(|cp| cp.index).collect();
//! assert_eq!(indices, vec![5, 8]);
//! ```

pub mod calculator;
pub mod detector;
pub mod kernel;
pub mod permutation;
pub mod traits;
pub mod ttest;
pub mod types;

pub use calculator::{PairDistance, PairDistanceCalculator, QMatrix};
pub use detector::{ChangePointDetector, Detection, Termination};
pub use permutation::{PermutationStats, PermutationTester};
pub use traits::{CalculatorFactory, CandidateCalculator, SignificanceTester};
pub use ttest::{TTestStats, TTestTester};
pub use types::{intervals_for, CandidateChangePoint, ChangePoint, Interval, TestStatistics, TestStats};
