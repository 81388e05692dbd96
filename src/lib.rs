//! E-divisive change point detection for continuous performance testing
//!
//! This crate re-exports the workspace members:
//!
//! - [`core`]: error type and numeric helpers
//! - [`detect`]: divergence calculator, significance testers and detector
//! - [`series`]: multi-metric series, windowed and incremental analysis
//!
//! ```rust
//! use edivisive::prelude::*;
//!
//! let series = Series::builder("benchmark")
//!     .time((0..11).collect())
//!     .metric("series1", Metric::default(),
//!         vec![1.02, 0.95, 0.99, 1.00, 1.12, 0.90, 0.50, 0.51, 0.48, 0.48, 0.55])
//!     .metric("series2", Metric::default(),
//!         vec![2.02, 2.03, 2.01, 2.04, 1.82, 1.85, 1.79, 1.81, 1.80, 1.76, 1.78])
//!     .build()?;
//!
//! let analyzed = series.analyze(AnalysisOptions::default())?;
//! let groups = analyzed.change_points_by_time()?;
//! assert_eq!(groups.iter().map(|g| g.index).collect::<Vec<_>>(), vec![4, 6]);
//! # Ok::<(), edivisive::Error>(())
//! ```

pub use edivisive_core as core;
pub use edivisive_detect as detect;
pub use edivisive_series as series;

pub use edivisive_core::{Error, Result};

/// Commonly used types
pub mod prelude {
    pub use edivisive_core::{Error, Result};
    pub use edivisive_detect::{
        CalculatorFactory, CandidateCalculator, ChangePoint, ChangePointDetector, Interval,
        PairDistance, PermutationTester, SignificanceTester, TTestTester,
    };
    pub use edivisive_series::{
        AnalysisOptions, AnalysisReport, AnalyzedSeries, AppendBatch, ChangeKind,
        ChangePointGroup, Direction, Metric, MetricChange, Series, TestStrategy,
    };
}
