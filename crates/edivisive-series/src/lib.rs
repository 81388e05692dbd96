//! Windowed and incremental change point analysis of multi-metric series
//!
//! [`Series`] collects the observations of several metrics on a shared time
//! axis. [`AnalyzedSeries`] runs the e-divisive detector over each metric in
//! overlapping windows, keeps near-miss candidates as weak change points,
//! filters confirmed ones by magnitude and groups them across metrics. New
//! observations are appended without re-analyzing settled history.
//!
//! ```rust
//! use edivisive_series::{AnalysisOptions, AppendBatch, Metric, Series};
//!
//! let series = Series::builder("test")
//!     .time((0..11).collect())
//!     .metric("throughput", Metric::default(),
//!         vec![1.02, 0.95, 0.99, 1.00, 1.12, 0.90, 0.50, 0.51, 0.48, 0.48, 0.55])
//!     .build()
//!     .unwrap();
//!
//! let mut analyzed = series.analyze(AnalysisOptions::default()).unwrap();
//! assert_eq!(analyzed.change_point_indices("throughput").unwrap(), vec![6]);
//!
//! analyzed
//!     .append(&AppendBatch::new(vec![11]).with_metric("throughput", vec![0.5]))
//!     .unwrap();
//! assert_eq!(analyzed.get_stable_range("throughput", 8).unwrap(), (6, 12));
//! ```

pub mod analyzed;
pub mod changes;
pub mod options;
pub mod report;
pub mod series;
pub mod windowed;

pub use analyzed::AnalyzedSeries;
pub use changes::{ChangeKind, ChangePointGroup, MetricChange};
pub use options::{AnalysisOptions, TestStrategy, DEFAULT_PERMUTATIONS};
pub use report::AnalysisReport;
pub use series::{AppendBatch, Direction, Metric, Observations, Series, SeriesBuilder};
pub use windowed::MetricState;
