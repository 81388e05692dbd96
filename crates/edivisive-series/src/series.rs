//! Multi-metric time series
//!
//! A [`Series`] holds a time axis, one column of optional observations per
//! metric and optional per-observation attributes such as commit ids. All
//! columns have the length of the time axis; a missing observation is `None`.

use edivisive_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which way a metric improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger values are better (throughput)
    HigherIsBetter,
    /// Smaller values are better (latency)
    LowerIsBetter,
}

impl Direction {
    /// +1 for higher-is-better, -1 for lower-is-better
    pub fn sign(&self) -> f64 {
        match self {
            Direction::HigherIsBetter => 1.0,
            Direction::LowerIsBetter => -1.0,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::HigherIsBetter
    }
}

/// Per-metric configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    direction: Direction,
    scale: f64,
}

impl Metric {
    /// Create a metric; `scale` multiplies every observation before analysis
    pub fn new(direction: Direction, scale: f64) -> Result<Self> {
        if !scale.is_finite() || scale == 0.0 {
            return Err(Error::InvalidParameter(format!(
                "metric scale must be finite and non-zero, got {scale}"
            )));
        }
        Ok(Self { direction, scale })
    }

    /// Direction of improvement
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Scale factor
    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl Default for Metric {
    fn default() -> Self {
        Self {
            direction: Direction::HigherIsBetter,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct MetricColumn {
    name: String,
    metric: Metric,
    values: Vec<Option<f64>>,
}

/// Present observations of one metric
///
/// `values[i]` is the scaled observation at series position `positions[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observations {
    /// Series position of every present observation
    pub positions: Vec<usize>,
    /// Scaled observations
    pub values: Vec<f64>,
}

/// Named, time-ordered collection of metrics
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    branch: Option<String>,
    time: Vec<i64>,
    columns: Vec<MetricColumn>,
    attributes: BTreeMap<String, Vec<Option<String>>>,
}

impl Series {
    /// Start building a series
    pub fn builder(name: impl Into<String>) -> SeriesBuilder {
        SeriesBuilder {
            name: name.into(),
            branch: None,
            time: Vec::new(),
            columns: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Name of the series, typically the test name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Branch label
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Number of positions on the time axis
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Check if the series has no observations
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time axis
    pub fn time(&self) -> &[i64] {
        &self.time
    }

    /// Metric names in declaration order
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Position of a metric in declaration order
    pub fn metric_ordinal(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Configuration of a metric
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.column(name).ok().map(|c| &c.metric)
    }

    /// Raw column of a metric
    pub fn values(&self, name: &str) -> Result<&[Option<f64>]> {
        Ok(&self.column(name)?.values)
    }

    /// Present, scaled observations of a metric
    pub fn observations(&self, name: &str) -> Result<Observations> {
        let column = self.column(name)?;
        let mut obs = Observations::default();
        for (position, value) in column.values.iter().enumerate() {
            if let Some(v) = value {
                obs.positions.push(position);
                obs.values.push(v * column.metric.scale);
            }
        }
        Ok(obs)
    }

    /// Attribute column
    pub fn attribute(&self, name: &str) -> Option<&[Option<String>]> {
        self.attributes.get(name).map(|v| v.as_slice())
    }

    /// Attributes present at `index`
    pub fn attributes_at(&self, index: usize) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .filter_map(|(name, column)| {
                column
                    .get(index)
                    .and_then(|v| v.clone())
                    .map(|v| (name.clone(), v))
            })
            .collect()
    }

    fn column(&self, name: &str) -> Result<&MetricColumn> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::UnknownMetric(name.to_string()))
    }

    /// Check that `batch` can extend this series
    pub fn validate_append(&self, batch: &AppendBatch) -> Result<()> {
        if batch.time.is_empty() {
            return Err(Error::InsufficientData {
                expected: 1,
                actual: 0,
            });
        }
        if batch.data.is_empty() {
            return Err(Error::EmptyAppend);
        }

        let base = self.len();
        let mut last = self.time.last().copied();
        for (i, &t) in batch.time.iter().enumerate() {
            if last.map_or(false, |prev| t <= prev) {
                return Err(Error::NonMonotonicTime { index: base + i });
            }
            last = Some(t);
        }

        for (name, values) in &batch.data {
            self.column(name)?;
            if values.len() != batch.time.len() {
                return Err(Error::size_mismatch(
                    batch.time.len(),
                    values.len(),
                    &format!("appended metric {name}"),
                ));
            }
            edivisive_core::math::check_finite(values, &format!("appended metric {name}"))?;
        }
        for (name, values) in &batch.attributes {
            if values.len() != batch.time.len() {
                return Err(Error::size_mismatch(
                    batch.time.len(),
                    values.len(),
                    &format!("appended attribute {name}"),
                ));
            }
        }
        Ok(())
    }

    /// Extend every column with `batch`; metrics it does not name get gaps
    pub(crate) fn extend(&mut self, batch: &AppendBatch) -> Result<()> {
        self.validate_append(batch)?;
        let base = self.len();
        let added = batch.time.len();

        self.time.extend_from_slice(&batch.time);
        for column in &mut self.columns {
            match batch.data.get(&column.name) {
                Some(values) => column.values.extend(values.iter().copied().map(Some)),
                None => column.values.resize(base + added, None),
            }
        }

        for (name, values) in &batch.attributes {
            let column = self
                .attributes
                .entry(name.clone())
                .or_insert_with(|| vec![None; base]);
            column.extend(values.iter().cloned().map(Some));
        }
        for column in self.attributes.values_mut() {
            column.resize(base + added, None);
        }
        Ok(())
    }
}

/// Builder for [`Series`]
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    name: String,
    branch: Option<String>,
    time: Vec<i64>,
    columns: Vec<MetricColumn>,
    attributes: BTreeMap<String, Vec<Option<String>>>,
}

impl SeriesBuilder {
    /// Set the branch label
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Set the time axis
    pub fn time(mut self, time: Vec<i64>) -> Self {
        self.time = time;
        self
    }

    /// Add a fully observed metric
    pub fn metric(self, name: impl Into<String>, metric: Metric, values: Vec<f64>) -> Self {
        self.metric_with_gaps(name, metric, values.into_iter().map(Some).collect())
    }

    /// Add a metric that may have missing observations
    pub fn metric_with_gaps(mut self, name: impl Into<String>, metric: Metric, values: Vec<Option<f64>>) -> Self {
        self.columns.push(MetricColumn {
            name: name.into(),
            metric,
            values,
        });
        self
    }

    /// Add a fully populated attribute column
    pub fn attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes
            .insert(name.into(), values.into_iter().map(Some).collect());
        self
    }

    /// Validate the columns and build the series
    pub fn build(self) -> Result<Series> {
        let len = self.time.len();
        if let Some(w) = self.time.windows(2).position(|w| w[1] < w[0]) {
            return Err(Error::NonMonotonicTime { index: w + 1 });
        }

        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::InvalidInput(format!(
                    "metric {} declared twice",
                    column.name
                )));
            }
            if column.values.len() != len {
                return Err(Error::size_mismatch(
                    len,
                    column.values.len(),
                    &format!("metric {}", column.name),
                ));
            }
            if column.values.iter().flatten().any(|v| !v.is_finite()) {
                return Err(Error::non_finite(&format!("metric {}", column.name)));
            }
        }
        for (name, values) in &self.attributes {
            if values.len() != len {
                return Err(Error::size_mismatch(len, values.len(), &format!("attribute {name}")));
            }
        }

        Ok(Series {
            name: self.name,
            branch: self.branch,
            time: self.time,
            columns: self.columns,
            attributes: self.attributes,
        })
    }
}

/// New observations for [`crate::AnalyzedSeries::append`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendBatch {
    time: Vec<i64>,
    data: BTreeMap<String, Vec<f64>>,
    attributes: BTreeMap<String, Vec<String>>,
}

impl AppendBatch {
    /// Batch of observations at the given timestamps
    pub fn new(time: Vec<i64>) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    /// Add values of one metric, one per timestamp
    pub fn with_metric(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.data.insert(name.into(), values);
        self
    }

    /// Add values of one attribute, one per timestamp
    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.insert(name.into(), values);
        self
    }

    /// Timestamps of the batch
    pub fn time(&self) -> &[i64] {
        &self.time
    }

    /// Names of the metrics carried by the batch
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|k| k.as_str())
    }

    /// Whether the batch carries values for `name`
    pub fn contains_metric(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_metrics() -> Series {
        Series::builder("test")
            .time(vec![0, 1, 2, 3])
            .metric("a", Metric::default(), vec![1.0, 2.0, 3.0, 4.0])
            .metric("b", Metric::new(Direction::LowerIsBetter, 2.0).unwrap(), vec![1.0, 1.0, 1.0, 1.0])
            .attribute("commit", vec!["c0".into(), "c1".into(), "c2".into(), "c3".into()])
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_validates_lengths() {
        let err = Series::builder("test")
            .time(vec![0, 1, 2])
            .metric("a", Metric::default(), vec![1.0, 2.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 3, actual: 2, .. }));

        let err = Series::builder("test")
            .time(vec![0, 1])
            .attribute("commit", vec!["x".into()])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { .. }));
    }

    #[test]
    fn test_builder_validates_time_and_values() {
        let err = Series::builder("test")
            .time(vec![0, 2, 1])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::NonMonotonicTime { index: 2 }));

        // Equal timestamps are accepted
        assert!(Series::builder("test").time(vec![0, 0, 1]).build().is_ok());

        let err = Series::builder("test")
            .time(vec![0, 1])
            .metric("a", Metric::default(), vec![1.0, f64::NAN])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = Series::builder("test")
            .time(vec![0])
            .metric("a", Metric::default(), vec![1.0])
            .metric("a", Metric::default(), vec![2.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_observations_are_scaled() {
        let series = two_metrics();
        let obs = series.observations("b").unwrap();
        assert_eq!(obs.values, vec![2.0; 4]);
        assert_eq!(obs.positions, vec![0, 1, 2, 3]);
        assert!(matches!(series.observations("c"), Err(Error::UnknownMetric(_))));
        assert_eq!(series.metric_ordinal("b"), Some(1));
        assert_eq!(series.metric("b").unwrap().direction(), Direction::LowerIsBetter);
    }

    #[test]
    fn test_metric_validation() {
        assert!(Metric::new(Direction::HigherIsBetter, 0.0).is_err());
        assert!(Metric::new(Direction::HigherIsBetter, f64::INFINITY).is_err());
        assert_eq!(Direction::LowerIsBetter.sign(), -1.0);
    }

    #[test]
    fn test_validate_append() {
        let series = two_metrics();
        let ok = AppendBatch::new(vec![4]).with_metric("a", vec![5.0]);
        assert!(series.validate_append(&ok).is_ok());

        let stale = AppendBatch::new(vec![3]).with_metric("a", vec![5.0]);
        assert!(matches!(
            series.validate_append(&stale),
            Err(Error::NonMonotonicTime { index: 4 })
        ));

        let unordered = AppendBatch::new(vec![5, 5]).with_metric("a", vec![5.0, 6.0]);
        assert!(matches!(
            series.validate_append(&unordered),
            Err(Error::NonMonotonicTime { index: 5 })
        ));

        let empty = AppendBatch::new(vec![4]);
        assert!(matches!(series.validate_append(&empty), Err(Error::EmptyAppend)));

        let unknown = AppendBatch::new(vec![4]).with_metric("zzz", vec![1.0]);
        assert!(matches!(series.validate_append(&unknown), Err(Error::UnknownMetric(_))));

        let short = AppendBatch::new(vec![4, 5]).with_metric("a", vec![1.0]);
        assert!(matches!(series.validate_append(&short), Err(Error::LengthMismatch { .. })));

        let no_time = AppendBatch::new(vec![]).with_metric("a", vec![]);
        assert!(matches!(
            series.validate_append(&no_time),
            Err(Error::InsufficientData { expected: 1, actual: 0 })
        ));
    }

    #[test]
    fn test_extend_fills_gaps() {
        let mut series = two_metrics();
        let batch = AppendBatch::new(vec![4, 5])
            .with_metric("a", vec![5.0, 6.0])
            .with_attribute("version", vec!["v1".into(), "v2".into()]);
        series.extend(&batch).unwrap();

        assert_eq!(series.len(), 6);
        assert_eq!(series.values("b").unwrap()[4..], [None, None]);
        assert_eq!(series.observations("b").unwrap().positions, vec![0, 1, 2, 3]);
        assert_eq!(series.attribute("commit").unwrap()[5], None);
        assert_eq!(series.attribute("version").unwrap()[0], None);

        let at = series.attributes_at(5);
        assert_eq!(at.get("version").map(String::as_str), Some("v2"));
        assert!(!at.contains_key("commit"));
        assert_eq!(series.attributes_at(2).get("commit").map(String::as_str), Some("c2"));
    }
}
