//! Analyzed series with incremental appends

use crate::changes::{group_by_time, metric_changes, ChangePointGroup, MetricChange};
use crate::options::AnalysisOptions;
use crate::report::AnalysisReport;
use crate::series::{AppendBatch, Series};
use crate::windowed::{compute, compute_full, resume, MetricState};
use edivisive_core::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// A series together with the change points of each of its metrics
///
/// Built by [`AnalyzedSeries::analyze`] and afterwards only changed through
/// [`AnalyzedSeries::append`]. A failed append leaves the state untouched.
#[derive(Debug, Clone)]
pub struct AnalyzedSeries {
    series: Series,
    options: AnalysisOptions,
    states: BTreeMap<String, MetricState>,
}

impl Series {
    /// Analyze every metric of the series
    pub fn analyze(self, options: AnalysisOptions) -> Result<AnalyzedSeries> {
        AnalyzedSeries::analyze(self, options)
    }
}

impl AnalyzedSeries {
    /// Detect change points in every metric of `series`
    #[instrument(skip_all, fields(series = series.name(), len = series.len()))]
    pub fn analyze(series: Series, options: AnalysisOptions) -> Result<Self> {
        options.validate()?;
        let targets: Vec<(usize, String)> = series
            .metric_names()
            .enumerate()
            .map(|(ordinal, name)| (ordinal, name.to_string()))
            .collect();

        let results = for_each_metric(&targets, |ordinal, name| {
            let values = series.observations(name)?.values;
            let seed = options.metric_seed(ordinal);
            if options.orig_edivisive {
                compute_full(&values, &options, seed)
            } else {
                compute(&values, &options, seed)
            }
        })?;

        debug!(metrics = results.len(), "series analyzed");
        Ok(Self {
            series,
            options,
            states: results.into_iter().collect(),
        })
    }

    /// The underlying series
    pub fn series(&self) -> &Series {
        &self.series
    }

    /// Options the series was analyzed with
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Check that `batch` could be appended, without changing anything
    pub fn validate_append(&self, batch: &AppendBatch) -> Result<()> {
        self.series.validate_append(batch)
    }

    /// Whether `batch` could be appended
    pub fn can_append(&self, batch: &AppendBatch) -> bool {
        self.validate_append(batch).is_ok()
    }

    /// Extend the series and re-analyze the metrics named by `batch`
    ///
    /// Each named metric is searched again from the first window that the
    /// previous analysis could not complete; metrics the batch does not name
    /// keep their change points.
    #[instrument(skip_all, fields(series = self.series.name(), rows = batch.time().len()))]
    pub fn append(&mut self, batch: &AppendBatch) -> Result<()> {
        let mut series = self.series.clone();
        series.extend(batch)?;

        let targets: Vec<(usize, String)> = series
            .metric_names()
            .enumerate()
            .filter(|(_, name)| batch.contains_metric(name))
            .map(|(ordinal, name)| (ordinal, name.to_string()))
            .collect();

        let options = &self.options;
        let states = &self.states;
        let results = for_each_metric(&targets, |ordinal, name| {
            let values = series.observations(name)?.values;
            let seed = options.metric_seed(ordinal);
            if options.orig_edivisive {
                return compute_full(&values, options, seed);
            }
            match states.get(name) {
                Some(prior) => resume(&values, options, seed, prior),
                None => compute(&values, options, seed),
            }
        })?;

        self.series = series;
        for (name, state) in results {
            self.states.insert(name, state);
        }
        debug!(len = self.series.len(), "append applied");
        Ok(())
    }

    fn state(&self, metric: &str) -> Result<&MetricState> {
        self.states
            .get(metric)
            .ok_or_else(|| Error::UnknownMetric(metric.to_string()))
    }

    /// Confirmed change points of a metric, ordered by position
    pub fn change_points(&self, metric: &str) -> Result<Vec<MetricChange>> {
        let state = self.state(metric)?;
        metric_changes(&self.series, metric, &state.confirmed, &state.confirmed_indices())
    }

    /// Series positions of the confirmed change points of a metric
    pub fn change_point_indices(&self, metric: &str) -> Result<Vec<usize>> {
        Ok(self.change_points(metric)?.into_iter().map(|c| c.index).collect())
    }

    /// Weak change points of a metric, ordered by position
    pub fn weak_change_points(&self, metric: &str) -> Result<Vec<MetricChange>> {
        let state = self.state(metric)?;
        metric_changes(&self.series, metric, &state.weak, &state.confirmed_indices())
    }

    /// Confirmed change points of all metrics
    pub fn all_change_points(&self) -> Result<BTreeMap<String, Vec<MetricChange>>> {
        self.series
            .metric_names()
            .map(|name| Ok((name.to_string(), self.change_points(name)?)))
            .collect()
    }

    /// Confirmed change points of all metrics grouped by position
    pub fn change_points_by_time(&self) -> Result<Vec<ChangePointGroup>> {
        let mut changes = Vec::new();
        for name in self.series.metric_names() {
            changes.extend(self.change_points(name)?);
        }
        Ok(group_by_time(&self.series, changes, self.options.group_tolerance))
    }

    /// Weak change points of all metrics, ordered by position
    pub fn all_weak_change_points(&self) -> Result<Vec<MetricChange>> {
        let mut weak = Vec::new();
        for name in self.series.metric_names() {
            weak.extend(self.weak_change_points(name)?);
        }
        weak.sort_by_key(|c| c.index);
        Ok(weak)
    }

    /// Range `[start, end)` around `index` bounded by confirmed change points
    pub fn get_stable_range(&self, metric: &str, index: usize) -> Result<(usize, usize)> {
        if index >= self.series.len() {
            return Err(Error::InvalidInput(format!(
                "index {index} is outside a series of length {}",
                self.series.len()
            )));
        }
        let mut begin = 0;
        let mut end = self.series.len();
        for cp in self.change_point_indices(metric)? {
            if cp > index {
                end = cp;
                break;
            }
            begin = cp;
        }
        Ok((begin, end))
    }

    /// Serializable summary of the analysis
    pub fn report(&self) -> Result<AnalysisReport> {
        Ok(AnalysisReport {
            name: self.series.name().to_string(),
            branch: self.series.branch().map(String::from),
            options: self.options.clone(),
            change_points: self.change_points_by_time()?,
            weak_change_points: self.all_weak_change_points()?,
        })
    }

    /// JSON rendering of [`AnalyzedSeries::report`]
    pub fn to_json(&self) -> Result<String> {
        self.report()?.to_json()
    }
}

/// Analyze metrics independently, in parallel when the feature is enabled
fn for_each_metric<F>(targets: &[(usize, String)], analyze: F) -> Result<Vec<(String, MetricState)>>
where
    F: Fn(usize, &str) -> Result<MetricState> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        targets
            .par_iter()
            .map(|(ordinal, name)| analyze(*ordinal, name).map(|s| (name.clone(), s)))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        targets
            .iter()
            .map(|(ordinal, name)| analyze(*ordinal, name).map(|s| (name.clone(), s)))
            .collect()
    }
}
