//! Per-metric change records and their grouping by position

use crate::series::{Direction, Series};
use edivisive_core::Result;
use edivisive_detect::ttest::compare;
use edivisive_detect::{ChangePoint, TestStatistics, TestStats};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Whether a change is good or bad news for its metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The metric moved in its better direction
    Improvement,
    /// The metric moved in its worse direction
    Regression,
    /// The means are equal
    Unchanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Improvement => write!(f, "improvement"),
            ChangeKind::Regression => write!(f, "regression"),
            ChangeKind::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// A change point of one metric, located on the series time axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricChange {
    /// Metric name
    pub metric: String,
    /// Series position of the first observation after the change
    pub index: usize,
    /// Timestamp at `index`
    pub time: i64,
    /// Divergence statistic when the point was found
    pub qhat: f64,
    /// P-value of the test that accepted or retained the point
    pub pvalue: f64,
    /// Mean of the stable segment before the change
    pub mean_before: f64,
    /// Mean of the stable segment after the change
    pub mean_after: f64,
    /// Standard deviation before the change
    pub std_before: f64,
    /// Standard deviation after the change
    pub std_after: f64,
    /// `mean_after / mean_before - 1`
    pub forward_change: f64,
    /// `mean_before / mean_after - 1`
    pub backward_change: f64,
    /// `|forward_change|`
    pub magnitude: f64,
    /// Direction-aware classification
    pub kind: ChangeKind,
}

impl MetricChange {
    /// Signed change, positive when the metric improved
    pub fn change_percent(&self) -> f64 {
        self.forward_change * 100.0
    }
}

/// Build records for `points` of one metric
///
/// Points are given as positions among the metric's present observations.
/// Segment statistics are bounded by the neighbouring `confirmed` positions.
pub(crate) fn metric_changes(
    series: &Series,
    metric: &str,
    points: &[ChangePoint<TestStatistics>],
    confirmed: &[usize],
) -> Result<Vec<MetricChange>> {
    let obs = series.observations(metric)?;
    let direction = series
        .metric(metric)
        .map(|m| m.direction())
        .unwrap_or_default();

    points
        .iter()
        .map(|cp| {
            let below = confirmed.partition_point(|&c| c < cp.index);
            let left = if below == 0 { 0 } else { confirmed[below - 1] };
            let above = confirmed.partition_point(|&c| c <= cp.index);
            let right = confirmed.get(above).copied().unwrap_or(obs.values.len());
            let stats = compare(&obs.values[left..cp.index], &obs.values[cp.index..right])?;

            let position = obs.positions[cp.index];
            let forward = stats.forward_change();
            Ok(MetricChange {
                metric: metric.to_string(),
                index: position,
                time: series.time()[position],
                qhat: cp.qhat,
                pvalue: cp.stats.pvalue(),
                mean_before: stats.mean_before,
                mean_after: stats.mean_after,
                std_before: stats.std_before,
                std_after: stats.std_after,
                forward_change: forward,
                backward_change: stats.backward_change(),
                magnitude: stats.magnitude(),
                kind: classify(forward, direction),
            })
        })
        .collect()
}

fn classify(forward_change: f64, direction: Direction) -> ChangeKind {
    let signed = forward_change * direction.sign();
    if signed > 0.0 {
        ChangeKind::Improvement
    } else if signed < 0.0 {
        ChangeKind::Regression
    } else {
        ChangeKind::Unchanged
    }
}

/// Change points of several metrics reported as one event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePointGroup {
    /// Series position of the event (the earliest change of the group)
    pub index: usize,
    /// Timestamp at `index`
    pub time: i64,
    /// Timestamp just before `index`
    pub prev_time: Option<i64>,
    /// Attributes at `index`
    pub attributes: BTreeMap<String, String>,
    /// Attributes just before `index`
    pub prev_attributes: BTreeMap<String, String>,
    /// Changes of the individual metrics
    pub changes: Vec<MetricChange>,
}

impl ChangePointGroup {
    /// Names of the metrics that changed
    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.metric.as_str())
    }

    /// Whether any metric regressed
    pub fn has_regression(&self) -> bool {
        self.changes.iter().any(|c| c.kind == ChangeKind::Regression)
    }
}

/// Group changes whose positions lie within `tolerance` of a group's first change
///
/// Groups are ordered by position; changes at the same position keep their
/// input order.
pub(crate) fn group_by_time(
    series: &Series,
    mut changes: Vec<MetricChange>,
    tolerance: usize,
) -> Vec<ChangePointGroup> {
    changes.sort_by_key(|c| c.index);

    let mut groups: Vec<ChangePointGroup> = Vec::new();
    for change in changes {
        match groups.last_mut() {
            Some(group) if change.index - group.index <= tolerance => group.changes.push(change),
            _ => {
                let index = change.index;
                let prev = index.checked_sub(1);
                groups.push(ChangePointGroup {
                    index,
                    time: series.time()[index],
                    prev_time: prev.map(|p| series.time()[p]),
                    attributes: series.attributes_at(index),
                    prev_attributes: prev.map(|p| series.attributes_at(p)).unwrap_or_default(),
                    changes: vec![change],
                });
            }
        }
    }
    groups
}
