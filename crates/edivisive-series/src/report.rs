//! Serializable analysis summary for reporting collaborators

use crate::changes::{ChangePointGroup, MetricChange};
use crate::options::AnalysisOptions;
use edivisive_core::Result;
use serde::Serialize;

/// Result of analyzing one series
///
/// Non-finite numbers such as the magnitude of a change from a zero mean are
/// rendered as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Series name
    pub name: String,
    /// Branch label
    pub branch: Option<String>,
    /// Options the analysis ran with
    pub options: AnalysisOptions,
    /// Confirmed change points grouped by position
    pub change_points: Vec<ChangePointGroup>,
    /// Weak change points of all metrics
    pub weak_change_points: Vec<MetricChange>,
}

impl AnalysisReport {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of regressions across all groups
    pub fn regression_count(&self) -> usize {
        self.change_points
            .iter()
            .flat_map(|g| g.changes.iter())
            .filter(|c| c.kind == crate::changes::ChangeKind::Regression)
            .count()
    }
}
