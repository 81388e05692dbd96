//! Windowed and incremental detection for one metric
//!
//! Detection runs in two phases. The split phase slides a window over the
//! observations and collects every change point the detector confirms at a
//! relaxed threshold. The merge phase then removes split points bottom-up
//! until the survivors pass both the strict threshold and the magnitude
//! filter. Survivors are confirmed, the rest are weak.
//!
//! A window lying wholly inside the observations never changes on append, so
//! its split points are kept and an append only searches from the first
//! window that ran into the end of the data. Appending observations in any
//! batching therefore reaches the same split points as one analysis of the
//! whole series, plus earlier confirmed points still inside that last window.
//!
//! All indices here are positions among the present observations of a metric.

use crate::options::{AnalysisOptions, TestStrategy};
use edivisive_core::Result;
use edivisive_detect::ttest::{compare, TTestStats};
use edivisive_detect::{
    CandidateChangePoint, ChangePoint, ChangePointDetector, PairDistance, PermutationTester,
    TTestTester, TestStatistics,
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Detection state of one metric
#[derive(Debug, Clone, Default)]
pub struct MetricState {
    /// Confirmed change points, sorted by index
    pub confirmed: Vec<ChangePoint<TestStatistics>>,
    /// Weak change points, sorted by index
    pub weak: Vec<ChangePoint<TestStatistics>>,
    /// Split points of windows lying wholly inside the observations
    settled: BTreeMap<usize, f64>,
    /// Start of the first window that ran into the end of the observations
    frontier: usize,
}

impl MetricState {
    /// Indices of the confirmed change points
    pub fn confirmed_indices(&self) -> Vec<usize> {
        self.confirmed.iter().map(|cp| cp.index).collect()
    }

    /// Indices of the weak change points
    pub fn weak_indices(&self) -> Vec<usize> {
        self.weak.iter().map(|cp| cp.index).collect()
    }

    /// Position where the window search resumes on the next append
    pub fn frontier(&self) -> usize {
        self.frontier
    }
}

/// Detector with the significance test chosen by the options
pub(crate) enum MetricDetector {
    TTest(ChangePointDetector<TTestTester>),
    Permutation(ChangePointDetector<PermutationTester>),
}

impl MetricDetector {
    pub(crate) fn new(options: &AnalysisOptions, alpha: f64, seed: Option<u64>) -> Result<Self> {
        let factory = PairDistance::new(options.power)?;
        Ok(match options.strategy {
            TestStrategy::TTest => Self::TTest(ChangePointDetector::with_factory(
                TTestTester::new(alpha)?,
                factory,
            )),
            TestStrategy::Permutation { permutations } => {
                let mut tester = PermutationTester::with_factory(alpha, permutations, factory)?;
                if let Some(seed) = seed {
                    tester = tester.with_seed(seed);
                }
                Self::Permutation(ChangePointDetector::with_factory(tester, factory))
            }
        })
    }

    pub(crate) fn change_points(
        &mut self,
        values: &[f64],
        offset: usize,
    ) -> Result<Vec<ChangePoint<TestStatistics>>> {
        Ok(match self {
            Self::TTest(detector) => detector
                .change_points(values, offset)?
                .into_iter()
                .map(|cp| cp.map_stats(TestStatistics::from))
                .collect(),
            Self::Permutation(detector) => detector
                .change_points(values, offset)?
                .into_iter()
                .map(|cp| cp.map_stats(TestStatistics::from))
                .collect(),
        })
    }
}

/// Two-sample statistics of the point at `i` of `indices`, bounded by its neighbours
pub(crate) fn neighbour_stats(values: &[f64], indices: &[usize], i: usize) -> Result<TTestStats> {
    let left = if i == 0 { 0 } else { indices[i - 1] };
    let right = indices.get(i + 1).copied().unwrap_or(values.len());
    let index = indices[i];
    compare(&values[left..index], &values[index..right])
}

/// Outcome of a window search
struct SplitPoints {
    all: BTreeMap<usize, f64>,
    settled: BTreeMap<usize, f64>,
    frontier: usize,
}

/// Collect change points over overlapping windows starting at `from_index`
///
/// Each window is `window_len` long; the next one starts at the last change
/// point found or half a window further, whichever is later. A window lying
/// wholly inside `values` sees the same data after any append, so its points
/// join `settled` and the frontier moves past it.
fn split(
    values: &[f64],
    options: &AnalysisOptions,
    seed: Option<u64>,
    settled: BTreeMap<usize, f64>,
    from_index: usize,
) -> Result<SplitPoints> {
    let n = values.len();
    let step = (options.window_len / 2).max(1);
    let mut points = SplitPoints {
        all: settled.clone(),
        settled,
        frontier: from_index,
    };

    let mut start = from_index;
    while start < n {
        let end = start + options.window_len;
        let complete = end <= n;
        // Each window draws from its own seeded stream
        let window_seed = seed.map(|s| s.wrapping_add(start as u64));
        let mut detector = MetricDetector::new(options, options.weak_pvalue(), window_seed)?;
        let found = detector.change_points(&values[start..end.min(n)], start)?;
        trace!(start, end = end.min(n), complete, found = found.len(), "window analyzed");

        let last = found.iter().map(|cp| cp.index).max().unwrap_or(0);
        for cp in found {
            if complete {
                points.settled.insert(cp.index, cp.qhat);
            }
            points.all.insert(cp.index, cp.qhat);
        }
        start = last.max(start + step);
        if complete {
            points.frontier = start;
        }
    }
    Ok(points)
}

/// Remove split points until the rest are significant and large enough
fn merge(
    values: &[f64],
    split_points: &BTreeMap<usize, f64>,
    max_pvalue: f64,
    min_magnitude: f64,
) -> Result<Vec<ChangePoint<TTestStats>>> {
    let mut points: Vec<(usize, f64)> = split_points.iter().map(|(&i, &q)| (i, q)).collect();

    while !points.is_empty() {
        let indices: Vec<usize> = points.iter().map(|p| p.0).collect();
        let stats = (0..indices.len())
            .map(|i| neighbour_stats(values, &indices, i))
            .collect::<Result<Vec<_>>>()?;

        let mut victim = 0;
        for i in 1..stats.len() {
            if stats[i].pvalue > stats[victim].pvalue {
                victim = i;
            }
        }

        if stats[victim].pvalue <= max_pvalue {
            victim = 0;
            for i in 1..stats.len() {
                if stats[i].magnitude() < stats[victim].magnitude() {
                    victim = i;
                }
            }
            if stats[victim].magnitude() >= min_magnitude {
                return Ok(points
                    .into_iter()
                    .zip(stats)
                    .map(|((index, qhat), s)| {
                        ChangePoint::from_candidate(CandidateChangePoint::new(index, qhat), s)
                    })
                    .collect());
            }
        }

        trace!(index = points[victim].0, pvalue = stats[victim].pvalue, "split point merged");
        points.remove(victim);
    }
    Ok(Vec::new())
}

/// Split then merge over all observations
pub(crate) fn compute(
    values: &[f64],
    options: &AnalysisOptions,
    seed: Option<u64>,
) -> Result<MetricState> {
    search(values, options, seed, BTreeMap::new(), 0, &[])
}

/// Re-analyze a metric after new observations were appended
///
/// Only windows from the previous frontier on are searched again. Settled
/// weak points more than `weak_retention` positions before the frontier are
/// dropped; confirmed points are always kept.
pub(crate) fn resume(
    values: &[f64],
    options: &AnalysisOptions,
    seed: Option<u64>,
    prior: &MetricState,
) -> Result<MetricState> {
    let confirmed = prior.confirmed_indices();
    let settled: BTreeMap<usize, f64> = prior
        .settled
        .iter()
        .filter(|(&index, _)| {
            confirmed.binary_search(&index).is_ok()
                || options
                    .weak_retention
                    .map_or(true, |keep| index + keep >= prior.frontier)
        })
        .map(|(&index, &qhat)| (index, qhat))
        .collect();
    if settled.len() < prior.settled.len() {
        trace!(dropped = prior.settled.len() - settled.len(), "weak points evicted");
    }
    debug!(
        new_len = values.len(),
        frontier = prior.frontier,
        settled = settled.len(),
        "resuming metric"
    );
    search(values, options, seed, settled, prior.frontier, &prior.confirmed)
}

/// Window search from `from_index`, then merge
///
/// Confirmed points in `carried` that lie past the new frontier join the
/// merge again, so a change confirmed on a short tail is kept until the
/// windows covering it are complete.
fn search(
    values: &[f64],
    options: &AnalysisOptions,
    seed: Option<u64>,
    settled: BTreeMap<usize, f64>,
    from_index: usize,
    carried: &[ChangePoint<TestStatistics>],
) -> Result<MetricState> {
    let SplitPoints {
        mut all,
        settled,
        frontier,
    } = split(values, options, seed, settled, from_index)?;
    for cp in carried {
        if cp.index >= frontier && cp.index < values.len() {
            all.entry(cp.index).or_insert(cp.qhat);
        }
    }

    let confirmed = merge(values, &all, options.max_pvalue, options.min_magnitude)?;
    let confirmed_indices: Vec<usize> = confirmed.iter().map(|cp| cp.index).collect();

    // Weak points are described against the confirmed segmentation around them
    let mut weak = Vec::new();
    for (&index, &qhat) in &all {
        if confirmed_indices.binary_search(&index).is_ok() {
            continue;
        }
        let position = confirmed_indices.partition_point(|&c| c < index);
        let left = if position == 0 { 0 } else { confirmed_indices[position - 1] };
        let right = confirmed_indices.get(position).copied().unwrap_or(values.len());
        let stats = compare(&values[left..index], &values[index..right])?;
        weak.push(ChangePoint::from_candidate(
            CandidateChangePoint::new(index, qhat),
            TestStatistics::from(stats),
        ));
    }

    debug!(
        confirmed = confirmed.len(),
        weak = weak.len(),
        from_index,
        frontier,
        "metric analyzed"
    );
    Ok(MetricState {
        confirmed: confirmed
            .into_iter()
            .map(|cp| cp.map_stats(TestStatistics::from))
            .collect(),
        weak,
        settled,
        frontier,
    })
}

/// Run the plain recursive detector over all observations
///
/// Change points are then dropped smallest magnitude first while any falls
/// below `min_magnitude`.
pub(crate) fn compute_full(
    values: &[f64],
    options: &AnalysisOptions,
    seed: Option<u64>,
) -> Result<MetricState> {
    let mut detector = MetricDetector::new(options, options.max_pvalue, seed)?;
    let mut confirmed = detector.change_points(values, 0)?;

    while !confirmed.is_empty() {
        let indices: Vec<usize> = confirmed.iter().map(|cp| cp.index).collect();
        let magnitudes = (0..indices.len())
            .map(|i| neighbour_stats(values, &indices, i).map(|s| s.magnitude()))
            .collect::<Result<Vec<_>>>()?;
        let mut smallest = 0;
        for i in 1..magnitudes.len() {
            if magnitudes[i] < magnitudes[smallest] {
                smallest = i;
            }
        }
        if magnitudes[smallest] >= options.min_magnitude {
            break;
        }
        confirmed.remove(smallest);
    }

    Ok(MetricState {
        confirmed,
        ..MetricState::default()
    })
}
