//! Property-based tests for incremental analysis
//!
//! Appending observations in any batching must agree with analyzing the
//! whole series at once, apart from points carried in the unfinished tail.

use edivisive_series::*;
use proptest::prelude::*;
use rand::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

fn single_metric(values: &[f64]) -> Series {
    Series::builder("prop")
        .time((0..values.len() as i64).collect())
        .metric("m", Metric::default(), values.to_vec())
        .build()
        .unwrap()
}

/// Analyze `initial` observations, then append the rest `batch` at a time
fn incremental(values: &[f64], initial: usize, batch: usize, options: &AnalysisOptions) -> AnalyzedSeries {
    let mut analyzed = single_metric(&values[..initial]).analyze(options.clone()).unwrap();
    let mut n = initial;
    while n < values.len() {
        let m = (n + batch).min(values.len());
        analyzed
            .append(
                &AppendBatch::new((n as i64..m as i64).collect())
                    .with_metric("m", values[n..m].to_vec()),
            )
            .unwrap();
        n = m;
    }
    analyzed
}

fn split_points(analyzed: &AnalyzedSeries) -> Vec<usize> {
    let mut points = analyzed.change_point_indices("m").unwrap();
    points.extend(analyzed.weak_change_points("m").unwrap().iter().map(|c| c.index));
    points.sort_unstable();
    points
}

/// Uniform noise in [-1, 1) on top of piecewise-constant levels
fn noisy_levels(seed: u64, levels: &[f64], run: usize) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    levels
        .iter()
        .flat_map(|&level| std::iter::repeat(level).take(run))
        .map(|level| level + rng.gen_range(-1.0..1.0))
        .collect()
}

#[test]
fn incremental_matches_scratch_on_noisy_levels() {
    for seed in 0..8 {
        let values = noisy_levels(seed, &[10.0, 11.5, 9.5, 12.0], 35);
        for window_len in [20, 30, 50] {
            let options = AnalysisOptions::default().with_window_len(window_len);
            let scratch = single_metric(&values).analyze(options.clone()).unwrap();
            let expected = scratch.change_point_indices("m").unwrap();

            for batch in [1, 9] {
                let resumed = incremental(&values, window_len, batch, &options);
                assert_eq!(
                    resumed.change_point_indices("m").unwrap(),
                    expected,
                    "seed {seed}, window {window_len}, batch {batch}"
                );
                assert_eq!(split_points(&resumed), split_points(&scratch));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_incremental_split_points_cover_scratch(
        noise in prop::collection::vec(-1.0f64..1.0, 20..100),
        shift in 0.0f64..6.0,
        shift_at in 0.1f64..0.9,
        window_len in 6usize..40,
        initial_frac in 0.0f64..1.0,
        batch in 1usize..12,
    ) {
        let len = noise.len();
        let at = (len as f64 * shift_at) as usize;
        let values: Vec<f64> = noise
            .iter()
            .enumerate()
            .map(|(i, &e)| 10.0 + e + if i >= at { shift } else { 0.0 })
            .collect();
        let initial = ((len as f64 * initial_frac) as usize).clamp(2, len);
        let options = AnalysisOptions::default().with_window_len(window_len);

        let scratch = split_points(&single_metric(&values).analyze(options.clone()).unwrap());
        let resumed = split_points(&incremental(&values, initial, batch, &options));

        // Every point the whole-series search finds is found incrementally
        for index in &scratch {
            prop_assert!(resumed.contains(index), "{index} missing from {resumed:?}");
        }
        // Anything extra was carried inside the last, unfinished window
        for index in resumed.iter().filter(|i| !scratch.contains(i)) {
            prop_assert!(index + window_len > len, "{index} outside the tail of {len}");
        }
    }
}
