//! Cross-crate integration tests

use edivisive::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Piecewise-constant levels plus a repeating, bounded wobble of amplitude `amp`
fn wobbly_levels(levels: &[f64], run: usize, amp: f64, seed: usize) -> Vec<f64> {
    (0..levels.len() * run)
        .map(|i| {
            let k = ((i * 37 + seed * 13) % 17) as f64;
            levels[i / run] + (k - 8.0) / 8.0 * amp
        })
        .collect()
}

#[test]
fn detector_and_series_agree_on_clear_shifts() {
    init_tracing();
    let values = wobbly_levels(&[100.0, 130.0], 30, 1.0, 5);

    let mut detector = ChangePointDetector::new(TTestTester::new(0.001).unwrap());
    let raw: Vec<usize> = detector
        .change_points(&values, 0)
        .unwrap()
        .iter()
        .map(|cp| cp.index)
        .collect();
    assert_eq!(raw, vec![30]);

    let series = Series::builder("shift")
        .time((0..60).collect())
        .metric("throughput", Metric::default(), values)
        .build()
        .unwrap();
    let analyzed = series.analyze(AnalysisOptions::default()).unwrap();
    assert_eq!(analyzed.change_point_indices("throughput").unwrap(), vec![30]);
}

#[test]
fn gaussian_noise_shift_is_found() {
    init_tracing();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let values: Vec<f64> = (0..80)
        .map(|i| (if i < 40 { 100.0 } else { 130.0 }) + normal.sample(&mut rng))
        .collect();

    let analyzed = Series::builder("noise")
        .time((0..80).collect())
        .metric("m", Metric::default(), values)
        .build()
        .unwrap()
        .analyze(AnalysisOptions::default())
        .unwrap();
    assert!(analyzed.change_point_indices("m").unwrap().contains(&40));
}

#[test]
fn magnitude_filter_holds_for_every_reported_change() {
    init_tracing();
    let values = wobbly_levels(&[100.0, 101.0, 150.0, 151.0], 25, 0.2, 17);
    let series = Series::builder("levels")
        .time((0..values.len() as i64).collect())
        .metric("m", Metric::default(), values)
        .build()
        .unwrap();

    let unfiltered = series.clone().analyze(AnalysisOptions::default()).unwrap();
    assert_eq!(unfiltered.change_point_indices("m").unwrap(), vec![25, 50, 75]);

    let options = AnalysisOptions::default().with_min_magnitude(0.05);
    let analyzed = series.analyze(options.clone()).unwrap();
    let changes = analyzed.change_points("m").unwrap();
    for change in &changes {
        assert!(change.magnitude >= options.min_magnitude);
    }
    assert_eq!(changes.iter().map(|c| c.index).collect::<Vec<_>>(), vec![50]);

    let weak: Vec<usize> = analyzed
        .weak_change_points("m")
        .unwrap()
        .iter()
        .map(|c| c.index)
        .collect();
    assert_eq!(weak, vec![25, 75]);
}

#[test]
fn metrics_in_one_event_are_grouped() {
    init_tracing();
    let a = wobbly_levels(&[10.0, 20.0], 20, 0.1, 1);
    let b = wobbly_levels(&[5.0, 2.0], 20, 0.05, 2);
    let series = Series::builder("grouped")
        .time((0..40).collect())
        .metric("throughput", Metric::default(), a)
        .metric("latency", Metric::new(Direction::LowerIsBetter, 1000.0).unwrap(), b)
        .build()
        .unwrap();

    let groups = series
        .analyze(AnalysisOptions::default())
        .unwrap()
        .change_points_by_time()
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].index, 20);
    let metrics: Vec<&str> = groups[0].metrics().collect();
    assert_eq!(metrics, vec!["throughput", "latency"]);
    // Throughput went up and latency went down, both good news
    assert!(!groups[0].has_regression());
}

#[test]
fn report_serializes_to_json() {
    let values = wobbly_levels(&[1.0, 2.0], 15, 0.05, 9);
    let analyzed = Series::builder("json")
        .branch("release")
        .time((0..30).collect())
        .metric("m", Metric::default(), values)
        .build()
        .unwrap()
        .analyze(AnalysisOptions::default())
        .unwrap();

    let json = analyzed.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["branch"], "release");
    assert_eq!(value["change_points"][0]["index"], 15);
    assert_eq!(value["change_points"][0]["changes"][0]["kind"], "improvement");
    assert_eq!(value["options"]["window_len"], 50);
    assert_eq!(value["options"]["strategy"]["kind"], "t_test");
}
