//! Feature extraction for failure prediction
//!
//! Turns metric history into the numeric series and vectors the trend and
//! anomaly predictors work on.

use crate::models::MetricsSnapshot;

/// Number of dimensions in an anomaly feature vector
pub const FEATURE_DIMENSIONS: usize = 5;

pub type FeatureVector = [f64; FEATURE_DIMENSIONS];

/// Memory %, CPU %, disk %, network error rate scaled to %, restart count.
///
/// Missing readings count as zero so every snapshot yields a vector. A
/// reading that overflows once scaled is treated as missing.
pub fn anomaly_features(snapshot: &MetricsSnapshot) -> FeatureVector {
    [
        snapshot.memory_usage(),
        snapshot.cpu_usage(),
        snapshot.disk_usage(),
        snapshot.network_error_rate().map(|rate| rate * 100.0),
        snapshot.restart_count,
    ]
    .map(|value| value.filter(|v| v.is_finite()).unwrap_or(0.0))
}

pub fn feature_matrix(history: &[MetricsSnapshot]) -> Vec<FeatureVector> {
    history.iter().map(anomaly_features).collect()
}

/// Values of one reading across the history, skipping snapshots without it
pub fn present_series<F>(history: &[MetricsSnapshot], read: F) -> Vec<f64>
where
    F: Fn(&MetricsSnapshot) -> Option<f64>,
{
    history.iter().filter_map(read).collect()
}

/// Linearly interpolated percentile (`p` in 0-100)
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Calculate linear regression slope for trend detection
pub fn linear_regression_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();
    let denom = n * sum_x2 - sum_x.powi(2);
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_regression_slope() {
        assert!((linear_regression_slope(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 1.0).abs() < 1e-9);
        assert!((linear_regression_slope(&[60.0, 70.0, 80.0, 90.0, 96.0]) - 9.2).abs() < 1e-9);
        assert!(linear_regression_slope(&[5.0, 5.0, 5.0]).abs() < 1e-9);
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(linear_regression_slope(&[]), 0.0);
        assert_eq!(linear_regression_slope(&[42.0]), 0.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert!((percentile(&values, 10.0) - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_anomaly_features_fill_missing() {
        let snapshot = MetricsSnapshot::default()
            .with_memory(70.0)
            .with_network_error_rate(0.25);
        assert_eq!(anomaly_features(&snapshot), [70.0, 0.0, 0.0, 25.0, 0.0]);
    }

    #[test]
    fn test_anomaly_features_drop_overflowing_readings() {
        let snapshot = MetricsSnapshot::default()
            .with_memory(50.0)
            .with_network_error_rate(1e307);
        assert_eq!(anomaly_features(&snapshot), [50.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_present_series_skips_missing() {
        let history = vec![
            MetricsSnapshot::default().with_disk(10.0),
            MetricsSnapshot::default(),
            MetricsSnapshot::default().with_disk(20.0),
        ];
        assert_eq!(present_series(&history, MetricsSnapshot::disk_usage), vec![10.0, 20.0]);
    }
}
