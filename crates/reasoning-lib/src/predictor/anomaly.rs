//! Anomaly-based failure prediction
//!
//! An [`OutlierDetector`] is chosen once when the predictor is built. The
//! isolation forest is the real implementation; the disabled detector stands
//! in when anomaly detection is switched off and never reports anything.

use super::features::{feature_matrix, percentile, FeatureVector, FEATURE_DIMENSIONS};
use super::{SubPrediction, SubPredictor};
use crate::models::{MetricsSnapshot, PredictionMetrics, RootCauseType};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use std::sync::RwLock;
use tracing::{debug, info};

/// Minimum history length for anomaly detection
pub const MIN_ANOMALY_POINTS: usize = 5;
/// Number of trailing points inspected for outliers
pub const RECENT_WINDOW: usize = 3;
/// Outliers needed within the trailing window to fire
pub const MIN_RECENT_OUTLIERS: usize = 2;
pub const MAX_ANOMALY_PROBABILITY: f64 = 0.8;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Scores and outlier flags for a set of points
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierReport {
    /// Negative; lower means more anomalous
    pub scores: Vec<f64>,
    pub outliers: Vec<bool>,
}

/// Capability for scoring points against a training set
pub trait OutlierDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Fit on `training` and score `points`. `None` when unavailable.
    fn detect(&self, training: &[FeatureVector], points: &[FeatureVector]) -> Result<Option<OutlierReport>>;
}

/// Stand-in used when anomaly detection is disabled
pub struct DisabledOutlierDetector;

impl OutlierDetector for DisabledOutlierDetector {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn detect(&self, _training: &[FeatureVector], _points: &[FeatureVector]) -> Result<Option<OutlierReport>> {
        Ok(None)
    }
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn build(data: &[FeatureVector], indices: Vec<usize>, depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
        if depth >= max_depth || indices.len() <= 1 {
            return Node::Leaf { size: indices.len() };
        }

        // Only features that vary inside this node can split it
        let ranges: Vec<(usize, f64, f64)> = (0..FEATURE_DIMENSIONS)
            .filter_map(|feature| {
                let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(data[i][feature]), hi.max(data[i][feature]))
                });
                // A span too wide for f64 cannot be sampled
                (max > min && (max - min).is_finite()).then_some((feature, min, max))
            })
            .collect();
        if ranges.is_empty() {
            return Node::Leaf { size: indices.len() };
        }

        let (feature, min, max) = ranges[rng.gen_range(0..ranges.len())];
        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&i| data[i][feature] <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(Node::build(data, left, depth + 1, max_depth, rng)),
            right: Box::new(Node::build(data, right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, point: &FeatureVector) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] <= *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Isolation forest with a fixed seed, so identical input yields identical
/// scores.
#[derive(Debug, Clone)]
pub struct IsolationForestDetector {
    pub n_trees: usize,
    pub max_samples: usize,
    /// Expected share of outliers; sets the decision offset
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestDetector {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

impl IsolationForestDetector {
    fn fit(&self, training: &[FeatureVector]) -> (Vec<Node>, usize) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let subsample = self.max_samples.min(training.len());
        let max_depth = (subsample.max(2) as f64).log2().ceil() as usize;

        let trees = (0..self.n_trees)
            .map(|_| {
                let indices = sample(&mut rng, training.len(), subsample).into_vec();
                Node::build(training, indices, 0, max_depth, &mut rng)
            })
            .collect();
        (trees, subsample)
    }

    fn score(trees: &[Node], subsample: usize, point: &FeatureVector) -> f64 {
        let mean_path = trees.iter().map(|t| t.path_length(point)).sum::<f64>() / trees.len() as f64;
        -(2f64.powf(-mean_path / average_path_length(subsample)))
    }
}

impl OutlierDetector for IsolationForestDetector {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn detect(&self, training: &[FeatureVector], points: &[FeatureVector]) -> Result<Option<OutlierReport>> {
        if training.len() < 2 || self.n_trees == 0 {
            anyhow::bail!("isolation forest needs at least 2 training points and 1 tree");
        }
        if training.iter().chain(points).flatten().any(|v| !v.is_finite()) {
            anyhow::bail!("isolation forest input contains non-finite features");
        }

        let (trees, subsample) = self.fit(training);
        let training_scores: Vec<f64> = training
            .iter()
            .map(|p| Self::score(&trees, subsample, p))
            .collect();
        let offset = percentile(&training_scores, self.contamination * 100.0);

        let scores: Vec<f64> = points
            .iter()
            .map(|p| Self::score(&trees, subsample, p))
            .collect();
        let outliers = scores.iter().map(|s| *s < offset).collect();

        Ok(Some(OutlierReport { scores, outliers }))
    }
}

/// Flags recent history points that look unlike the rest.
///
/// Without a trained baseline the forest is fit on the request's own history.
pub struct AnomalyPredictor {
    detector: Box<dyn OutlierDetector>,
    baseline: RwLock<Option<Vec<FeatureVector>>>,
}

impl AnomalyPredictor {
    pub fn new(detector: Box<dyn OutlierDetector>) -> Self {
        Self {
            detector,
            baseline: RwLock::new(None),
        }
    }

    pub fn isolation_forest() -> Self {
        Self::new(Box::new(IsolationForestDetector::default()))
    }

    pub fn disabled() -> Self {
        Self::new(Box::new(DisabledOutlierDetector))
    }

    pub fn is_available(&self) -> bool {
        self.detector.is_available()
    }

    /// Use `history` as the reference distribution for later requests.
    /// Returns false when the detector is unavailable or the history is too
    /// short to fit.
    pub fn train_baseline(&self, history: &[MetricsSnapshot]) -> bool {
        if !self.detector.is_available() || history.len() < MIN_ANOMALY_POINTS {
            return false;
        }
        let features = feature_matrix(history);
        match self.baseline.write() {
            Ok(mut baseline) => {
                *baseline = Some(features);
                info!(samples = history.len(), "Anomaly baseline trained");
                true
            }
            Err(_) => false,
        }
    }

    pub fn clear_baseline(&self) {
        if let Ok(mut baseline) = self.baseline.write() {
            *baseline = None;
        }
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.read().map(|b| b.is_some()).unwrap_or(false)
    }
}

impl SubPredictor for AnomalyPredictor {
    fn name(&self) -> &'static str {
        "anomaly"
    }

    fn evaluate(&self, metrics: &PredictionMetrics) -> Result<Option<SubPrediction>> {
        if !self.detector.is_available() || metrics.history.len() < MIN_ANOMALY_POINTS {
            return Ok(None);
        }

        let points = feature_matrix(&metrics.history);
        let baseline = self
            .baseline
            .read()
            .map_err(|_| anyhow::anyhow!("anomaly baseline lock poisoned"))?
            .clone();
        let training = baseline.as_deref().unwrap_or(&points[..]);

        let Some(report) = self.detector.detect(training, &points)? else {
            return Ok(None);
        };

        let recent_start = report.outliers.len().saturating_sub(RECENT_WINDOW);
        let recent_outliers = report.outliers[recent_start..].iter().filter(|o| **o).count();
        debug!(
            detector = self.detector.name(),
            recent_outliers = recent_outliers,
            "Anomaly scan complete"
        );
        if recent_outliers < MIN_RECENT_OUTLIERS {
            return Ok(None);
        }

        let last_score = report.scores.last().copied().unwrap_or(0.0);
        let mut prediction = SubPrediction::default();
        prediction.record(
            (last_score.abs() * 0.5).min(MAX_ANOMALY_PROBABILITY),
            RootCauseType::Unknown,
            "Anomalous metrics pattern detected".to_string(),
        );
        Ok(prediction.into_fired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady(count: usize) -> Vec<MetricsSnapshot> {
        (0..count)
            .map(|_| {
                MetricsSnapshot::default()
                    .with_memory(50.0)
                    .with_cpu(30.0, 0.0)
                    .with_disk(40.0)
            })
            .collect()
    }

    fn with_spikes(mut history: Vec<MetricsSnapshot>) -> Vec<MetricsSnapshot> {
        history.push(
            MetricsSnapshot::default()
                .with_memory(99.0)
                .with_cpu(95.0, 80.0)
                .with_disk(95.0)
                .with_network_error_rate(0.5)
                .with_restart_count(20.0),
        );
        history.push(
            MetricsSnapshot::default()
                .with_memory(5.0)
                .with_cpu(99.0, 0.0)
                .with_disk(10.0)
                .with_network_error_rate(0.8)
                .with_restart_count(40.0),
        );
        history.push(
            MetricsSnapshot::default()
                .with_memory(98.0)
                .with_cpu(2.0, 0.0)
                .with_disk(99.0)
                .with_network_error_rate(0.0)
                .with_restart_count(60.0),
        );
        history
    }

    fn metrics(history: Vec<MetricsSnapshot>) -> PredictionMetrics {
        PredictionMetrics {
            current: MetricsSnapshot::default(),
            history,
        }
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!(c256 > 10.0 && c256 < 11.0);
    }

    #[test]
    fn test_recent_spikes_fire() {
        let predictor = AnomalyPredictor::isolation_forest();
        let prediction = predictor
            .evaluate(&metrics(with_spikes(steady(27))))
            .unwrap()
            .unwrap();

        assert_eq!(prediction.failure_types, vec![RootCauseType::Unknown]);
        assert_eq!(
            prediction.factors,
            vec!["Anomalous metrics pattern detected".to_string()]
        );
        assert!(prediction.probability > 0.0 && prediction.probability <= MAX_ANOMALY_PROBABILITY);
    }

    #[test]
    fn test_scores_are_deterministic() {
        let points = feature_matrix(&with_spikes(steady(10)));
        let detector = IsolationForestDetector::default();
        let first = detector.detect(&points, &points).unwrap().unwrap();
        let second = detector.detect(&points, &points).unwrap().unwrap();
        assert_eq!(first, second);
        assert!(first.scores.iter().all(|s| *s < 0.0));
    }

    #[test]
    fn test_spikes_score_lower_than_steady_points() {
        let points = feature_matrix(&with_spikes(steady(27)));
        let report = IsolationForestDetector::default()
            .detect(&points, &points)
            .unwrap()
            .unwrap();

        let steady_score = report.scores[0];
        for score in &report.scores[27..] {
            assert!(*score < steady_score);
        }
        assert!(!report.outliers[0]);
    }

    #[test]
    fn test_steady_history_does_not_fire() {
        let predictor = AnomalyPredictor::isolation_forest();
        assert!(predictor.evaluate(&metrics(steady(20))).unwrap().is_none());
    }

    #[test]
    fn test_short_history_skipped() {
        let predictor = AnomalyPredictor::isolation_forest();
        assert!(predictor.evaluate(&metrics(steady(4))).unwrap().is_none());
    }

    #[test]
    fn test_disabled_detector_never_fires() {
        let predictor = AnomalyPredictor::disabled();
        assert!(!predictor.is_available());
        assert!(predictor
            .evaluate(&metrics(with_spikes(steady(27))))
            .unwrap()
            .is_none());
        assert!(!predictor.train_baseline(&steady(10)));
    }

    #[test]
    fn test_extreme_spread_does_not_split_feature() {
        let mut points: Vec<FeatureVector> = vec![[50.0, 30.0, 40.0, 0.0, 0.0]; 6];
        points.push([1.7e308, 30.0, 40.0, 0.0, 0.0]);
        points.push([-1.7e308, 30.0, 40.0, 0.0, 0.0]);

        let report = IsolationForestDetector::default()
            .detect(&points, &points)
            .unwrap()
            .unwrap();
        assert_eq!(report.scores.len(), points.len());
        assert!(report.scores.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_non_finite_features_are_rejected() {
        let mut points: Vec<FeatureVector> = vec![[50.0, 30.0, 40.0, 0.0, 0.0]; 6];
        points.push([f64::INFINITY, 30.0, 40.0, 0.0, 0.0]);

        assert!(IsolationForestDetector::default().detect(&points, &points).is_err());
    }

    #[test]
    fn test_overflowing_error_rate_is_ignored() {
        let mut history = steady(6);
        history.push(MetricsSnapshot::default().with_memory(50.0).with_network_error_rate(1e307));
        let metrics = PredictionMetrics {
            current: MetricsSnapshot::default(),
            history,
        };

        let predictor = AnomalyPredictor::isolation_forest();
        assert!(predictor.evaluate(&metrics).is_ok());
    }

    #[test]
    fn test_baseline_training() {
        let predictor = AnomalyPredictor::isolation_forest();
        let history = metrics(with_spikes(steady(5)));

        // Eight points on their own cannot yield two outliers at 10% contamination
        assert!(predictor.evaluate(&history).unwrap().is_none());

        assert!(!predictor.train_baseline(&steady(3)));
        assert!(predictor.train_baseline(&with_spikes(steady(27))));
        assert!(predictor.has_baseline());

        let prediction = predictor.evaluate(&history).unwrap().unwrap();
        assert_eq!(prediction.failure_types, vec![RootCauseType::Unknown]);

        predictor.clear_baseline();
        assert!(!predictor.has_baseline());
        assert!(predictor.evaluate(&history).unwrap().is_none());
    }
}
