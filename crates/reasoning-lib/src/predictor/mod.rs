//! Failure prediction engine
//!
//! Threshold, trend and anomaly sub-predictors run independently over the
//! same metrics; their outputs are merged into one verdict.

mod anomaly;
mod features;
mod threshold;
mod trend;

pub use anomaly::{
    average_path_length, AnomalyPredictor, DisabledOutlierDetector, IsolationForestDetector,
    OutlierDetector, OutlierReport, MIN_ANOMALY_POINTS,
};
pub use features::{anomaly_features, linear_regression_slope, percentile, FeatureVector};
pub use threshold::{default_threshold_rules, ThresholdPredictor, ThresholdRule, ThresholdTier};
pub use trend::{project_exhaustion, Exhaustion, TrendConfig, TrendPredictor, MIN_TREND_POINTS};

use crate::models::{MetricsSnapshot, PredictionMetrics, PredictionVerdict, RootCauseType};
use crate::observability::ReasoningMetrics;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const INSUFFICIENT_DATA_FACTOR: &str = "Insufficient data for prediction";
/// Confidence reported when nothing fired
pub const NO_SIGNAL_CONFIDENCE: f64 = 0.5;
/// Confidence added per firing sub-predictor
pub const CONFIDENCE_PER_SIGNAL: f64 = 0.3;
pub const MAX_PREDICTION_CONFIDENCE: f64 = 0.9;

/// Output of one sub-predictor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubPrediction {
    pub probability: f64,
    pub failure_types: Vec<RootCauseType>,
    pub factors: Vec<String>,
}

impl SubPrediction {
    /// Fold one firing rule in; probability keeps the running max
    pub fn record(&mut self, probability: f64, failure_type: RootCauseType, factor: String) {
        self.probability = self.probability.max(probability);
        self.failure_types.push(failure_type);
        self.factors.push(factor);
    }

    /// `Some` only if something fired with a positive probability
    pub fn into_fired(self) -> Option<Self> {
        (self.probability > 0.0).then_some(self)
    }
}

/// Trait for failure sub-predictors
pub trait SubPredictor: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when nothing fired. Errors are logged by the caller and the
    /// sub-predictor is skipped.
    fn evaluate(&self, metrics: &PredictionMetrics) -> Result<Option<SubPrediction>>;
}

/// Hours ahead for the predicted failure time, by probability floor
const TIME_BUCKETS: &[(f64, i64)] = &[(0.8, 1), (0.6, 6), (0.4, 24)];

pub fn estimate_failure_time(probability: f64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    TIME_BUCKETS
        .iter()
        .find(|(floor, _)| probability >= *floor)
        .map(|(_, hours)| now + Duration::hours(*hours))
}

/// Merge sub-predictions in the order they were produced
pub fn aggregate(predictions: &[SubPrediction], now: DateTime<Utc>) -> PredictionVerdict {
    if predictions.is_empty() {
        return PredictionVerdict {
            failure_probability: 0.0,
            predicted_failure_time: None,
            failure_types: Vec::new(),
            confidence: NO_SIGNAL_CONFIDENCE,
            contributing_factors: vec![INSUFFICIENT_DATA_FACTOR.to_string()],
        };
    }

    let probability = predictions
        .iter()
        .map(|p| p.probability)
        .fold(0.0_f64, f64::max);

    let mut failure_types: Vec<RootCauseType> = Vec::new();
    for t in predictions.iter().flat_map(|p| p.failure_types.iter()) {
        if !failure_types.contains(t) {
            failure_types.push(*t);
        }
    }

    PredictionVerdict {
        failure_probability: probability,
        predicted_failure_time: estimate_failure_time(probability, now),
        failure_types,
        confidence: (predictions.len() as f64 * CONFIDENCE_PER_SIGNAL).min(MAX_PREDICTION_CONFIDENCE),
        contributing_factors: predictions
            .iter()
            .flat_map(|p| p.factors.iter().cloned())
            .collect(),
    }
}

/// Runs threshold, trend and anomaly sub-predictors
pub struct FailurePredictor {
    sub_predictors: Vec<Box<dyn SubPredictor>>,
    anomaly: Option<std::sync::Arc<AnomalyPredictor>>,
    metrics: ReasoningMetrics,
}

impl FailurePredictor {
    /// Default sub-predictors. `anomaly_detection` picks the outlier
    /// detector once for the lifetime of the predictor.
    pub fn new(anomaly_detection: bool) -> Self {
        let anomaly = std::sync::Arc::new(if anomaly_detection {
            AnomalyPredictor::isolation_forest()
        } else {
            AnomalyPredictor::disabled()
        });
        let mut predictor = Self::with_sub_predictors(vec![
            Box::new(ThresholdPredictor::new()),
            Box::new(TrendPredictor::default()),
            Box::new(SharedAnomaly(anomaly.clone())),
        ]);
        predictor.anomaly = Some(anomaly);
        predictor
    }

    pub fn with_sub_predictors(sub_predictors: Vec<Box<dyn SubPredictor>>) -> Self {
        Self {
            sub_predictors,
            anomaly: None,
            metrics: ReasoningMetrics::new(),
        }
    }

    pub fn anomaly_detection_available(&self) -> bool {
        self.anomaly.as_ref().map_or(false, |a| a.is_available())
    }

    /// Fit the anomaly detector on reference history instead of per-request
    /// history. Returns false if anomaly detection is unavailable.
    pub fn train_anomaly_baseline(&self, history: &[MetricsSnapshot]) -> bool {
        self.anomaly
            .as_ref()
            .map_or(false, |a| a.train_baseline(history))
    }

    pub fn predict(
        &self,
        resource_type: &str,
        resource_name: &str,
        metrics: &PredictionMetrics,
    ) -> PredictionVerdict {
        let start = Instant::now();
        let mut fired = Vec::with_capacity(self.sub_predictors.len());

        for sub in &self.sub_predictors {
            match sub.evaluate(metrics) {
                Ok(Some(prediction)) => {
                    debug!(
                        sub_predictor = sub.name(),
                        probability = prediction.probability,
                        "Sub-predictor fired"
                    );
                    fired.push(prediction);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(sub_predictor = sub.name(), error = %e, "Sub-predictor failed, skipping");
                    self.metrics.inc_detector_errors(sub.name());
                }
            }
        }

        let verdict = aggregate(&fired, Utc::now());
        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());
        info!(
            resource_type = %resource_type,
            resource_name = %resource_name,
            failure_probability = verdict.failure_probability,
            signals = fired.len(),
            "Failure prediction complete"
        );
        verdict
    }
}

/// Lets the predictor keep a handle on the anomaly stage for baseline training
struct SharedAnomaly(std::sync::Arc<AnomalyPredictor>);

impl SubPredictor for SharedAnomaly {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn evaluate(&self, metrics: &PredictionMetrics) -> Result<Option<SubPrediction>> {
        self.0.evaluate(metrics)
    }
}
