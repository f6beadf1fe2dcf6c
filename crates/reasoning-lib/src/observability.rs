//! Observability infrastructure for the reasoning service
//!
//! Provides:
//! - Prometheus metrics (analysis and prediction latency, verdicts, feedback, detector errors)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ReasoningMetricsInner> = OnceLock::new();

struct ReasoningMetricsInner {
    analysis_latency_seconds: Histogram,
    prediction_latency_seconds: Histogram,
    verdicts_total: IntCounterVec,
    predictions_total: IntCounter,
    feedback_total: IntCounterVec,
    detector_errors_total: IntCounterVec,
    case_store_errors_total: IntCounterVec,
    last_recommendations: IntGauge,
}

impl ReasoningMetricsInner {
    fn new() -> Self {
        Self {
            analysis_latency_seconds: register_histogram!(
                "reasoning_analysis_latency_seconds",
                "Time spent producing a root cause verdict",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register analysis_latency_seconds"),

            prediction_latency_seconds: register_histogram!(
                "reasoning_prediction_latency_seconds",
                "Time spent producing a failure prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            verdicts_total: register_int_counter_vec!(
                "reasoning_verdicts_total",
                "Root cause verdicts by identified type",
                &["root_cause"]
            )
            .expect("Failed to register verdicts_total"),

            predictions_total: register_int_counter!(
                "reasoning_predictions_total",
                "Total number of failure predictions"
            )
            .expect("Failed to register predictions_total"),

            feedback_total: register_int_counter_vec!(
                "reasoning_feedback_total",
                "Accepted feedback by type",
                &["feedback_type"]
            )
            .expect("Failed to register feedback_total"),

            detector_errors_total: register_int_counter_vec!(
                "reasoning_detector_errors_total",
                "Detector failures converted to no candidate",
                &["detector"]
            )
            .expect("Failed to register detector_errors_total"),

            case_store_errors_total: register_int_counter_vec!(
                "reasoning_case_store_errors_total",
                "Case store calls that failed or timed out",
                &["operation"]
            )
            .expect("Failed to register case_store_errors_total"),

            last_recommendations: register_int_gauge!(
                "reasoning_last_recommendations",
                "Number of recommendations in the most recent response"
            )
            .expect("Failed to register last_recommendations"),
        }
    }
}

/// Reasoning metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct ReasoningMetrics {
    _private: (),
}

impl Default for ReasoningMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReasoningMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ReasoningMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ReasoningMetricsInner {
        GLOBAL_METRICS.get_or_init(ReasoningMetricsInner::new)
    }

    pub fn observe_analysis_latency(&self, duration_secs: f64) {
        self.inner().analysis_latency_seconds.observe(duration_secs);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Count a verdict; unidentified verdicts are labelled "none"
    pub fn inc_verdicts(&self, root_cause: &str) {
        self.inner()
            .verdicts_total
            .with_label_values(&[root_cause])
            .inc();
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_feedback(&self, feedback_type: &str) {
        self.inner()
            .feedback_total
            .with_label_values(&[feedback_type])
            .inc();
    }

    pub fn inc_detector_errors(&self, detector: &str) {
        self.inner()
            .detector_errors_total
            .with_label_values(&[detector])
            .inc();
    }

    pub fn inc_case_store_errors(&self, operation: &str) {
        self.inner()
            .case_store_errors_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn set_last_recommendations(&self, count: i64) {
        self.inner().last_recommendations.set(count);
    }
}

/// Structured logger for reasoning events
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn log_root_cause(
        &self,
        request_id: &str,
        root_cause: Option<&str>,
        confidence: f64,
        recommendations: usize,
        similar_cases: usize,
    ) {
        info!(
            event = "root_cause_identified",
            service = %self.service_name,
            request_id = %request_id,
            root_cause = root_cause.unwrap_or("none"),
            confidence = confidence,
            recommendations = recommendations,
            similar_cases = similar_cases,
            "Root cause analysis completed"
        );
    }

    pub fn log_prediction(
        &self,
        resource_type: &str,
        resource_name: &str,
        failure_probability: f64,
        failure_types: &[String],
    ) {
        if failure_probability >= 0.8 {
            warn!(
                event = "failure_predicted",
                service = %self.service_name,
                resource_type = %resource_type,
                resource_name = %resource_name,
                failure_probability = failure_probability,
                failure_types = ?failure_types,
                "High failure probability predicted"
            );
        } else {
            info!(
                event = "failure_predicted",
                service = %self.service_name,
                resource_type = %resource_type,
                resource_name = %resource_name,
                failure_probability = failure_probability,
                failure_types = ?failure_types,
                "Failure prediction completed"
            );
        }
    }

    pub fn log_feedback(&self, feedback_id: &str, feedback_type: &str, rating: u8, accepted: bool) {
        info!(
            event = "feedback_processed",
            service = %self.service_name,
            feedback_id = %feedback_id,
            feedback_type = %feedback_type,
            rating = rating,
            accepted = accepted,
            "Feedback processed"
        );
    }

    pub fn log_case_store_degraded(&self, backend: &str, reason: &str) {
        warn!(
            event = "case_store_degraded",
            service = %self.service_name,
            backend = %backend,
            reason = %reason,
            "Case store degraded, similar cases unavailable"
        );
    }

    pub fn log_startup(&self, version: &str, case_store_backend: &str, anomaly_detection: bool) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            case_store = %case_store_backend,
            anomaly_detection = anomaly_detection,
            "Reasoning service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Reasoning service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_metrics_handles_share_registry() {
        let metrics = ReasoningMetrics::new();
        let other = metrics.clone();

        metrics.observe_analysis_latency(0.001);
        other.observe_prediction_latency(0.002);
        metrics.inc_verdicts("OOMKiller");
        metrics.inc_predictions();
        metrics.inc_feedback("diagnosis_accuracy");
        metrics.inc_detector_errors("logs");
        metrics.inc_case_store_errors("find_similar_cases");
        metrics.set_last_recommendations(3);

        // A second handle must not re-register
        let _again = ReasoningMetrics::new();

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "reasoning_verdicts_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("reasoning-test");
        assert_eq!(logger.service_name(), "reasoning-test");
        logger.log_prediction("pod", "api-1", 0.9, &["OOMKiller".to_string()]);
    }
}
