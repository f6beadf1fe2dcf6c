//! Core data models for the reasoning service
//!
//! Evidence arrives loosely typed from the outside world, so every numeric
//! metric field is parsed leniently: a value that is not a number (or a
//! numeric string) is treated as missing rather than rejecting the request.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of failure categories a verdict can name.
///
/// Declaration order is the tie-breaking order used by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RootCauseType {
    #[serde(rename = "OOMKiller")]
    OomKiller,
    #[serde(rename = "CPUThrottling")]
    CpuThrottling,
    DiskPressure,
    NetworkError,
    ConfigError,
    ImagePullError,
    VolumeError,
    DependencyError,
    ResourceLimit,
    Unknown,
}

impl RootCauseType {
    pub const ALL: [RootCauseType; 10] = [
        RootCauseType::OomKiller,
        RootCauseType::CpuThrottling,
        RootCauseType::DiskPressure,
        RootCauseType::NetworkError,
        RootCauseType::ConfigError,
        RootCauseType::ImagePullError,
        RootCauseType::VolumeError,
        RootCauseType::DependencyError,
        RootCauseType::ResourceLimit,
        RootCauseType::Unknown,
    ];

    /// Wire name, as used in JSON payloads and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            RootCauseType::OomKiller => "OOMKiller",
            RootCauseType::CpuThrottling => "CPUThrottling",
            RootCauseType::DiskPressure => "DiskPressure",
            RootCauseType::NetworkError => "NetworkError",
            RootCauseType::ConfigError => "ConfigError",
            RootCauseType::ImagePullError => "ImagePullError",
            RootCauseType::VolumeError => "VolumeError",
            RootCauseType::DependencyError => "DependencyError",
            RootCauseType::ResourceLimit => "ResourceLimit",
            RootCauseType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RootCauseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRootCause(pub String);

impl fmt::Display for UnknownRootCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown root cause type: {}", self.0)
    }
}

impl std::error::Error for UnknownRootCause {}

impl FromStr for RootCauseType {
    type Err = UnknownRootCause;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RootCauseType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownRootCause(s.to_string()))
    }
}

/// Kubernetes-style event attached to an analysis request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usage_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub throttling_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    /// Fraction of failed requests, 0.0 - 1.0
    #[serde(default, deserialize_with = "lenient_f64")]
    pub error_rate: Option<f64>,
}

/// Point-in-time resource metrics for a workload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default, deserialize_with = "lenient")]
    pub memory: Option<MemoryMetrics>,
    #[serde(default, deserialize_with = "lenient")]
    pub cpu: Option<CpuMetrics>,
    #[serde(default, deserialize_with = "lenient")]
    pub disk: Option<DiskMetrics>,
    #[serde(default, deserialize_with = "lenient")]
    pub network: Option<NetworkMetrics>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub restart_count: Option<f64>,
}

impl MetricsSnapshot {
    /// True when no section carried a usable value
    pub fn is_empty(&self) -> bool {
        *self == MetricsSnapshot::default()
    }

    pub fn memory_usage(&self) -> Option<f64> {
        self.memory.as_ref().and_then(|m| m.usage_percent)
    }

    pub fn cpu_usage(&self) -> Option<f64> {
        self.cpu.as_ref().and_then(|c| c.usage_percent)
    }

    pub fn cpu_throttling(&self) -> Option<f64> {
        self.cpu.as_ref().and_then(|c| c.throttling_percent)
    }

    pub fn disk_usage(&self) -> Option<f64> {
        self.disk.as_ref().and_then(|d| d.usage_percent)
    }

    pub fn network_error_rate(&self) -> Option<f64> {
        self.network.as_ref().and_then(|n| n.error_rate)
    }

    pub fn with_memory(mut self, usage_percent: f64) -> Self {
        self.memory = Some(MemoryMetrics {
            usage_percent: Some(usage_percent),
        });
        self
    }

    pub fn with_cpu(mut self, usage_percent: f64, throttling_percent: f64) -> Self {
        self.cpu = Some(CpuMetrics {
            usage_percent: Some(usage_percent),
            throttling_percent: Some(throttling_percent),
        });
        self
    }

    pub fn with_disk(mut self, usage_percent: f64) -> Self {
        self.disk = Some(DiskMetrics {
            usage_percent: Some(usage_percent),
        });
        self
    }

    pub fn with_network_error_rate(mut self, error_rate: f64) -> Self {
        self.network = Some(NetworkMetrics {
            error_rate: Some(error_rate),
        });
        self
    }

    pub fn with_restart_count(mut self, restarts: f64) -> Self {
        self.restart_count = Some(restarts);
        self
    }
}

/// Typed evidence extracted from an analysis context.
///
/// Immutable once received; every analyzer reads the same value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default, deserialize_with = "lenient")]
    pub event: Option<EventRecord>,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub metrics: Option<MetricsSnapshot>,
    #[serde(default)]
    pub topology: Option<serde_json::Value>,
    #[serde(default)]
    pub historical_data: Option<Vec<serde_json::Value>>,
}

impl Evidence {
    pub fn with_event(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.event = Some(EventRecord {
            reason: reason.into(),
            message: message.into(),
        });
        self
    }

    pub fn with_logs(mut self, logs: impl Into<String>) -> Self {
        self.logs = Some(logs.into());
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsSnapshot) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Metrics were supplied and at least one section parsed
    pub fn has_metrics(&self) -> bool {
        self.metrics.as_ref().is_some_and(|m| !m.is_empty())
    }

    pub fn event_reason(&self) -> Option<&str> {
        self.event.as_ref().map(|e| e.reason.as_str())
    }
}

/// Current metrics plus an ordered history (oldest first) for prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetrics {
    #[serde(flatten)]
    pub current: MetricsSnapshot,
    #[serde(default, deserialize_with = "lenient_history")]
    pub history: Vec<MetricsSnapshot>,
}

/// Diagnosis produced by the root-cause analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseVerdict {
    /// `None` only when no detector produced a candidate
    pub root_cause: Option<RootCauseType>,
    pub description: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

impl RootCauseVerdict {
    pub const INSUFFICIENT_DATA: &'static str = "Insufficient data for analysis";

    pub fn insufficient_data() -> Self {
        Self {
            root_cause: None,
            description: "Unable to determine root cause".to_string(),
            confidence: 0.0,
            evidence: vec![Self::INSUFFICIENT_DATA.to_string()],
        }
    }

    pub fn is_identified(&self) -> bool {
        self.root_cause.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Ranking multiplier: riskier actions sort lower at equal confidence
    pub fn weight(&self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 0.9,
            RiskLevel::High => 0.7,
            RiskLevel::Critical => 0.5,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Remediation action proposed for a verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    pub description: String,
    pub confidence: f64,
    pub risk: RiskLevel,
    pub impact: String,
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_steps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Recommendation {
    pub fn ranking_score(&self) -> f64 {
        self.confidence * self.risk.weight()
    }
}

/// Output of the failure predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionVerdict {
    pub failure_probability: f64,
    pub predicted_failure_time: Option<DateTime<Utc>>,
    pub failure_types: Vec<RootCauseType>,
    pub confidence: f64,
    pub contributing_factors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    DiagnosisAccuracy,
    RecommendationUsefulness,
    PredictionAccuracy,
}

impl FeedbackType {
    pub const ALL: [FeedbackType; 3] = [
        FeedbackType::DiagnosisAccuracy,
        FeedbackType::RecommendationUsefulness,
        FeedbackType::PredictionAccuracy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::DiagnosisAccuracy => "diagnosis_accuracy",
            FeedbackType::RecommendationUsefulness => "recommendation_usefulness",
            FeedbackType::PredictionAccuracy => "prediction_accuracy",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User feedback on a previous analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub feedback_id: String,
    pub request_id: String,
    pub feedback_type: FeedbackType,
    /// Expected within 1..=5; anything else is rejected by the learning system
    pub rating: u8,
    pub was_helpful: bool,
    #[serde(default)]
    pub actual_root_cause: Option<String>,
    #[serde(default)]
    pub actual_solution: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    pub submitted_by: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Feedback {
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 5;

    pub fn has_valid_rating(&self) -> bool {
        (Self::MIN_RATING..=Self::MAX_RATING).contains(&self.rating)
    }

    /// Actual root cause, if present and one of the known types
    pub fn parsed_root_cause(&self) -> Option<RootCauseType> {
        self.actual_root_cause.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Per-root-cause diagnosis accuracy.
///
/// Counters only move through [`AccuracyMetric::record`], and accuracy is
/// always derived from them. Deserialized values recompute accuracy too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AccuracyMetricRecord")]
pub struct AccuracyMetric {
    total_diagnoses: u64,
    correct_diagnoses: u64,
    accuracy: f64,
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
struct AccuracyMetricRecord {
    #[serde(default)]
    total_diagnoses: u64,
    #[serde(default)]
    correct_diagnoses: u64,
    #[serde(default = "Utc::now")]
    last_updated: DateTime<Utc>,
}

impl From<AccuracyMetricRecord> for AccuracyMetric {
    fn from(record: AccuracyMetricRecord) -> Self {
        let correct = record.correct_diagnoses.min(record.total_diagnoses);
        Self {
            total_diagnoses: record.total_diagnoses,
            correct_diagnoses: correct,
            accuracy: ratio(correct, record.total_diagnoses),
            last_updated: record.last_updated,
        }
    }
}

impl Default for AccuracyMetric {
    fn default() -> Self {
        Self::new()
    }
}

impl AccuracyMetric {
    pub fn new() -> Self {
        Self {
            total_diagnoses: 0,
            correct_diagnoses: 0,
            accuracy: 0.0,
            last_updated: Utc::now(),
        }
    }

    pub fn record(&mut self, correct: bool) {
        self.total_diagnoses += 1;
        if correct {
            self.correct_diagnoses += 1;
        }
        self.accuracy = ratio(self.correct_diagnoses, self.total_diagnoses);
        self.last_updated = Utc::now();
    }

    pub fn total_diagnoses(&self) -> u64 {
        self.total_diagnoses
    }

    pub fn correct_diagnoses(&self) -> u64 {
        self.correct_diagnoses
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

pub(crate) fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Historical incident stored in the case store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStudy {
    pub id: String,
    pub title: String,
    pub description: String,
    pub symptoms: Vec<String>,
    pub root_cause: String,
    pub solution: String,
    pub outcome: String,
    pub cluster_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Case-store hit for an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCase {
    pub case_id: String,
    pub description: String,
    pub similarity_score: f64,
    pub root_cause: String,
    pub solution: String,
    pub outcome: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    #[default]
    RootCause,
    Prediction,
    Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub timeout: String,
    pub min_confidence: f64,
    pub include_similar_cases: bool,
    pub max_recommendations: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            timeout: "30s".to_string(),
            min_confidence: 0.7,
            include_similar_cases: true,
            max_recommendations: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub request_id: String,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub analysis_type: AnalysisType,
    #[serde(default)]
    pub context: Evidence,
    #[serde(default)]
    pub options: AnalysisOptions,
}

/// Verdict with its recommendations and related historical cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub verdict: RootCauseVerdict,
    pub recommendations: Vec<Recommendation>,
    pub similar_cases: Vec<SimilarCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(default)]
    pub cluster_id: String,
    pub resource_type: String,
    pub resource_name: String,
    #[serde(default)]
    pub metrics: PredictionMetrics,
    #[serde(default = "default_time_window")]
    pub time_window: String,
}

fn default_time_window() -> String {
    "24h".to_string()
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite()))
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// Malformed entries keep their slot so trend indices stay aligned.
fn lenient_history<'de, D>(deserializer: D) -> Result<Vec<MetricsSnapshot>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let entries = match value {
        Some(serde_json::Value::Array(entries)) => entries,
        _ => return Ok(Vec::new()),
    };
    Ok(entries
        .into_iter()
        .map(|entry| serde_json::from_value(entry).unwrap_or_default())
        .collect())
}
