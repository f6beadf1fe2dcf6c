//! Learning system: accuracy tracking from operator feedback
//!
//! Feedback never alters in-flight analysis. It feeds per-type accuracy
//! metrics and a per-request feedback log, both read back for reports.

mod reports;

pub use reports::{
    AccuracyView, ImprovementSuggestion, LearningImport, LearningSnapshot, TopPattern,
    TrendDirection, TrendReport,
};

use crate::knowledge::{CaseStore, FeedbackRecord};
use crate::models::{ratio, AccuracyMetric, Feedback, FeedbackType, RootCauseType};
use crate::observability::ReasoningMetrics;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Diagnoses needed before a type is reported as low accuracy
pub const LOW_ACCURACY_MIN_DIAGNOSES: u64 = 5;
pub const LOW_ACCURACY_THRESHOLD: f64 = 0.7;
/// Unhelpful feedback entries naming the same actual root cause
pub const MISDIAGNOSIS_MIN_OCCURRENCES: usize = 3;
/// Diagnoses needed before a type can rank as a top pattern
pub const TOP_PATTERN_MIN_DIAGNOSES: u64 = 3;
/// Rating at or above which a helpful diagnosis counts as correct
pub const CORRECT_MIN_RATING: u8 = 4;
/// Mean rating at or above which the trend is improving
pub const IMPROVING_MIN_AVERAGE: f64 = 4.0;

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("invalid time window '{0}', expected '<days>d' such as '7d'")]
    InvalidWindow(String),
}

pub struct LearningSystem {
    accuracy: DashMap<RootCauseType, AccuracyMetric>,
    /// Feedback keyed by request id, in arrival order per request
    feedback_log: RwLock<HashMap<String, Vec<Feedback>>>,
    case_store: Option<Arc<dyn CaseStore>>,
    metrics: ReasoningMetrics,
}

impl Default for LearningSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningSystem {
    pub fn new() -> Self {
        let accuracy = DashMap::new();
        for root_cause in RootCauseType::ALL {
            accuracy.insert(root_cause, AccuracyMetric::new());
        }
        info!("Learning system initialized");
        Self {
            accuracy,
            feedback_log: RwLock::new(HashMap::new()),
            case_store: None,
            metrics: ReasoningMetrics::new(),
        }
    }

    /// Forward feedback naming an actual root cause to this store
    pub fn with_case_store(mut self, store: Arc<dyn CaseStore>) -> Self {
        self.case_store = Some(store);
        self
    }

    /// Record feedback. Returns false, recording nothing, when the rating is
    /// outside 1..=5.
    pub async fn process_feedback(&self, feedback: Feedback) -> bool {
        if !feedback.has_valid_rating() {
            warn!(
                feedback_id = %feedback.feedback_id,
                rating = feedback.rating,
                "Rejected feedback with out of range rating"
            );
            return false;
        }

        match feedback.feedback_type {
            FeedbackType::DiagnosisAccuracy => self.update_diagnosis_metrics(&feedback),
            FeedbackType::RecommendationUsefulness => {
                debug!(rating = feedback.rating, "Recommendation feedback recorded");
            }
            FeedbackType::PredictionAccuracy => {
                debug!(was_helpful = feedback.was_helpful, "Prediction feedback recorded");
            }
        }

        let forward = self
            .case_store
            .as_ref()
            .filter(|_| feedback.actual_root_cause.is_some())
            .map(|store| (Arc::clone(store), feedback_record(&feedback)));
        let request_id = feedback.request_id.clone();

        self.metrics.inc_feedback(feedback.feedback_type.as_str());
        debug!(
            feedback_id = %feedback.feedback_id,
            rating = feedback.rating,
            helpful = feedback.was_helpful,
            "Feedback processed"
        );
        self.append_to_log(feedback);

        if let Some((store, record)) = forward {
            match store.add_feedback(&request_id, &record).await {
                Ok(true) => debug!(request_id = %request_id, "Feedback attached to case"),
                Ok(false) => debug!(request_id = %request_id, "No case matches request, feedback not attached"),
                Err(e) => {
                    self.metrics.inc_case_store_errors("add_feedback");
                    warn!(request_id = %request_id, error = %e, "Failed to forward feedback to case store");
                }
            }
        }

        true
    }

    fn append_to_log(&self, feedback: Feedback) {
        let mut log = self
            .feedback_log
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        log.entry(feedback.request_id.clone())
            .or_default()
            .push(feedback);
    }

    fn update_diagnosis_metrics(&self, feedback: &Feedback) {
        let Some(actual) = feedback.actual_root_cause.as_deref() else {
            return;
        };
        let Some(root_cause) = feedback.parsed_root_cause() else {
            warn!(actual_root_cause = %actual, "Unrecognized root cause in feedback, accuracy unchanged");
            return;
        };

        let correct = feedback.rating >= CORRECT_MIN_RATING && feedback.was_helpful;
        // Increment and recompute under the entry guard
        let mut entry = self.accuracy.entry(root_cause).or_default();
        entry.record(correct);
        info!(
            root_cause = %root_cause,
            accuracy = entry.accuracy(),
            total = entry.total_diagnoses(),
            "Updated diagnosis accuracy"
        );
    }

    fn read_log<T>(&self, f: impl FnOnce(&HashMap<String, Vec<Feedback>>) -> T) -> T {
        let log = self
            .feedback_log
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&log)
    }

    fn metric_table(&self) -> BTreeMap<RootCauseType, AccuracyMetric> {
        self.accuracy
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn get_accuracy_metrics(&self, root_cause: Option<RootCauseType>) -> AccuracyView {
        if let Some(root_cause) = root_cause {
            let metric = self
                .accuracy
                .get(&root_cause)
                .map(|m| m.value().clone())
                .unwrap_or_default();
            return AccuracyView::Single(metric);
        }

        let table = self.metric_table();
        let (total, correct) = table.values().fold((0, 0), |(t, c), m| {
            (t + m.total_diagnoses(), c + m.correct_diagnoses())
        });
        AccuracyView::Summary {
            overall: ratio(correct, total),
            by_root_cause: table
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), v))
                .collect(),
        }
    }

    pub fn suggest_improvements(&self) -> Vec<ImprovementSuggestion> {
        let mut suggestions: Vec<ImprovementSuggestion> = self
            .metric_table()
            .into_iter()
            .filter(|(_, m)| {
                m.total_diagnoses() >= LOW_ACCURACY_MIN_DIAGNOSES
                    && m.accuracy() < LOW_ACCURACY_THRESHOLD
            })
            .map(|(root_cause, m)| ImprovementSuggestion::LowAccuracy {
                root_cause,
                current_accuracy: m.accuracy(),
                total_cases: m.total_diagnoses(),
                suggestion: format!("Consider improving detection patterns for {}", root_cause),
            })
            .collect();

        let misdiagnosed = self.read_log(|log| {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for feedback in log.values().flatten() {
                if let (Some(actual), false) = (&feedback.actual_root_cause, feedback.was_helpful) {
                    *counts.entry(actual.clone()).or_default() += 1;
                }
            }
            counts
        });
        suggestions.extend(
            misdiagnosed
                .into_iter()
                .filter(|(_, count)| *count >= MISDIAGNOSIS_MIN_OCCURRENCES)
                .map(|(pattern, _)| ImprovementSuggestion::CommonMisdiagnosis {
                    pattern,
                    suggestion: "Review and refine detection rules for this pattern".to_string(),
                }),
        );

        info!(count = suggestions.len(), "Generated improvement suggestions");
        suggestions
    }

    /// Feedback summary over the last `window` days, e.g. "7d"
    pub fn analyze_trends(&self, window: &str) -> Result<TrendReport, LearningError> {
        let days = parse_window_days(window)?;
        // Windows reaching past the representable range cover all feedback
        let cutoff = Duration::try_days(days)
            .and_then(|span| Utc::now().checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let (total, helpful, rating_sum) = self.read_log(|log| {
            log.values()
                .flatten()
                .filter(|f| f.timestamp >= cutoff)
                .fold((0usize, 0usize, 0u64), |(t, h, r), f| {
                    (t + 1, h + usize::from(f.was_helpful), r + u64::from(f.rating))
                })
        });

        if total == 0 {
            return Ok(TrendReport::NoData {
                message: "No recent feedback data".to_string(),
            });
        }

        let average_rating = rating_sum as f64 / total as f64;
        Ok(TrendReport::Summary {
            time_window: window.to_string(),
            total_feedback: total,
            helpful_rate: helpful as f64 / total as f64,
            average_rating,
            trend: if average_rating >= IMPROVING_MIN_AVERAGE {
                TrendDirection::Improving
            } else {
                TrendDirection::NeedsAttention
            },
        })
    }

    /// Types with enough diagnoses, best accuracy first (ties by volume)
    pub fn get_top_performing_patterns(&self, limit: usize) -> Vec<TopPattern> {
        let mut patterns: Vec<TopPattern> = self
            .metric_table()
            .into_iter()
            .filter(|(_, m)| m.total_diagnoses() >= TOP_PATTERN_MIN_DIAGNOSES)
            .map(|(root_cause, m)| TopPattern {
                root_cause,
                accuracy: m.accuracy(),
                total_diagnoses: m.total_diagnoses(),
                correct_diagnoses: m.correct_diagnoses(),
            })
            .collect();

        patterns.sort_by(|a, b| {
            b.accuracy
                .total_cmp(&a.accuracy)
                .then(b.total_diagnoses.cmp(&a.total_diagnoses))
        });
        patterns.truncate(limit);
        patterns
    }

    /// Zero one type, or every type and the feedback log
    pub fn reset_metrics(&self, root_cause: Option<RootCauseType>) {
        match root_cause {
            Some(root_cause) => {
                self.accuracy.insert(root_cause, AccuracyMetric::new());
                info!(root_cause = %root_cause, "Metrics reset");
            }
            None => {
                for root_cause in RootCauseType::ALL {
                    self.accuracy.insert(root_cause, AccuracyMetric::new());
                }
                self.feedback_log
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .clear();
                info!("All metrics reset");
            }
        }
    }

    pub fn export_learning_data(&self) -> LearningSnapshot {
        let (total_feedback, feedback_by_type) = self.read_log(|log| {
            let mut by_type: BTreeMap<String, usize> = FeedbackType::ALL
                .iter()
                .map(|t| (t.as_str().to_string(), 0))
                .collect();
            let mut total = 0;
            for feedback in log.values().flatten() {
                total += 1;
                *by_type
                    .entry(feedback.feedback_type.as_str().to_string())
                    .or_default() += 1;
            }
            (total, by_type)
        });

        LearningSnapshot {
            accuracy_metrics: self
                .metric_table()
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), v))
                .collect(),
            total_feedback,
            feedback_by_type,
            export_time: Utc::now(),
        }
    }

    /// Overlay supplied metrics. False when the payload carries none.
    pub fn import_learning_data(&self, data: LearningImport) -> bool {
        let Some(metrics) = data.accuracy_metrics else {
            warn!("Learning import carried no accuracy metrics");
            return false;
        };

        let mut imported = 0;
        for (key, metric) in metrics {
            match key.parse::<RootCauseType>() {
                Ok(root_cause) => {
                    self.accuracy.insert(root_cause, metric);
                    imported += 1;
                }
                Err(_) => warn!(root_cause = %key, "Skipping unknown root cause in learning import"),
            }
        }
        info!(imported = imported, "Learning data imported");
        true
    }

    pub fn total_feedback(&self) -> usize {
        self.read_log(|log| log.values().map(Vec::len).sum())
    }

    /// Feedback recorded for one request, in arrival order
    pub fn feedback_for(&self, request_id: &str) -> Vec<Feedback> {
        self.read_log(|log| log.get(request_id).cloned().unwrap_or_default())
    }
}

fn feedback_record(feedback: &Feedback) -> FeedbackRecord {
    FeedbackRecord {
        feedback_id: feedback.feedback_id.clone(),
        rating: feedback.rating,
        was_helpful: feedback.was_helpful,
        actual_root_cause: feedback.actual_root_cause.clone(),
        actual_solution: feedback.actual_solution.clone(),
        comments: feedback.comments.clone(),
        timestamp: feedback.timestamp,
    }
}

fn parse_window_days(window: &str) -> Result<i64, LearningError> {
    window
        .strip_suffix('d')
        .and_then(|days| days.parse::<u32>().ok())
        .map(i64::from)
        .ok_or_else(|| LearningError::InvalidWindow(window.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{CaseStore, InMemoryCaseStore};
    use crate::models::CaseStudy;

    fn feedback(
        request_id: &str,
        feedback_type: FeedbackType,
        rating: u8,
        was_helpful: bool,
        actual_root_cause: Option<&str>,
    ) -> Feedback {
        Feedback {
            feedback_id: format!("fb-{}-{}", request_id, rating),
            request_id: request_id.to_string(),
            feedback_type,
            rating,
            was_helpful,
            actual_root_cause: actual_root_cause.map(str::to_string),
            actual_solution: None,
            comments: None,
            submitted_by: "sre".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn diagnosis(rating: u8, helpful: bool, actual: &str) -> Feedback {
        feedback("req-1", FeedbackType::DiagnosisAccuracy, rating, helpful, Some(actual))
    }

    fn single(view: AccuracyView) -> AccuracyMetric {
        match view {
            AccuracyView::Single(metric) => metric,
            other => panic!("expected single metric, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_diagnosis_feedback_updates_accuracy() {
        let learning = LearningSystem::new();
        assert!(learning.process_feedback(diagnosis(5, true, "OOMKiller")).await);
        assert!(learning.process_feedback(diagnosis(2, true, "OOMKiller")).await);
        assert!(learning.process_feedback(diagnosis(5, false, "OOMKiller")).await);

        let metric = single(learning.get_accuracy_metrics(Some(RootCauseType::OomKiller)));
        assert_eq!(metric.total_diagnoses(), 3);
        assert_eq!(metric.correct_diagnoses(), 1);
        assert!((metric.accuracy() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalid_rating_rejected() {
        let learning = LearningSystem::new();
        assert!(!learning.process_feedback(diagnosis(0, true, "OOMKiller")).await);
        assert!(!learning.process_feedback(diagnosis(6, true, "OOMKiller")).await);

        assert_eq!(learning.total_feedback(), 0);
        let metric = single(learning.get_accuracy_metrics(Some(RootCauseType::OomKiller)));
        assert_eq!(metric.total_diagnoses(), 0);
    }

    #[tokio::test]
    async fn test_unknown_root_cause_logged_only() {
        let learning = LearningSystem::new();
        assert!(learning.process_feedback(diagnosis(5, true, "CosmicRay")).await);
        assert_eq!(learning.total_feedback(), 1);

        match learning.get_accuracy_metrics(None) {
            AccuracyView::Summary { overall, by_root_cause } => {
                assert_eq!(overall, 0.0);
                assert_eq!(by_root_cause.len(), RootCauseType::ALL.len());
                assert!(by_root_cause.values().all(|m| m.total_diagnoses() == 0));
            }
            other => panic!("expected summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_feedback_types_do_not_touch_accuracy() {
        let learning = LearningSystem::new();
        learning
            .process_feedback(feedback("r", FeedbackType::RecommendationUsefulness, 5, true, Some("OOMKiller")))
            .await;
        learning
            .process_feedback(feedback("r", FeedbackType::PredictionAccuracy, 1, false, None))
            .await;

        let metric = single(learning.get_accuracy_metrics(Some(RootCauseType::OomKiller)));
        assert_eq!(metric.total_diagnoses(), 0);
        assert_eq!(learning.feedback_for("r").len(), 2);
    }

    #[tokio::test]
    async fn test_overall_accuracy() {
        let learning = LearningSystem::new();
        learning.process_feedback(diagnosis(5, true, "OOMKiller")).await;
        learning.process_feedback(diagnosis(5, true, "DiskPressure")).await;
        learning.process_feedback(diagnosis(1, false, "DiskPressure")).await;
        learning.process_feedback(diagnosis(1, false, "NetworkError")).await;

        match learning.get_accuracy_metrics(None) {
            AccuracyView::Summary { overall, .. } => assert!((overall - 0.5).abs() < 1e-9),
            other => panic!("expected summary, got {:?}", other),
        }
        // Reads are idempotent
        assert_eq!(learning.get_accuracy_metrics(None), learning.get_accuracy_metrics(None));
    }

    #[tokio::test]
    async fn test_suggestions() {
        let learning = LearningSystem::new();
        // 5 diagnoses at 40% accuracy
        for (rating, helpful) in [(5, true), (5, true), (1, false), (1, false), (1, false)] {
            learning.process_feedback(diagnosis(rating, helpful, "NetworkError")).await;
        }

        let suggestions = learning.suggest_improvements();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(
            suggestions[0],
            ImprovementSuggestion::LowAccuracy {
                root_cause: RootCauseType::NetworkError,
                current_accuracy: 0.4,
                total_cases: 5,
                suggestion: "Consider improving detection patterns for NetworkError".to_string(),
            }
        );
        assert_eq!(
            suggestions[1],
            ImprovementSuggestion::CommonMisdiagnosis {
                pattern: "NetworkError".to_string(),
                suggestion: "Review and refine detection rules for this pattern".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_four_diagnoses_not_low_accuracy() {
        let learning = LearningSystem::new();
        for _ in 0..4 {
            learning.process_feedback(diagnosis(5, true, "ImagePullError")).await;
        }
        assert!(learning.suggest_improvements().is_empty());
    }

    #[tokio::test]
    async fn test_trends() {
        let learning = LearningSystem::new();
        assert_eq!(
            learning.analyze_trends("7d").unwrap(),
            TrendReport::NoData {
                message: "No recent feedback data".to_string()
            }
        );

        learning.process_feedback(diagnosis(5, true, "OOMKiller")).await;
        learning.process_feedback(diagnosis(4, false, "OOMKiller")).await;

        let mut old = diagnosis(1, false, "OOMKiller");
        old.timestamp = Utc::now() - Duration::days(30);
        learning.process_feedback(old).await;

        match learning.analyze_trends("7d").unwrap() {
            TrendReport::Summary {
                time_window,
                total_feedback,
                helpful_rate,
                average_rating,
                trend,
            } => {
                assert_eq!(time_window, "7d");
                assert_eq!(total_feedback, 2);
                assert_eq!(helpful_rate, 0.5);
                assert_eq!(average_rating, 4.5);
                assert_eq!(trend, TrendDirection::Improving);
            }
            other => panic!("expected summary, got {:?}", other),
        }

        match learning.analyze_trends("90d").unwrap() {
            TrendReport::Summary { trend, total_feedback, .. } => {
                assert_eq!(total_feedback, 3);
                assert_eq!(trend, TrendDirection::NeedsAttention);
            }
            other => panic!("expected summary, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_window() {
        let learning = LearningSystem::new();
        for window in ["7", "d", "seven d", "-3d", "7h", ""] {
            assert!(matches!(
                learning.analyze_trends(window),
                Err(LearningError::InvalidWindow(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_oversized_window_covers_all_feedback() {
        let learning = LearningSystem::new();
        let mut old = diagnosis(5, true, "OOMKiller");
        old.timestamp = Utc::now() - Duration::days(3650);
        learning.process_feedback(old).await;

        for window in ["200000000d", "4294967295d"] {
            match learning.analyze_trends(window).unwrap() {
                TrendReport::Summary {
                    time_window,
                    total_feedback,
                    ..
                } => {
                    assert_eq!(time_window, window);
                    assert_eq!(total_feedback, 1);
                }
                other => panic!("expected summary, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_top_patterns() {
        let learning = LearningSystem::new();
        for _ in 0..3 {
            learning.process_feedback(diagnosis(5, true, "OOMKiller")).await;
        }
        for _ in 0..4 {
            learning.process_feedback(diagnosis(5, true, "DiskPressure")).await;
        }
        learning.process_feedback(diagnosis(5, true, "NetworkError")).await;
        learning.process_feedback(diagnosis(5, true, "NetworkError")).await;
        learning.process_feedback(diagnosis(1, false, "ConfigError")).await;
        learning.process_feedback(diagnosis(5, true, "ConfigError")).await;
        learning.process_feedback(diagnosis(5, true, "ConfigError")).await;

        let top = learning.get_top_performing_patterns(5);
        let order: Vec<RootCauseType> = top.iter().map(|p| p.root_cause).collect();
        assert_eq!(
            order,
            vec![RootCauseType::DiskPressure, RootCauseType::OomKiller, RootCauseType::ConfigError]
        );

        assert_eq!(learning.get_top_performing_patterns(1).len(), 1);
    }

    #[tokio::test]
    async fn test_reset() {
        let learning = LearningSystem::new();
        learning.process_feedback(diagnosis(5, true, "OOMKiller")).await;
        learning.process_feedback(diagnosis(5, true, "DiskPressure")).await;

        learning.reset_metrics(Some(RootCauseType::OomKiller));
        assert_eq!(single(learning.get_accuracy_metrics(Some(RootCauseType::OomKiller))).total_diagnoses(), 0);
        assert_eq!(single(learning.get_accuracy_metrics(Some(RootCauseType::DiskPressure))).total_diagnoses(), 1);
        assert_eq!(learning.total_feedback(), 2);

        learning.reset_metrics(None);
        assert_eq!(single(learning.get_accuracy_metrics(Some(RootCauseType::DiskPressure))).total_diagnoses(), 0);
        assert_eq!(learning.total_feedback(), 0);
    }

    #[tokio::test]
    async fn test_export_and_import() {
        let source = LearningSystem::new();
        source.process_feedback(diagnosis(5, true, "OOMKiller")).await;
        source
            .process_feedback(feedback("r2", FeedbackType::PredictionAccuracy, 3, true, None))
            .await;

        let snapshot = source.export_learning_data();
        assert_eq!(snapshot.total_feedback, 2);
        assert_eq!(snapshot.feedback_by_type["diagnosis_accuracy"], 1);
        assert_eq!(snapshot.feedback_by_type["recommendation_usefulness"], 0);
        assert_eq!(snapshot.accuracy_metrics.len(), RootCauseType::ALL.len());

        // Round trip through JSON as the API does
        let json = serde_json::to_string(&snapshot).unwrap();
        let payload: LearningImport = serde_json::from_str(&json).unwrap();

        let target = LearningSystem::new();
        target.process_feedback(diagnosis(1, false, "DiskPressure")).await;
        assert!(target.import_learning_data(payload));

        let oom = single(target.get_accuracy_metrics(Some(RootCauseType::OomKiller)));
        assert_eq!(oom.total_diagnoses(), 1);
        assert_eq!(oom.correct_diagnoses(), 1);
        // Supplied keys overwrite, including the zeroed DiskPressure entry
        let disk = single(target.get_accuracy_metrics(Some(RootCauseType::DiskPressure)));
        assert_eq!(disk.total_diagnoses(), 0);
    }

    #[test]
    fn test_import_overlays_only_supplied_keys() {
        let learning = LearningSystem::new();
        let payload: LearningImport = serde_json::from_value(serde_json::json!({
            "accuracy_metrics": {
                "NetworkError": {"total_diagnoses": 10, "correct_diagnoses": 7},
                "Gremlins": {"total_diagnoses": 1, "correct_diagnoses": 1}
            }
        }))
        .unwrap();
        assert!(learning.import_learning_data(payload));

        let network = single(learning.get_accuracy_metrics(Some(RootCauseType::NetworkError)));
        assert_eq!(network.total_diagnoses(), 10);
        assert!((network.accuracy() - 0.7).abs() < 1e-9);

        assert!(!learning.import_learning_data(LearningImport::default()));
    }

    #[tokio::test]
    async fn test_feedback_forwarded_to_case_store() {
        let store = Arc::new(InMemoryCaseStore::new());
        store
            .add_case_study(CaseStudy {
                id: "req-1".to_string(),
                title: "OOM".to_string(),
                description: "api pods OOMKilled".to_string(),
                symptoms: vec!["OOMKilled".to_string()],
                root_cause: "OOMKiller".to_string(),
                solution: "Raised limit".to_string(),
                outcome: "resolved".to_string(),
                cluster_id: "prod".to_string(),
                timestamp: Utc::now(),
                metadata: serde_json::Map::new(),
            })
            .await
            .unwrap();

        let learning = LearningSystem::new().with_case_store(store.clone());
        assert!(learning.process_feedback(diagnosis(5, true, "OOMKiller")).await);
        // No case for this request: still accepted
        assert!(learning
            .process_feedback(feedback("req-9", FeedbackType::DiagnosisAccuracy, 5, true, Some("OOMKiller")))
            .await);

        let cases = store.snapshot().await;
        let attached = cases[0].metadata["feedback"].as_array().unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0]["actual_root_cause"], "OOMKiller");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_feedback_loses_no_updates() {
        let learning = Arc::new(LearningSystem::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let learning = Arc::clone(&learning);
            handles.push(tokio::spawn(async move {
                for j in 0..50 {
                    let correct = (i + j) % 2 == 0;
                    let fb = feedback(
                        &format!("req-{}-{}", i, j),
                        FeedbackType::DiagnosisAccuracy,
                        if correct { 5 } else { 2 },
                        correct,
                        Some("OOMKiller"),
                    );
                    learning.process_feedback(fb).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let metric = single(learning.get_accuracy_metrics(Some(RootCauseType::OomKiller)));
        assert_eq!(metric.total_diagnoses(), 400);
        assert_eq!(metric.correct_diagnoses(), 200);
        assert!((metric.accuracy() - 0.5).abs() < 1e-9);
        assert_eq!(learning.total_feedback(), 400);
    }
}
