//! Root-cause analysis
//!
//! Independent detectors each look at one kind of evidence and may propose a
//! candidate. When two or more candidates exist, a correlation pass may add a
//! boosted candidate for the type most of them agree on. The verdict is the
//! candidate with the strictly highest confidence.

mod correlation;
mod event;
mod logs;
mod metrics;
pub mod rules;

pub use correlation::{correlate, CORRELATION_CONFIDENCE_CAP, MAX_CORRELATED_EVIDENCE};
pub use event::EventDetector;
pub use logs::LogDetector;
pub use metrics::MetricsDetector;

use crate::models::{Evidence, RootCauseType, RootCauseVerdict};
use crate::observability::ReasoningMetrics;
use anyhow::Result;
use tracing::{debug, info, warn};

/// A detector's proposal
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub root_cause: RootCauseType,
    pub description: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

impl From<Candidate> for RootCauseVerdict {
    fn from(candidate: Candidate) -> Self {
        Self {
            root_cause: Some(candidate.root_cause),
            description: candidate.description,
            confidence: candidate.confidence,
            evidence: candidate.evidence,
        }
    }
}

/// Trait for evidence detectors
pub trait Detector: Send + Sync {
    /// Short name used in logs and metric labels
    fn name(&self) -> &'static str;

    /// Inspect evidence and optionally propose a candidate.
    ///
    /// Missing evidence is `Ok(None)`. An `Err` is an internal defect; the
    /// analyzer logs it and carries on without this detector.
    fn evaluate(&self, evidence: &Evidence) -> Result<Option<Candidate>>;
}

/// Runs all detectors over the evidence and picks a verdict
pub struct RootCauseAnalyzer {
    detectors: Vec<Box<dyn Detector>>,
    metrics: ReasoningMetrics,
}

impl RootCauseAnalyzer {
    /// Event, log and metrics detectors in that order
    pub fn new() -> Result<Self> {
        Ok(Self::with_detectors(vec![
            Box::new(EventDetector::new()),
            Box::new(LogDetector::new()?),
            Box::new(MetricsDetector::new()),
        ]))
    }

    pub fn with_detectors(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self {
            detectors,
            metrics: ReasoningMetrics::new(),
        }
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn analyze(&self, evidence: &Evidence) -> RootCauseVerdict {
        let mut candidates: Vec<Candidate> = Vec::with_capacity(self.detectors.len() + 1);

        for detector in &self.detectors {
            match detector.evaluate(evidence) {
                Ok(Some(candidate)) => {
                    debug!(
                        detector = detector.name(),
                        root_cause = %candidate.root_cause,
                        confidence = candidate.confidence,
                        "Detector proposed candidate"
                    );
                    candidates.push(candidate);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(detector = detector.name(), error = %e, "Detector failed, skipping");
                    self.metrics.inc_detector_errors(detector.name());
                }
            }
        }

        if candidates.len() > 1 {
            if let Some(correlated) = correlate(&candidates) {
                candidates.push(correlated);
            }
        }

        match select_best(candidates) {
            Some(best) => {
                info!(
                    root_cause = %best.root_cause,
                    confidence = best.confidence,
                    "Root cause identified"
                );
                best.into()
            }
            None => {
                debug!("No root cause identified");
                RootCauseVerdict::insufficient_data()
            }
        }
    }
}

/// Highest confidence wins; on ties the earliest candidate is kept.
fn select_best(candidates: Vec<Candidate>) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.confidence <= current.confidence => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricsSnapshot;

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn evaluate(&self, _evidence: &Evidence) -> Result<Option<Candidate>> {
            anyhow::bail!("broken rule table")
        }
    }

    struct FixedDetector(Candidate);

    impl Detector for FixedDetector {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn evaluate(&self, _evidence: &Evidence) -> Result<Option<Candidate>> {
            Ok(Some(self.0.clone()))
        }
    }

    fn candidate(root_cause: RootCauseType, confidence: f64, label: &str) -> Candidate {
        Candidate {
            root_cause,
            description: label.to_string(),
            confidence,
            evidence: vec![label.to_string()],
        }
    }

    #[test]
    fn test_oom_event_verdict() {
        let analyzer = RootCauseAnalyzer::new().unwrap();
        let evidence = Evidence::default().with_event("OOMKilled", "Container exceeded memory limit");

        let verdict = analyzer.analyze(&evidence);

        assert_eq!(verdict.root_cause, Some(RootCauseType::OomKiller));
        assert_eq!(verdict.confidence, 0.95);
        assert_eq!(
            verdict.evidence,
            vec![
                "Event reason: OOMKilled".to_string(),
                "Event message: Container exceeded memory limit".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_evidence_is_insufficient() {
        let analyzer = RootCauseAnalyzer::new().unwrap();
        let verdict = analyzer.analyze(&Evidence::default());

        assert_eq!(verdict.root_cause, None);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.evidence, vec!["Insufficient data for analysis".to_string()]);
    }

    #[test]
    fn test_log_only_verdict() {
        let analyzer = RootCauseAnalyzer::new().unwrap();
        let verdict = analyzer.analyze(&Evidence::default().with_logs("out of memory"));

        assert_eq!(verdict.root_cause, Some(RootCauseType::OomKiller));
        assert!((verdict.confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_event_and_metrics_correlate() {
        let analyzer = RootCauseAnalyzer::new().unwrap();
        let evidence = Evidence::default()
            .with_event("OOMKilled", "")
            .with_metrics(MetricsSnapshot::default().with_memory(97.0));

        let verdict = analyzer.analyze(&evidence);

        assert_eq!(verdict.root_cause, Some(RootCauseType::OomKiller));
        assert_eq!(verdict.confidence, 0.98);
        assert_eq!(verdict.description, "OOMKiller (confirmed by 2 analyses)");
        assert!(verdict.evidence.contains(&"Event reason: OOMKilled".to_string()));
        assert!(verdict.evidence.contains(&"Memory usage at 97%".to_string()));
    }

    #[test]
    fn test_disagreeing_detectors_pick_highest() {
        let analyzer = RootCauseAnalyzer::new().unwrap();
        let evidence = Evidence::default()
            .with_event("ImagePullBackOff", "")
            .with_metrics(MetricsSnapshot::default().with_memory(99.0));

        let verdict = analyzer.analyze(&evidence);

        assert_eq!(verdict.root_cause, Some(RootCauseType::OomKiller));
        assert_eq!(verdict.confidence, 0.9);
    }

    #[test]
    fn test_failing_detector_is_skipped() {
        let analyzer = RootCauseAnalyzer::with_detectors(vec![
            Box::new(FailingDetector),
            Box::new(EventDetector::new()),
        ]);
        let verdict = analyzer.analyze(&Evidence::default().with_event("FailedMount", ""));

        assert_eq!(verdict.root_cause, Some(RootCauseType::VolumeError));
        assert_eq!(verdict.confidence, 0.85);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let analyzer = RootCauseAnalyzer::with_detectors(vec![
            Box::new(FixedDetector(candidate(RootCauseType::NetworkError, 0.8, "first"))),
            Box::new(FixedDetector(candidate(RootCauseType::DiskPressure, 0.8, "second"))),
        ]);
        let verdict = analyzer.analyze(&Evidence::default());

        // No agreement, so no correlated candidate either
        assert_eq!(verdict.root_cause, Some(RootCauseType::NetworkError));
        assert_eq!(verdict.description, "first");
    }

    #[test]
    fn test_confidence_in_unit_interval() {
        let analyzer = RootCauseAnalyzer::new().unwrap();
        let logs = "OOM oom OOM killed sigkill exit code 137 out of memory\n".repeat(50);
        let verdict = analyzer.analyze(&Evidence::default().with_logs(logs));

        assert!(verdict.confidence >= 0.0 && verdict.confidence <= 1.0);
        assert!(verdict.evidence.len() <= 5);
    }
}
