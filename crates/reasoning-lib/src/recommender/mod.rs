//! Remediation recommendations for a diagnosed root cause

pub mod rules;

pub use rules::{rules_for, RecommendationRule, RuleCondition};

use crate::models::{Evidence, Recommendation, RootCauseVerdict};
use std::cmp::Ordering;
use tracing::debug;

pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;

pub struct RecommendationEngine {
    max_recommendations: usize,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self {
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }

    pub fn with_max_recommendations(mut self, max: usize) -> Self {
        self.max_recommendations = max;
        self
    }

    /// Applicable rules for the verdict's type, ranked by
    /// confidence x risk weight. Empty when the verdict names no type or the
    /// type has no rules.
    pub fn recommend(&self, verdict: &RootCauseVerdict, evidence: &Evidence) -> Vec<Recommendation> {
        let Some(root_cause) = verdict.root_cause else {
            return Vec::new();
        };

        let mut recommendations: Vec<Recommendation> = rules_for(root_cause)
            .iter()
            .filter(|rule| rule.applies(evidence))
            .map(|rule| build(rule, verdict.confidence))
            .collect();

        // Stable: equal scores keep table order
        recommendations.sort_by(|a, b| {
            b.ranking_score()
                .partial_cmp(&a.ranking_score())
                .unwrap_or(Ordering::Equal)
        });
        recommendations.truncate(self.max_recommendations);

        debug!(
            root_cause = %root_cause,
            count = recommendations.len(),
            "Generated recommendations"
        );
        recommendations
    }
}

fn build(rule: &RecommendationRule, verdict_confidence: f64) -> Recommendation {
    Recommendation {
        action: rule.action.to_string(),
        description: rule.description.to_string(),
        confidence: rule.confidence * verdict_confidence,
        risk: rule.risk,
        impact: rule.impact.to_string(),
        steps: rule.steps.iter().map(|s| s.to_string()).collect(),
        rollback_steps: rule
            .rollback_steps
            .map(|steps| steps.iter().map(|s| s.to_string()).collect()),
        estimated_duration: rule.estimated_duration.map(str::to_string),
        metadata: rule
            .metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricsSnapshot, RiskLevel, RootCauseType};

    fn verdict(root_cause: RootCauseType, confidence: f64) -> RootCauseVerdict {
        RootCauseVerdict {
            root_cause: Some(root_cause),
            description: String::new(),
            confidence,
            evidence: Vec::new(),
        }
    }

    fn actions(recommendations: &[Recommendation]) -> Vec<&str> {
        recommendations.iter().map(|r| r.action.as_str()).collect()
    }

    #[test]
    fn test_oom_recommendations() {
        let engine = RecommendationEngine::new();
        let recs = engine.recommend(&verdict(RootCauseType::OomKiller, 0.95), &Evidence::default());

        assert_eq!(
            actions(&recs),
            vec!["increase_memory_limit", "add_memory_request", "optimize_application"]
        );
        assert!((recs[0].confidence - 0.9025).abs() < 1e-9);
        assert_eq!(recs[0].risk, RiskLevel::Low);
        assert_eq!(recs[0].metadata.get("suggested_increase").map(String::as_str), Some("50%"));
        assert_eq!(recs[0].rollback_steps.as_ref().map(Vec::len), Some(2));
        assert!(recs[1].rollback_steps.is_none());
    }

    #[test]
    fn test_no_rules_for_dependency_error() {
        let engine = RecommendationEngine::new();
        let evidence = Evidence::default().with_event("OOMKilled", "");
        assert!(engine
            .recommend(&verdict(RootCauseType::DependencyError, 0.9), &evidence)
            .is_empty());
        assert!(engine
            .recommend(&verdict(RootCauseType::Unknown, 0.9), &evidence)
            .is_empty());
    }

    #[test]
    fn test_unidentified_verdict() {
        let engine = RecommendationEngine::new();
        let recs = engine.recommend(&RootCauseVerdict::insufficient_data(), &Evidence::default());
        assert!(recs.is_empty());
    }

    #[test]
    fn test_risk_weight_reorders() {
        // fix_configuration 0.85 medium scores 0.765, below add_missing_env_vars 0.80 low
        let engine = RecommendationEngine::new();
        let recs = engine.recommend(&verdict(RootCauseType::ConfigError, 1.0), &Evidence::default());
        assert_eq!(actions(&recs), vec!["add_missing_env_vars", "fix_configuration"]);
    }

    #[test]
    fn test_conditional_rule_included_when_event_matches() {
        let engine = RecommendationEngine::new();
        let evidence = Evidence::default().with_event("CrashLoopBackOff", "");
        let recs = engine.recommend(&verdict(RootCauseType::ConfigError, 0.85), &evidence);
        assert_eq!(
            actions(&recs),
            vec!["add_missing_env_vars", "fix_configuration", "inspect_crash_loop_logs"]
        );
    }

    #[test]
    fn test_metrics_condition() {
        let engine = RecommendationEngine::new();
        let cpu = verdict(RootCauseType::CpuThrottling, 0.85);

        let without = engine.recommend(&cpu, &Evidence::default());
        assert_eq!(actions(&without), vec!["increase_cpu_limit", "optimize_workload"]);

        let with = engine.recommend(
            &cpu,
            &Evidence::default().with_metrics(MetricsSnapshot::default().with_cpu(60.0, 70.0)),
        );
        assert_eq!(with.len(), 3);
        assert_eq!(with[2].action, "configure_horizontal_autoscaling");
    }

    #[test]
    fn test_limit_and_ordering_invariants() {
        let engine = RecommendationEngine::new().with_max_recommendations(2);
        for t in RootCauseType::ALL {
            let evidence = Evidence::default()
                .with_event("CrashLoopBackOff", "")
                .with_metrics(MetricsSnapshot::default().with_memory(99.0));
            let recs = engine.recommend(&verdict(t, 0.8), &evidence);
            assert!(recs.len() <= 2);
            for pair in recs.windows(2) {
                assert!(pair[0].ranking_score() >= pair[1].ranking_score());
            }
        }
    }
}
