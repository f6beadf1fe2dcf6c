//! Resource metrics detector

use super::rules::{MetricThresholdRule, METRIC_THRESHOLD_RULES};
use super::{Candidate, Detector};
use crate::models::Evidence;
use anyhow::Result;

/// First threshold rule whose reading is reached wins
pub struct MetricsDetector {
    rules: &'static [MetricThresholdRule],
}

impl MetricsDetector {
    pub fn new() -> Self {
        Self {
            rules: METRIC_THRESHOLD_RULES,
        }
    }
}

impl Default for MetricsDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for MetricsDetector {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn evaluate(&self, evidence: &Evidence) -> Result<Option<Candidate>> {
        let Some(snapshot) = evidence.metrics.as_ref() else {
            return Ok(None);
        };

        for rule in self.rules {
            let Some(value) = rule.metric.read(snapshot) else {
                continue;
            };
            if value >= rule.threshold {
                return Ok(Some(Candidate {
                    root_cause: rule.root_cause,
                    description: rule.description.to_string(),
                    confidence: rule.confidence,
                    evidence: vec![format!("{} at {}%", rule.label, value)],
                }));
            }
        }

        Ok(None)
    }
}
