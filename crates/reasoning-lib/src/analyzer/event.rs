//! Event-reason detector

use super::rules::{describe, EventReasonRule, EVENT_REASON_RULES};
use super::{Candidate, Detector};
use crate::models::Evidence;
use anyhow::Result;

/// Maps well-known event reasons directly to a root cause
pub struct EventDetector {
    rules: &'static [EventReasonRule],
}

impl EventDetector {
    pub fn new() -> Self {
        Self {
            rules: EVENT_REASON_RULES,
        }
    }
}

impl Default for EventDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for EventDetector {
    fn name(&self) -> &'static str {
        "event"
    }

    fn evaluate(&self, evidence: &Evidence) -> Result<Option<Candidate>> {
        let Some(event) = evidence.event.as_ref() else {
            return Ok(None);
        };
        let Some(rule) = self.rules.iter().find(|r| r.reason == event.reason) else {
            return Ok(None);
        };

        let mut found = vec![format!("Event reason: {}", event.reason)];
        if !event.message.is_empty() {
            found.push(format!("Event message: {}", event.message));
        }

        Ok(Some(Candidate {
            root_cause: rule.root_cause,
            description: describe(rule.root_cause).to_string(),
            confidence: rule.confidence,
            evidence: found,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RootCauseType;

    fn evaluate(reason: &str, message: &str) -> Option<Candidate> {
        EventDetector::new()
            .evaluate(&Evidence::default().with_event(reason, message))
            .unwrap()
    }

    #[test]
    fn test_every_mapped_reason() {
        for rule in EVENT_REASON_RULES {
            let candidate = evaluate(rule.reason, "").unwrap();
            assert_eq!(candidate.root_cause, rule.root_cause);
            assert_eq!(candidate.confidence, rule.confidence);
            assert_eq!(candidate.evidence, vec![format!("Event reason: {}", rule.reason)]);
        }
    }

    #[test]
    fn test_crash_loop_defaults_to_config_error() {
        let candidate = evaluate("CrashLoopBackOff", "back-off restarting failed container").unwrap();
        assert_eq!(candidate.root_cause, RootCauseType::ConfigError);
        assert_eq!(candidate.confidence, 0.85);
        assert_eq!(candidate.evidence.len(), 2);
        assert_eq!(
            candidate.description,
            "Configuration error or missing environment variable"
        );
    }

    #[test]
    fn test_reason_match_is_exact() {
        assert!(evaluate("oomkilled", "").is_none());
        assert!(evaluate("BackOff", "").is_none());
        assert!(evaluate("", "").is_none());
    }

    #[test]
    fn test_no_event() {
        let result = EventDetector::new().evaluate(&Evidence::default()).unwrap();
        assert!(result.is_none());
    }
}
