//! Log text detector
//!
//! Scores each root-cause type by weighted regex and keyword occurrences and
//! turns the best score into a confidence.

use super::rules::{describe, LogKeywordRule, LOG_KEYWORD_RULES, LOG_PATTERN_RULES};
use super::{Candidate, Detector};
use crate::models::{Evidence, RootCauseType};
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

/// Score that maps to full confidence before capping
pub const DEFAULT_CONFIDENCE_DIVISOR: f64 = 10.0;
pub const DEFAULT_CONFIDENCE_CAP: f64 = 0.95;
/// Maximum evidence lines kept from a log scan
pub const MAX_LOG_EVIDENCE: usize = 5;

struct CompiledPattern {
    regex: Regex,
    root_cause: RootCauseType,
    description: &'static str,
    weight: f64,
}

pub struct LogDetector {
    patterns: Vec<CompiledPattern>,
    keywords: &'static [LogKeywordRule],
    /// Score divided by this gives the raw confidence
    pub confidence_divisor: f64,
    /// Upper bound on log-derived confidence
    pub confidence_cap: f64,
}

impl LogDetector {
    pub fn new() -> Result<Self> {
        let patterns = LOG_PATTERN_RULES
            .iter()
            .map(|rule| {
                let regex = RegexBuilder::new(rule.pattern)
                    .case_insensitive(true)
                    .multi_line(true)
                    .build()
                    .with_context(|| format!("Invalid log pattern: {}", rule.pattern))?;
                Ok(CompiledPattern {
                    regex,
                    root_cause: rule.root_cause,
                    description: rule.description,
                    weight: rule.weight,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            keywords: LOG_KEYWORD_RULES,
            confidence_divisor: DEFAULT_CONFIDENCE_DIVISOR,
            confidence_cap: DEFAULT_CONFIDENCE_CAP,
        })
    }

    pub fn with_confidence_scale(mut self, divisor: f64, cap: f64) -> Self {
        self.confidence_divisor = divisor;
        self.confidence_cap = cap;
        self
    }

    /// Weighted score per type plus evidence lines in evaluation order
    fn score(&self, logs: &str) -> (BTreeMap<RootCauseType, f64>, Vec<String>) {
        let mut scores: BTreeMap<RootCauseType, f64> = BTreeMap::new();
        let mut found = Vec::new();

        for pattern in &self.patterns {
            let count = pattern.regex.find_iter(logs).count();
            if count > 0 {
                *scores.entry(pattern.root_cause).or_default() += count as f64 * pattern.weight;
                found.push(format!(
                    "Found pattern: {} ({} occurrences)",
                    pattern.description, count
                ));
            }
        }

        let lowered = logs.to_lowercase();
        for rule in self.keywords {
            let count = lowered.matches(rule.keyword).count();
            if count > 0 {
                *scores.entry(rule.root_cause).or_default() += count as f64 * rule.weight;
                found.push(format!("Found keyword: '{}' ({} times)", rule.keyword, count));
            }
        }

        (scores, found)
    }
}

impl Detector for LogDetector {
    fn name(&self) -> &'static str {
        "logs"
    }

    fn evaluate(&self, evidence: &Evidence) -> Result<Option<Candidate>> {
        let logs = match evidence.logs.as_deref() {
            Some(logs) if !logs.is_empty() => logs,
            _ => return Ok(None),
        };
        if self.confidence_divisor <= 0.0 {
            anyhow::bail!("confidence divisor must be positive");
        }

        let (scores, mut found) = self.score(logs);

        // BTreeMap iterates in type declaration order, so strict comparison
        // keeps the earliest type on ties.
        let mut best: Option<(RootCauseType, f64)> = None;
        for (&root_cause, &score) in &scores {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((root_cause, score));
            }
        }

        let Some((root_cause, score)) = best.filter(|(_, score)| *score > 0.0) else {
            return Ok(None);
        };

        found.truncate(MAX_LOG_EVIDENCE);
        Ok(Some(Candidate {
            root_cause,
            description: describe(root_cause).to_string(),
            confidence: (score / self.confidence_divisor).min(self.confidence_cap),
            evidence: found,
        }))
    }
}
