//! Cross-detector agreement

use super::Candidate;
use crate::models::RootCauseType;
use std::collections::HashSet;

pub const CORRELATION_BOOST: f64 = 1.1;
pub const CORRELATION_CONFIDENCE_CAP: f64 = 0.98;
pub const MAX_CORRELATED_EVIDENCE: usize = 5;

struct Group {
    root_cause: RootCauseType,
    count: usize,
    total_confidence: f64,
    evidence: Vec<String>,
}

/// Boosted candidate for the most frequently proposed type, if at least two
/// candidates agree on it.
///
/// Groups keep first-encountered order so count ties go to the earliest type.
pub fn correlate(candidates: &[Candidate]) -> Option<Candidate> {
    let mut groups: Vec<Group> = Vec::new();

    for candidate in candidates {
        match groups.iter_mut().find(|g| g.root_cause == candidate.root_cause) {
            Some(group) => {
                group.count += 1;
                group.total_confidence += candidate.confidence;
                group.evidence.extend(candidate.evidence.iter().cloned());
            }
            None => groups.push(Group {
                root_cause: candidate.root_cause,
                count: 1,
                total_confidence: candidate.confidence,
                evidence: candidate.evidence.clone(),
            }),
        }
    }

    let mut best: Option<&Group> = None;
    for group in &groups {
        if best.map_or(true, |b| group.count > b.count) {
            best = Some(group);
        }
    }
    let group = best.filter(|g| g.count >= 2)?;

    let mean = group.total_confidence / group.count as f64;
    let mut seen = HashSet::new();
    let evidence: Vec<String> = group
        .evidence
        .iter()
        .filter(|e| seen.insert(e.as_str()))
        .take(MAX_CORRELATED_EVIDENCE)
        .cloned()
        .collect();

    Some(Candidate {
        root_cause: group.root_cause,
        description: format!(
            "{} (confirmed by {} analyses)",
            group.root_cause, group.count
        ),
        confidence: (mean * CORRELATION_BOOST).min(CORRELATION_CONFIDENCE_CAP),
        evidence,
    })
}
