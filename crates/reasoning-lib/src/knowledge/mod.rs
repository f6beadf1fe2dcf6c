//! Case store: historical incidents used for similarity lookup and
//! feedback attachment
//!
//! Two variants implement [`CaseStore`]:
//! - [`FileCaseStore`]: JSON-persisted case table
//! - [`InMemoryCaseStore`]: same contract, no persistence
//!
//! [`open_case_store`] picks one at startup. Callers never branch on which.

mod file;
mod memory;

pub use file::FileCaseStore;
pub use memory::InMemoryCaseStore;

use crate::models::{CaseStudy, Evidence, RootCauseType, SimilarCase};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Base score every candidate case starts from
pub const BASE_SIMILARITY: f64 = 0.3;
/// Added when a symptom and the event reason contain one another
pub const EVENT_MATCH_BONUS: f64 = 0.3;
/// Added per symptom found in the logs
pub const LOG_MATCH_BONUS: f64 = 0.1;
pub const MAX_LOG_MATCH_BONUS: f64 = 0.4;

#[derive(Debug, Error)]
pub enum CaseStoreError {
    #[error("failed to access case file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode case data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("case store unavailable: {0}")]
    Unavailable(String),
}

/// Feedback forwarded to a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_id: String,
    pub rating: u8,
    pub was_helpful: bool,
    pub actual_root_cause: Option<String>,
    pub actual_solution: Option<String>,
    pub comments: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStoreStats {
    pub total_cases: usize,
    /// Distinct root cause strings across stored cases
    pub root_cause_types: usize,
    pub storage: String,
}

#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Insert a case, replacing any case with the same id
    async fn add_case_study(&self, case: CaseStudy) -> Result<(), CaseStoreError>;

    /// Cases ranked by similarity, highest first
    async fn find_similar_cases(
        &self,
        evidence: &Evidence,
        root_cause: Option<RootCauseType>,
        limit: usize,
    ) -> Result<Vec<SimilarCase>, CaseStoreError>;

    /// Attach feedback to a case. `false` when the case is unknown.
    async fn add_feedback(
        &self,
        case_id: &str,
        feedback: &FeedbackRecord,
    ) -> Result<bool, CaseStoreError>;

    async fn statistics(&self) -> Result<CaseStoreStats, CaseStoreError>;

    fn backend(&self) -> &'static str;
}

/// Similarity of a stored case to the given evidence, in [0.3, 1.0]
pub fn similarity(case: &CaseStudy, evidence: &Evidence) -> f64 {
    let mut score = BASE_SIMILARITY;

    if let Some(reason) = evidence.event_reason().filter(|r| !r.is_empty()) {
        let reason = reason.to_lowercase();
        let matched = case.symptoms.iter().any(|symptom| {
            let symptom = symptom.to_lowercase();
            symptom.contains(&reason) || reason.contains(&symptom)
        });
        if matched {
            score += EVENT_MATCH_BONUS;
        }
    }

    if let Some(logs) = evidence.logs.as_deref() {
        let logs = logs.to_lowercase();
        let found = case
            .symptoms
            .iter()
            .filter(|symptom| !symptom.is_empty() && logs.contains(&symptom.to_lowercase()))
            .count();
        score += (found as f64 * LOG_MATCH_BONUS).min(MAX_LOG_MATCH_BONUS);
    }

    score.min(1.0)
}

/// Score, filter and rank cases
pub(crate) fn rank_cases<'a>(
    cases: impl Iterator<Item = &'a CaseStudy>,
    evidence: &Evidence,
    root_cause: Option<RootCauseType>,
    limit: usize,
) -> Vec<SimilarCase> {
    let mut ranked: Vec<SimilarCase> = cases
        .filter(|case| root_cause.map_or(true, |t| case.root_cause == t.as_str()))
        .map(|case| SimilarCase {
            case_id: case.id.clone(),
            description: case.description.clone(),
            similarity_score: similarity(case, evidence),
            root_cause: case.root_cause.clone(),
            solution: case.solution.clone(),
            outcome: case.outcome.clone(),
            timestamp: case.timestamp,
        })
        .collect();

    ranked.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    ranked.truncate(limit);
    ranked
}

pub(crate) fn attach_feedback(case: &mut CaseStudy, feedback: &FeedbackRecord) -> Result<(), CaseStoreError> {
    let value = serde_json::to_value(feedback)?;
    let entry = case
        .metadata
        .entry("feedback")
        .or_insert_with(|| serde_json::Value::Array(Vec::new()));
    match entry {
        serde_json::Value::Array(items) => items.push(value),
        other => *other = serde_json::Value::Array(vec![value]),
    }
    Ok(())
}

pub(crate) fn stats_for<'a>(cases: impl Iterator<Item = &'a CaseStudy>, storage: &str) -> CaseStoreStats {
    let mut total = 0;
    let mut types = std::collections::HashSet::new();
    for case in cases {
        total += 1;
        types.insert(case.root_cause.as_str());
    }
    CaseStoreStats {
        total_cases: total,
        root_cause_types: types.len(),
        storage: storage.to_string(),
    }
}

/// Selected case store plus whether it fell back from the configured one
pub struct OpenedCaseStore {
    pub store: Arc<dyn CaseStore>,
    pub degraded: bool,
}

/// Open the file store at `path`, or the in-memory store when no path is
/// configured. A file that cannot be loaded falls back to memory.
pub fn open_case_store(path: Option<&Path>) -> OpenedCaseStore {
    let Some(path) = path else {
        info!("No case store path configured, using in-memory case store");
        return OpenedCaseStore {
            store: Arc::new(InMemoryCaseStore::new()),
            degraded: false,
        };
    };

    match FileCaseStore::open(path) {
        Ok(store) => OpenedCaseStore {
            store: Arc::new(store),
            degraded: false,
        },
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to open case store, falling back to in-memory store"
            );
            OpenedCaseStore {
                store: Arc::new(InMemoryCaseStore::new()),
                degraded: true,
            }
        }
    }
}
