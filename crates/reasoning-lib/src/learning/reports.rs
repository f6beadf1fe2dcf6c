//! Read-side views returned by the learning system

use crate::models::{AccuracyMetric, RootCauseType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AccuracyView {
    Single(AccuracyMetric),
    Summary {
        /// Correct over total across all types; 0 with no diagnoses
        overall: f64,
        by_root_cause: BTreeMap<String, AccuracyMetric>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImprovementSuggestion {
    LowAccuracy {
        root_cause: RootCauseType,
        current_accuracy: f64,
        total_cases: u64,
        suggestion: String,
    },
    CommonMisdiagnosis {
        pattern: String,
        suggestion: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    NeedsAttention,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrendReport {
    NoData {
        message: String,
    },
    Summary {
        time_window: String,
        total_feedback: usize,
        helpful_rate: f64,
        average_rating: f64,
        trend: TrendDirection,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPattern {
    pub root_cause: RootCauseType,
    pub accuracy: f64,
    pub total_diagnoses: u64,
    pub correct_diagnoses: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningSnapshot {
    pub accuracy_metrics: BTreeMap<String, AccuracyMetric>,
    pub total_feedback: usize,
    pub feedback_by_type: BTreeMap<String, usize>,
    pub export_time: DateTime<Utc>,
}

/// Import payload. Only the supplied metric keys are overlaid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningImport {
    #[serde(default)]
    pub accuracy_metrics: Option<BTreeMap<String, AccuracyMetric>>,
}

impl From<LearningSnapshot> for LearningImport {
    fn from(snapshot: LearningSnapshot) -> Self {
        Self {
            accuracy_metrics: Some(snapshot.accuracy_metrics),
        }
    }
}
