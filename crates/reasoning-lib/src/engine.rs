//! Reasoning engine: wires analyzer, recommender, predictor, learning system
//! and case store behind one handle shared by the service

use crate::analyzer::RootCauseAnalyzer;
use crate::knowledge::CaseStore;
use crate::learning::LearningSystem;
use crate::models::{
    AnalysisRequest, AnalysisResult, Evidence, PredictionRequest, PredictionVerdict,
    Recommendation, RootCauseType, RootCauseVerdict, SimilarCase,
};
use crate::observability::{ReasoningMetrics, StructuredLogger};
use crate::predictor::FailurePredictor;
use crate::recommender::{RecommendationEngine, DEFAULT_MAX_RECOMMENDATIONS};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_SIMILAR_CASE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub service_name: String,
    /// Upper bound on a case store lookup during analysis
    pub similar_case_timeout: Duration,
    pub anomaly_detection: bool,
    pub max_recommendations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service_name: "reasoning-service".to_string(),
            similar_case_timeout: DEFAULT_SIMILAR_CASE_TIMEOUT,
            anomaly_detection: true,
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }
}

/// Recommendations derived straight from evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<RootCauseVerdict>,
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct ReasoningEngine {
    analyzer: RootCauseAnalyzer,
    recommender: RecommendationEngine,
    predictor: FailurePredictor,
    learning: Arc<LearningSystem>,
    case_store: Arc<dyn CaseStore>,
    config: EngineConfig,
    metrics: ReasoningMetrics,
    logger: StructuredLogger,
}

impl ReasoningEngine {
    pub fn new(config: EngineConfig, case_store: Arc<dyn CaseStore>) -> Result<Self> {
        let learning = Arc::new(LearningSystem::new().with_case_store(Arc::clone(&case_store)));
        Ok(Self {
            analyzer: RootCauseAnalyzer::new()?,
            recommender: RecommendationEngine::new()
                .with_max_recommendations(config.max_recommendations),
            predictor: FailurePredictor::new(config.anomaly_detection),
            learning,
            case_store,
            logger: StructuredLogger::new(config.service_name.clone()),
            metrics: ReasoningMetrics::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn learning(&self) -> &Arc<LearningSystem> {
        &self.learning
    }

    pub fn case_store(&self) -> &Arc<dyn CaseStore> {
        &self.case_store
    }

    pub fn predictor(&self) -> &FailurePredictor {
        &self.predictor
    }

    /// Verdict, recommendations and, when asked for and a type was found,
    /// similar historical cases
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let start = Instant::now();
        let evidence = &request.context;
        let verdict = self.analyzer.analyze(evidence);

        let mut recommendations = self.recommender.recommend(&verdict, evidence);
        recommendations.truncate(request.options.max_recommendations);

        let similar_cases = match verdict.root_cause {
            Some(root_cause) if request.options.include_similar_cases => {
                self.similar_cases(evidence, Some(root_cause), request.options.max_recommendations)
                    .await
            }
            _ => Vec::new(),
        };

        self.metrics
            .observe_analysis_latency(start.elapsed().as_secs_f64());
        self.metrics
            .inc_verdicts(verdict.root_cause.map_or("none", |t| t.as_str()));
        self.metrics
            .set_last_recommendations(recommendations.len() as i64);
        self.logger.log_root_cause(
            &request.request_id,
            verdict.root_cause.map(|t| t.as_str()),
            verdict.confidence,
            recommendations.len(),
            similar_cases.len(),
        );

        AnalysisResult {
            verdict,
            recommendations,
            similar_cases,
        }
    }

    pub fn recommend(&self, evidence: &Evidence) -> RecommendationResponse {
        let verdict = self.analyzer.analyze(evidence);
        if !verdict.is_identified() {
            return RecommendationResponse {
                root_cause: None,
                recommendations: Vec::new(),
                message: Some("No root cause identified".to_string()),
            };
        }

        let recommendations = self.recommender.recommend(&verdict, evidence);
        self.metrics
            .set_last_recommendations(recommendations.len() as i64);
        RecommendationResponse {
            root_cause: Some(verdict),
            recommendations,
            message: None,
        }
    }

    pub fn predict(&self, request: &PredictionRequest) -> PredictionVerdict {
        let verdict = self.predictor.predict(
            &request.resource_type,
            &request.resource_name,
            &request.metrics,
        );
        self.metrics.inc_predictions();
        let failure_types: Vec<String> = verdict
            .failure_types
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();
        self.logger.log_prediction(
            &request.resource_type,
            &request.resource_name,
            verdict.failure_probability,
            &failure_types,
        );
        verdict
    }

    /// Case store lookup bounded by the configured timeout. Errors and
    /// timeouts yield no cases.
    pub async fn similar_cases(
        &self,
        evidence: &Evidence,
        root_cause: Option<RootCauseType>,
        limit: usize,
    ) -> Vec<SimilarCase> {
        let lookup = self.case_store.find_similar_cases(evidence, root_cause, limit);
        match tokio::time::timeout(self.config.similar_case_timeout, lookup).await {
            Ok(Ok(cases)) => {
                debug!(count = cases.len(), "Found similar cases");
                cases
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Similar case lookup failed");
                self.metrics.inc_case_store_errors("find_similar_cases");
                self.logger
                    .log_case_store_degraded(self.case_store.backend(), &e.to_string());
                Vec::new()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.similar_case_timeout.as_millis() as u64,
                    "Similar case lookup timed out"
                );
                self.metrics.inc_case_store_errors("find_similar_cases");
                self.logger
                    .log_case_store_degraded(self.case_store.backend(), "lookup timed out");
                Vec::new()
            }
        }
    }
}
