//! HTTP API: analysis, prediction, feedback, cases, learning metrics,
//! health and Prometheus metrics

use crate::error::ApiError;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use reasoning_lib::{
    health::{ComponentStatus, HealthRegistry},
    learning::{LearningImport, LearningSnapshot, TrendReport},
    observability::{ReasoningMetrics, StructuredLogger},
    AnalysisRequest, AnalysisResult, CaseStudy, Evidence, Feedback, PredictionRequest,
    PredictionVerdict, ReasoningEngine, RecommendationResponse, RootCauseType,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

const DEFAULT_CASE_LIMIT: usize = 5;
const DEFAULT_PATTERN_LIMIT: usize = 5;
const DEFAULT_TREND_WINDOW: &str = "7d";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReasoningEngine>,
    pub health_registry: HealthRegistry,
    pub metrics: ReasoningMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(engine: Arc<ReasoningEngine>, health_registry: HealthRegistry) -> Self {
        let logger = StructuredLogger::new(engine.config().service_name.clone());
        Self {
            engine,
            health_registry,
            metrics: ReasoningMetrics::new(),
            logger,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub request_id: String,
    pub status: String,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    /// Seconds
    pub processing_time: f64,
    pub timestamp: DateTime<Utc>,
}

/// Case submitted over the API; id and timestamp are filled in when absent
#[derive(Debug, Deserialize)]
pub struct NewCaseStudy {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub root_cause: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl From<NewCaseStudy> for CaseStudy {
    fn from(case: NewCaseStudy) -> Self {
        CaseStudy {
            id: case
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title: case.title,
            description: case.description,
            symptoms: case.symptoms,
            root_cause: case.root_cause,
            solution: case.solution,
            outcome: case.outcome,
            cluster_id: case.cluster_id,
            timestamp: case.timestamp.unwrap_or_else(Utc::now),
            metadata: case.metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SimilarCasesQuery {
    pub event_reason: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RootCauseQuery {
    pub root_cause_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    pub window: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

fn parse_root_cause(value: Option<String>) -> Result<Option<RootCauseType>, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<RootCauseType>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

async fn analyze_root_cause(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Json<AnalysisResponse> {
    info!(request_id = %request.request_id, "Analyzing root cause");
    let start = Instant::now();
    let result = state.engine.analyze(&request).await;

    Json(AnalysisResponse {
        request_id: request.request_id,
        status: "completed".to_string(),
        result: Some(result),
        error: None,
        processing_time: start.elapsed().as_secs_f64(),
        timestamp: Utc::now(),
    })
}

async fn predict_failure(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionVerdict>, ApiError> {
    info!(
        resource_type = %request.resource_type,
        resource_name = %request.resource_name,
        "Predicting failures"
    );
    // Fitting the isolation forest is CPU bound
    let engine = state.engine.clone();
    let verdict = tokio::task::spawn_blocking(move || engine.predict(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("prediction task failed: {}", e)))?;
    Ok(Json(verdict))
}

async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Json<RecommendationResponse> {
    info!(request_id = %request.request_id, "Getting recommendations");
    Json(state.engine.recommend(&request.context))
}

async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Json(feedback): Json<Feedback>,
) -> Result<Json<Value>, ApiError> {
    let feedback_id = feedback.feedback_id.clone();
    let feedback_type = feedback.feedback_type;
    let rating = feedback.rating;

    let accepted = state.engine.learning().process_feedback(feedback).await;
    state
        .logger
        .log_feedback(&feedback_id, feedback_type.as_str(), rating, accepted);

    if !accepted {
        return Err(ApiError::BadRequest(format!(
            "rating must be between {} and {}",
            Feedback::MIN_RATING,
            Feedback::MAX_RATING
        )));
    }
    Ok(Json(json!({
        "status": "accepted",
        "message": "Feedback processed successfully"
    })))
}

async fn add_case_study(
    State(state): State<Arc<AppState>>,
    Json(case): Json<NewCaseStudy>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let case: CaseStudy = case.into();
    let case_id = case.id.clone();
    info!(case_id = %case_id, "Adding case study");

    state.engine.case_store().add_case_study(case).await.map_err(|e| {
        error!(case_id = %case_id, error = %e, "Failed to add case study");
        state.metrics.inc_case_store_errors("add_case_study");
        ApiError::from(e)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "created", "case_id": case_id })),
    ))
}

async fn find_similar_cases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SimilarCasesQuery>,
) -> Json<Value> {
    let evidence = match query.event_reason {
        Some(reason) if !reason.is_empty() => Evidence::default().with_event(reason, ""),
        _ => Evidence::default(),
    };
    let limit = query.limit.unwrap_or(DEFAULT_CASE_LIMIT);
    let cases = state.engine.similar_cases(&evidence, None, limit).await;
    Json(json!({ "cases": cases }))
}

async fn accuracy_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RootCauseQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let root_cause = parse_root_cause(query.root_cause_type)?;
    Ok(Json(state.engine.learning().get_accuracy_metrics(root_cause)))
}

async fn improvement_suggestions(State(state): State<Arc<AppState>>) -> Json<Value> {
    let suggestions = state.engine.learning().suggest_improvements();
    Json(json!({ "suggestions": suggestions }))
}

async fn trends(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<TrendReport>, ApiError> {
    let window = query.window.unwrap_or_else(|| DEFAULT_TREND_WINDOW.to_string());
    Ok(Json(state.engine.learning().analyze_trends(&window)?))
}

async fn top_patterns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Json<Value> {
    let limit = query.limit.unwrap_or(DEFAULT_PATTERN_LIMIT);
    let patterns = state.engine.learning().get_top_performing_patterns(limit);
    Json(json!({ "patterns": patterns }))
}

async fn reset_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RootCauseQuery>,
) -> Result<Json<Value>, ApiError> {
    let root_cause = parse_root_cause(query.root_cause_type)?;
    state.engine.learning().reset_metrics(root_cause);
    Ok(Json(json!({
        "status": "reset",
        "root_cause_type": root_cause.map(|t| t.as_str()),
    })))
}

async fn export_learning(State(state): State<Arc<AppState>>) -> Json<LearningSnapshot> {
    Json(state.engine.learning().export_learning_data())
}

async fn import_learning(
    State(state): State<Arc<AppState>>,
    Json(data): Json<LearningImport>,
) -> Result<Json<Value>, ApiError> {
    if !state.engine.learning().import_learning_data(data) {
        return Err(ApiError::BadRequest(
            "no accuracy_metrics supplied".to_string(),
        ));
    }
    Ok(Json(json!({ "status": "imported" })))
}

async fn knowledge_stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.engine.case_store().statistics().await.map_err(|e| {
        state.metrics.inc_case_store_errors("statistics");
        ApiError::from(e)
    })?;
    Ok(Json(stats))
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", encoder.format_type().to_string())],
        buffer,
    ))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/analyze/root-cause", post(analyze_root_cause))
        .route("/api/v1/analyze/predict", post(predict_failure))
        .route("/api/v1/analyze/recommend", post(recommend))
        .route("/api/v1/feedback", post(submit_feedback))
        .route("/api/v1/cases", post(add_case_study))
        .route("/api/v1/cases/similar", get(find_similar_cases))
        .route("/api/v1/metrics/accuracy", get(accuracy_metrics))
        .route("/api/v1/metrics/suggestions", get(improvement_suggestions))
        .route("/api/v1/metrics/trends", get(trends))
        .route("/api/v1/metrics/top-patterns", get(top_patterns))
        .route("/api/v1/metrics/reset", post(reset_metrics))
        .route("/api/v1/learning/export", get(export_learning))
        .route("/api/v1/learning/import", post(import_learning))
        .route("/api/v1/knowledge/stats", get(knowledge_stats))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
