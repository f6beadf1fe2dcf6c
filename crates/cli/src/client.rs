//! API client for communicating with the reasoning service

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// API client for the reasoning service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.join(path).context("Invalid path")?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_with_query(path, &[]).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path, query)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path, &[])?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API request types

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventPayload {
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOptions {
    pub include_similar_cases: bool,
    pub max_recommendations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub request_id: String,
    pub analysis_type: String,
    pub context: AnalysisContext,
    pub options: AnalysisOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    pub cluster_id: String,
    pub resource_type: String,
    pub resource_name: String,
    pub metrics: Value,
    pub time_window: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest {
    pub feedback_id: String,
    pub request_id: String,
    pub feedback_type: String,
    pub rating: u8,
    pub was_helpful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_root_cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub submitted_by: String,
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    pub description: String,
    pub confidence: f64,
    pub risk: String,
    pub impact: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_steps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarCase {
    pub case_id: String,
    pub description: String,
    pub similarity_score: f64,
    pub root_cause: String,
    pub solution: String,
    pub outcome: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub root_cause: Option<String>,
    pub description: String,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub similar_cases: Vec<SimilarCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub request_id: String,
    pub status: String,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub processing_time: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionVerdict {
    pub failure_probability: f64,
    pub predicted_failure_time: Option<String>,
    #[serde(default)]
    pub failure_types: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub contributing_factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyMetric {
    pub total_diagnoses: u64,
    pub correct_diagnoses: u64,
    pub accuracy: f64,
    pub last_updated: String,
}

/// Accuracy for one root cause type, or the overall summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccuracyView {
    Summary {
        overall: AccuracyMetric,
        by_root_cause: BTreeMap<String, AccuracyMetric>,
    },
    Single(AccuracyMetric),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cases: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionList {
    pub suggestions: Vec<Suggestion>,
}

/// Trend summary; only `message` is set when no feedback falls in the window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_feedback: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helpful_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPattern {
    pub root_cause: String,
    pub accuracy: f64,
    pub total_diagnoses: u64,
    pub correct_diagnoses: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPatternList {
    pub patterns: Vec<TopPattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarCaseList {
    pub cases: Vec<SimilarCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseStoreStats {
    pub total_cases: usize,
    pub root_cause_types: usize,
    pub storage: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parameters_are_encoded() {
        let client = ApiClient::new("http://localhost:8082").unwrap();
        let url = client
            .url(
                "api/v1/cases/similar",
                &[("event_reason", "OOM Killed".to_string()), ("limit", "3".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8082/api/v1/cases/similar?event_reason=OOM+Killed&limit=3"
        );
    }

    #[test]
    fn test_accuracy_view_variants() {
        let single: AccuracyView = serde_json::from_str(
            r#"{"total_diagnoses":2,"correct_diagnoses":1,"accuracy":0.5,"last_updated":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(single, AccuracyView::Single(m) if m.total_diagnoses == 2));

        let summary: AccuracyView = serde_json::from_str(
            r#"{"overall":{"total_diagnoses":0,"correct_diagnoses":0,"accuracy":0.0,"last_updated":"2024-01-01T00:00:00Z"},"by_root_cause":{}}"#,
        )
        .unwrap();
        assert!(matches!(summary, AccuracyView::Summary { .. }));
    }

    #[test]
    fn test_trend_report_no_data() {
        let report: TrendReport =
            serde_json::from_str(r#"{"message":"No recent feedback data"}"#).unwrap();
        assert!(report.trend.is_none());
        assert!(report.message.is_some());
    }
}
