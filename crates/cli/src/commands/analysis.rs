//! Analysis, prediction and feedback commands

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::path::Path;
use tabled::Tabled;

use crate::client::{
    AnalysisContext, AnalysisOptions, AnalysisRequest, AnalysisResponse, ApiClient, EventPayload,
    FeedbackRequest, PredictionRequest, PredictionVerdict, StatusResponse,
};
use crate::output::{
    color_confidence, color_probability, color_risk, format_timestamp, print_heading, print_info, print_json,
    print_success, print_table, print_warning, OutputFormat,
};

/// Arguments for `rsn analyze`
pub struct AnalyzeArgs {
    pub request_id: Option<String>,
    pub event_reason: Option<String>,
    pub event_message: Option<String>,
    pub logs_file: Option<String>,
    pub metrics_file: Option<String>,
    pub max_recommendations: usize,
    pub no_similar_cases: bool,
}

/// Arguments for `rsn feedback`
pub struct FeedbackArgs {
    pub request_id: String,
    pub feedback_type: String,
    pub rating: u8,
    pub helpful: bool,
    pub actual_root_cause: Option<String>,
    pub solution: Option<String>,
    pub comments: Option<String>,
    pub submitted_by: String,
}

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Duration")]
    duration: String,
}

#[derive(Tabled)]
struct SimilarCaseRow {
    #[tabled(rename = "Case")]
    case_id: String,
    #[tabled(rename = "Similarity")]
    similarity: String,
    #[tabled(rename = "Root Cause")]
    root_cause: String,
    #[tabled(rename = "Solution")]
    solution: String,
}

fn read_metrics_file(path: &str) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read metrics file {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Metrics file {} is not valid JSON", path))
}

fn read_logs_file(path: &str) -> Result<String> {
    std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("Failed to read logs file {}", path))
}

/// Build the request body for a root cause analysis
pub fn build_analysis_request(args: AnalyzeArgs) -> Result<AnalysisRequest> {
    let event = match (args.event_reason, args.event_message) {
        (None, None) => None,
        (reason, message) => Some(EventPayload {
            reason: reason.unwrap_or_default(),
            message: message.unwrap_or_default(),
        }),
    };
    let logs = args.logs_file.as_deref().map(read_logs_file).transpose()?;
    let metrics = args.metrics_file.as_deref().map(read_metrics_file).transpose()?;

    Ok(AnalysisRequest {
        request_id: args
            .request_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        analysis_type: "root_cause".to_string(),
        context: AnalysisContext {
            event,
            logs,
            metrics,
        },
        options: AnalysisOptions {
            include_similar_cases: !args.no_similar_cases,
            max_recommendations: args.max_recommendations,
        },
    })
}

/// Run a root cause analysis
pub async fn analyze(client: &ApiClient, args: AnalyzeArgs, format: OutputFormat) -> Result<()> {
    let request = build_analysis_request(args)?;
    let response: AnalysisResponse = client.post("api/v1/analyze/root-cause", &request).await?;

    if format == OutputFormat::Json {
        return print_json(&response);
    }

    print_heading("Root Cause Analysis");
    println!("Request:     {}", response.request_id.cyan());
    println!("Status:      {}", response.status);
    println!("Took:        {:.3}s", response.processing_time);
    println!();

    if let Some(err) = &response.error {
        print_warning(err);
        return Ok(());
    }
    let Some(result) = response.result else {
        print_warning("Service returned no result");
        return Ok(());
    };

    match &result.root_cause {
        Some(root_cause) => {
            println!("Root Cause:  {}", root_cause.bold());
            println!("Confidence:  {}", color_confidence(result.confidence));
        }
        None => print_warning("No root cause identified"),
    }
    println!("Description: {}", result.description);

    if !result.evidence.is_empty() {
        println!();
        println!("{}", "Evidence".bold());
        for line in &result.evidence {
            println!("  - {}", line);
        }
    }

    if !result.recommendations.is_empty() {
        println!();
        println!("{}", "Recommendations".bold());
        let rows = result
            .recommendations
            .iter()
            .enumerate()
            .map(|(i, r)| RecommendationRow {
                rank: i + 1,
                action: r.action.clone(),
                confidence: color_confidence(r.confidence),
                risk: color_risk(&r.risk),
                duration: r.estimated_duration.clone().unwrap_or_else(|| "-".to_string()),
            })
            .collect();
        print_table(rows, "No recommendations");
    }

    if !result.similar_cases.is_empty() {
        println!();
        println!("{}", "Similar Cases".bold());
        let rows = result
            .similar_cases
            .iter()
            .map(|c| SimilarCaseRow {
                case_id: c.case_id.clone(),
                similarity: format!("{:.2}", c.similarity_score),
                root_cause: c.root_cause.clone(),
                solution: c.solution.clone(),
            })
            .collect();
        print_table(rows, "No similar cases");
    }

    Ok(())
}

/// Predict failure for a resource
pub async fn predict(
    client: &ApiClient,
    resource_type: &str,
    resource_name: &str,
    metrics_file: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let metrics = metrics_file
        .as_deref()
        .map(read_metrics_file)
        .transpose()?
        .unwrap_or_else(|| Value::Object(Default::default()));

    let request = PredictionRequest {
        cluster_id: String::new(),
        resource_type: resource_type.to_string(),
        resource_name: resource_name.to_string(),
        metrics,
        time_window: "1h".to_string(),
    };
    let verdict: PredictionVerdict = client.post("api/v1/analyze/predict", &request).await?;

    if format == OutputFormat::Json {
        return print_json(&verdict);
    }

    print_heading("Failure Prediction");
    println!("Resource:    {}/{}", resource_type, resource_name.cyan());
    println!(
        "Probability: {}",
        color_probability(verdict.failure_probability)
    );
    println!("Confidence:  {}", color_confidence(verdict.confidence));
    if let Some(at) = &verdict.predicted_failure_time {
        println!("Expected:    {}", format_timestamp(at));
    }
    if !verdict.failure_types.is_empty() {
        println!("Types:       {}", verdict.failure_types.join(", "));
    }
    if verdict.contributing_factors.is_empty() {
        print_info("No risk factors detected");
    } else {
        println!();
        println!("{}", "Contributing Factors".bold());
        for factor in &verdict.contributing_factors {
            println!("  - {}", factor);
        }
    }

    Ok(())
}

/// Submit feedback on a previous analysis
pub async fn submit_feedback(
    client: &ApiClient,
    args: FeedbackArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = FeedbackRequest {
        feedback_id: uuid::Uuid::new_v4().to_string(),
        request_id: args.request_id,
        feedback_type: args.feedback_type,
        rating: args.rating,
        was_helpful: args.helpful,
        actual_root_cause: args.actual_root_cause,
        actual_solution: args.solution,
        comments: args.comments,
        submitted_by: args.submitted_by,
    };
    let response: StatusResponse = client.post("api/v1/feedback", &request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&format!("Feedback {} {}", request.feedback_id, response.status));
            if let Some(message) = &response.message {
                print_info(message);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args() -> AnalyzeArgs {
        AnalyzeArgs {
            request_id: None,
            event_reason: None,
            event_message: None,
            logs_file: None,
            metrics_file: None,
            max_recommendations: 5,
            no_similar_cases: false,
        }
    }

    #[test]
    fn test_request_without_inputs_has_empty_context() {
        let request = build_analysis_request(args()).unwrap();
        assert!(!request.request_id.is_empty());
        assert!(request.context.event.is_none());
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["context"], serde_json::json!({}));
        assert_eq!(body["options"]["include_similar_cases"], true);
    }

    #[test]
    fn test_request_reads_files() {
        let mut logs = NamedTempFile::new().unwrap();
        writeln!(logs, "java.lang.OutOfMemoryError: Java heap space").unwrap();
        let mut metrics = NamedTempFile::new().unwrap();
        write!(metrics, r#"{{"memory": {{"usage_percent": 97}}}}"#).unwrap();

        let request = build_analysis_request(AnalyzeArgs {
            request_id: Some("req-1".to_string()),
            event_reason: Some("OOMKilled".to_string()),
            logs_file: Some(logs.path().display().to_string()),
            metrics_file: Some(metrics.path().display().to_string()),
            ..args()
        })
        .unwrap();

        assert_eq!(request.request_id, "req-1");
        assert_eq!(request.context.event.unwrap().reason, "OOMKilled");
        assert!(request.context.logs.unwrap().contains("OutOfMemoryError"));
        assert_eq!(request.context.metrics.unwrap()["memory"]["usage_percent"], 97);
    }

    #[test]
    fn test_invalid_metrics_file_is_an_error() {
        let mut metrics = NamedTempFile::new().unwrap();
        write!(metrics, "not json").unwrap();

        let result = build_analysis_request(AnalyzeArgs {
            metrics_file: Some(metrics.path().display().to_string()),
            ..args()
        });
        assert!(result.is_err());
    }
}
