//! Learning system commands: accuracy, suggestions, trends and top patterns

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{AccuracyMetric, AccuracyView, ApiClient, SuggestionList, TopPatternList, TrendReport};
use crate::output::{
    color_confidence, format_percent, format_timestamp, print_heading, print_info, print_json, print_table,
    print_warning, OutputFormat,
};

#[derive(Tabled)]
struct AccuracyRow {
    #[tabled(rename = "Root Cause")]
    root_cause: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Correct")]
    correct: u64,
    #[tabled(rename = "Total")]
    total: u64,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl AccuracyRow {
    fn new(root_cause: &str, metric: &AccuracyMetric) -> Self {
        Self {
            root_cause: root_cause.to_string(),
            accuracy: color_confidence(metric.accuracy),
            correct: metric.correct_diagnoses,
            total: metric.total_diagnoses,
            updated: format_timestamp(&metric.last_updated),
        }
    }
}

#[derive(Tabled)]
struct PatternRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Root Cause")]
    root_cause: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Correct / Total")]
    counts: String,
}

/// Show diagnosis accuracy
pub async fn show_accuracy(
    client: &ApiClient,
    root_cause_type: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let mut query = Vec::new();
    if let Some(root_cause) = &root_cause_type {
        query.push(("root_cause_type", root_cause.clone()));
    }
    let view: AccuracyView = client.get_with_query("api/v1/metrics/accuracy", &query).await?;

    if format == OutputFormat::Json {
        return print_json(&view);
    }

    print_heading("Diagnosis Accuracy");
    match view {
        AccuracyView::Single(metric) => {
            let name = root_cause_type.unwrap_or_default();
            print_table(vec![AccuracyRow::new(&name, &metric)], "No data");
        }
        AccuracyView::Summary {
            overall,
            by_root_cause,
        } => {
            println!(
                "Overall: {} ({} of {} correct)",
                color_confidence(overall.accuracy),
                overall.correct_diagnoses,
                overall.total_diagnoses
            );
            println!();
            let rows = by_root_cause
                .iter()
                .map(|(name, metric)| AccuracyRow::new(name, metric))
                .collect();
            print_table(rows, "No feedback recorded yet");
        }
    }
    Ok(())
}

/// Show improvement suggestions
pub async fn show_suggestions(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let list: SuggestionList = client.get("api/v1/metrics/suggestions").await?;

    if format == OutputFormat::Json {
        return print_json(&list);
    }

    print_heading("Improvement Suggestions");
    if list.suggestions.is_empty() {
        print_info("No suggestions; accuracy looks healthy");
        return Ok(());
    }
    for suggestion in &list.suggestions {
        let subject = suggestion
            .root_cause
            .as_deref()
            .or(suggestion.pattern.as_deref())
            .unwrap_or("-");
        println!("{} {}", format!("[{}]", suggestion.kind).yellow(), subject.bold());
        if let (Some(accuracy), Some(total)) = (suggestion.current_accuracy, suggestion.total_cases) {
            println!("    accuracy {} over {} cases", format_percent(accuracy), total);
        }
        println!("    {}", suggestion.suggestion);
    }
    Ok(())
}

/// Show feedback trends over a time window
pub async fn show_trends(client: &ApiClient, window: &str, format: OutputFormat) -> Result<()> {
    let report: TrendReport = client
        .get_with_query("api/v1/metrics/trends", &[("window", window.to_string())])
        .await?;

    if format == OutputFormat::Json {
        return print_json(&report);
    }

    print_heading("Feedback Trends");
    if let Some(message) = &report.message {
        print_warning(message);
        return Ok(());
    }
    println!("Window:         {}", report.time_window.as_deref().unwrap_or(window));
    println!("Feedback:       {}", report.total_feedback.unwrap_or(0));
    println!(
        "Helpful Rate:   {}",
        format_percent(report.helpful_rate.unwrap_or(0.0))
    );
    println!(
        "Average Rating: {:.2}",
        report.average_rating.unwrap_or(0.0)
    );
    let trend = report.trend.as_deref().unwrap_or("unknown");
    let trend = match trend {
        "improving" => trend.green(),
        _ => trend.yellow(),
    };
    println!("Trend:          {}", trend);
    Ok(())
}

/// Show the best performing diagnosis patterns
pub async fn show_top_patterns(client: &ApiClient, limit: usize, format: OutputFormat) -> Result<()> {
    let list: TopPatternList = client
        .get_with_query("api/v1/metrics/top-patterns", &[("limit", limit.to_string())])
        .await?;

    if format == OutputFormat::Json {
        return print_json(&list);
    }

    print_heading("Top Performing Patterns");
    let rows = list
        .patterns
        .iter()
        .enumerate()
        .map(|(i, p)| PatternRow {
            rank: i + 1,
            root_cause: p.root_cause.clone(),
            accuracy: color_confidence(p.accuracy),
            counts: format!("{} / {}", p.correct_diagnoses, p.total_diagnoses),
        })
        .collect();
    print_table(rows, "Not enough feedback to rank patterns");
    Ok(())
}
