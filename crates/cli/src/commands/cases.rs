//! Case store commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, CaseStoreStats, SimilarCaseList};
use crate::output::{print_heading, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct CaseRow {
    #[tabled(rename = "Case")]
    case_id: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Root Cause")]
    root_cause: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Solution")]
    solution: String,
}

/// Find case studies similar to an event
pub async fn find_similar(
    client: &ApiClient,
    event_reason: Option<String>,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(reason) = event_reason {
        query.push(("event_reason", reason));
    }
    let list: SimilarCaseList = client.get_with_query("api/v1/cases/similar", &query).await?;

    if format == OutputFormat::Json {
        return print_json(&list);
    }

    print_heading("Similar Cases");
    let rows = list
        .cases
        .iter()
        .map(|c| CaseRow {
            case_id: c.case_id.clone(),
            score: format!("{:.2}", c.similarity_score),
            root_cause: c.root_cause.clone(),
            outcome: c.outcome.clone(),
            solution: c.solution.clone(),
        })
        .collect();
    print_table(rows, "No similar cases found");
    Ok(())
}

/// Show case store statistics
pub async fn show_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats: CaseStoreStats = client.get("api/v1/knowledge/stats").await?;

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            print_heading("Case Store");
            println!("Storage:          {}", stats.storage.cyan());
            println!("Total Cases:      {}", stats.total_cases);
            println!("Root Cause Types: {}", stats.root_cause_types);
        }
    }
    Ok(())
}
