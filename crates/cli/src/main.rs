//! Failure Reasoning CLI
//!
//! A command-line tool for running root cause analyses, failure predictions,
//! submitting feedback and inspecting the learning system of the reasoning service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{analysis, cases, learning};
use output::OutputFormat;

/// Failure Reasoning CLI
#[derive(Parser)]
#[command(name = "rsn")]
#[command(author, version, about = "CLI for the Failure Reasoning Service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via RSN_API_URL env var)
    #[arg(long, env = "RSN_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the root cause of a failure
    Analyze {
        /// Kubernetes event reason (e.g. OOMKilled, ImagePullBackOff)
        #[arg(long)]
        event_reason: Option<String>,

        /// Kubernetes event message
        #[arg(long)]
        event_message: Option<String>,

        /// File containing container logs
        #[arg(long)]
        logs_file: Option<String>,

        /// JSON file with a metrics snapshot
        #[arg(long)]
        metrics_file: Option<String>,

        /// Request ID (generated if not specified)
        #[arg(long)]
        request_id: Option<String>,

        /// Maximum number of recommendations
        #[arg(long, default_value_t = 5)]
        max_recommendations: usize,

        /// Skip the similar case lookup
        #[arg(long)]
        no_similar_cases: bool,
    },

    /// Predict whether a resource is about to fail
    Predict {
        /// Resource type (e.g. pod, node)
        resource_type: String,

        /// Resource name
        resource_name: String,

        /// JSON file with current metrics and optional history
        #[arg(long)]
        metrics_file: Option<String>,
    },

    /// Submit feedback on a previous analysis
    Feedback {
        /// Request ID of the analysis
        request_id: String,

        /// Feedback type (diagnosis_accuracy, recommendation_usefulness, prediction_accuracy)
        #[arg(long = "type", default_value = "diagnosis_accuracy")]
        feedback_type: String,

        /// Rating from 1 to 5
        #[arg(long)]
        rating: u8,

        /// Mark the analysis as helpful
        #[arg(long)]
        helpful: bool,

        /// Root cause that was actually found
        #[arg(long)]
        actual_root_cause: Option<String>,

        /// Solution that actually worked
        #[arg(long)]
        solution: Option<String>,

        /// Free-form comments
        #[arg(long)]
        comments: Option<String>,

        /// Submitter name (defaults to the configured user)
        #[arg(long)]
        submitted_by: Option<String>,
    },

    /// Show diagnosis accuracy
    Accuracy {
        /// Limit to one root cause type (e.g. OOMKiller)
        #[arg(long)]
        root_cause_type: Option<String>,
    },

    /// Show improvement suggestions
    Suggestions,

    /// Show feedback trends
    Trends {
        /// Time window (e.g. 7d, 30d)
        #[arg(long, default_value = "7d")]
        window: String,
    },

    /// Show the best performing diagnosis patterns
    TopPatterns {
        /// Maximum number of patterns
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Case store commands
    #[command(subcommand)]
    Cases(CasesCommands),

    /// Manage local CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum CasesCommands {
    /// Find case studies similar to an event
    Similar {
        /// Event reason to match
        #[arg(long)]
        event_reason: Option<String>,

        /// Maximum number of cases
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Show case store statistics
    Stats,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,

    /// Update configuration values
    Set {
        /// Default API endpoint URL
        #[arg(long)]
        api_url: Option<String>,

        /// Default output format
        #[arg(long)]
        default_format: Option<OutputFormat>,

        /// Name recorded on submitted feedback
        #[arg(long)]
        user: Option<String>,
    },
}

fn run_config(command: ConfigCommands, mut settings: config::Config) -> Result<()> {
    match command {
        ConfigCommands::Show => output::print_json(&settings)?,
        ConfigCommands::Set {
            api_url,
            default_format,
            user,
        } => {
            if api_url.is_some() {
                settings.api_url = api_url;
            }
            if let Some(f) = default_format {
                settings.default_format = Some(format!("{:?}", f).to_lowercase());
            }
            if user.is_some() {
                settings.user = user;
            }
            let path = settings.save()?;
            output::print_success(&format!("Configuration saved to {}", path.display()));
        }
    }
    Ok(())
}

async fn run(
    command: Commands,
    client: &client::ApiClient,
    settings: &config::Config,
    format: OutputFormat,
) -> Result<()> {
    match command {
        Commands::Analyze {
            event_reason,
            event_message,
            logs_file,
            metrics_file,
            request_id,
            max_recommendations,
            no_similar_cases,
        } => {
            let args = analysis::AnalyzeArgs {
                request_id,
                event_reason,
                event_message,
                logs_file,
                metrics_file,
                max_recommendations,
                no_similar_cases,
            };
            analysis::analyze(client, args, format).await?;
        }
        Commands::Predict {
            resource_type,
            resource_name,
            metrics_file,
        } => {
            analysis::predict(client, &resource_type, &resource_name, metrics_file, format).await?;
        }
        Commands::Feedback {
            request_id,
            feedback_type,
            rating,
            helpful,
            actual_root_cause,
            solution,
            comments,
            submitted_by,
        } => {
            let args = analysis::FeedbackArgs {
                request_id,
                feedback_type,
                rating,
                helpful,
                actual_root_cause,
                solution,
                comments,
                submitted_by: submitted_by
                    .or_else(|| settings.user.clone())
                    .unwrap_or_else(|| "cli-user".to_string()),
            };
            analysis::submit_feedback(client, args, format).await?;
        }
        Commands::Accuracy { root_cause_type } => {
            learning::show_accuracy(client, root_cause_type, format).await?;
        }
        Commands::Suggestions => {
            learning::show_suggestions(client, format).await?;
        }
        Commands::Trends { window } => {
            learning::show_trends(client, &window, format).await?;
        }
        Commands::TopPatterns { limit } => {
            learning::show_top_patterns(client, limit, format).await?;
        }
        Commands::Cases(cases_cmd) => match cases_cmd {
            CasesCommands::Similar {
                event_reason,
                limit,
            } => {
                cases::find_similar(client, event_reason, limit, format).await?;
            }
            CasesCommands::Stats => {
                cases::show_stats(client, format).await?;
            }
        },
        Commands::Config(config_cmd) => run_config(config_cmd, settings.clone())?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::Config::load()?;

    let format = cli
        .format
        .or_else(|| {
            settings
                .default_format
                .as_deref()
                .and_then(OutputFormat::parse_name)
        })
        .unwrap_or_default();

    match cli.command {
        // Config commands must work even when the configured URL is broken
        Commands::Config(config_cmd) => run_config(config_cmd, settings),
        command => {
            let client = client::ApiClient::new(&settings.resolve_api_url(cli.api_url))?;
            run(command, &client, &settings, format).await
        }
    }
}
