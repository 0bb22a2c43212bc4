//! CLI command definitions

use crate::relay::github::DEFAULT_API_URL;
use clap::Args;

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show the expanded execution plan
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Assemble the pipeline definition
#[derive(Debug, Args, Clone)]
pub struct SynthCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Write the definition here instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Relay one execution state-change event
#[derive(Debug, Args, Clone)]
pub struct RelayCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Event JSON file, or `-` for stdin
    #[arg(long)]
    pub event: String,

    /// Base URL of the execution-detail API
    #[arg(long, env = "WAVELINE_EXECUTION_API_URL")]
    pub execution_api_url: String,

    /// Base URL of the GitHub API
    #[arg(long, env = "WAVELINE_GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Forward failures to this webhook
    #[arg(long, env = "WAVELINE_NOTIFY_WEBHOOK")]
    pub notify_webhook: Option<String>,

    /// Prefix for environment variables holding secret parameters
    #[arg(long)]
    pub secret_env_prefix: Option<String>,
}
