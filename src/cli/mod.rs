//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{PlanCommand, RelayCommand, SynthCommand, ValidateCommand};
use std::ffi::OsString;

/// Wave-based delivery pipeline assembler
#[derive(Debug, Parser, Clone)]
#[command(name = "waveline")]
#[command(author = "Waveline Contributors")]
#[command(version)]
#[command(about = "Assembles wave-based delivery pipelines and relays build status", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Validate a pipeline configuration
    Validate(ValidateCommand),

    /// Show the expanded execution plan
    Plan(PlanCommand),

    /// Assemble the pipeline definition for the provisioning engine
    Synth(SynthCommand),

    /// Relay one execution state-change event
    Relay(RelayCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relay_command() {
        let cli = Cli::try_parse_from([
            "waveline",
            "relay",
            "-f",
            "pipeline.yaml",
            "--event",
            "-",
            "--execution-api-url",
            "http://localhost:9000",
        ])
        .unwrap();

        match cli.command {
            Command::Relay(cmd) => {
                assert_eq!(cmd.file, "pipeline.yaml");
                assert_eq!(cmd.event, "-");
                assert_eq!(cmd.github_api_url, crate::relay::github::DEFAULT_API_URL);
                assert!(cmd.notify_webhook.is_none());
            }
            other => panic!("Expected relay command, got {:?}", other),
        }
    }

    #[test]
    fn test_relay_requires_execution_api_url() {
        let result = Cli::try_parse_from(["waveline", "relay", "-f", "p.yaml", "--event", "e.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["waveline", "plan", "-f", "p.yaml", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
