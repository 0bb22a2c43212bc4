//! Configuration errors raised while loading and expanding a topology

use thiserror::Error;

/// Build-time configuration error. Always fatal: assembly stops at the first one.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read pipeline config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse pipeline config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Pipeline '{0}' declares no stages")]
    EmptyPipeline(String),

    #[error("Wave '{0}' declares no environments")]
    EmptyWave(String),

    #[error("{kind} name must not be empty")]
    BlankName { kind: &'static str },

    #[error("{kind} name '{name}' is invalid: use letters, digits, '-' or '_' and start with a letter or digit")]
    InvalidName { kind: &'static str, name: String },

    #[error("Environment '{environment}' is declared more than once in wave '{wave}'")]
    DuplicateEnvironmentInWave { wave: String, environment: String },

    #[error("Stage name '{0}' is used more than once in the pipeline")]
    DuplicateStage(String),

    #[error("Wave '{0}' is declared more than once")]
    DuplicateWave(String),

    #[error("Repository '{0}' must have the form 'owner/name'")]
    InvalidRepository(String),

    #[error("Retry policy must allow at least one attempt")]
    ZeroAttempts,
}
