//! Pipeline configuration from YAML

use crate::core::{
    error::ConfigError,
    plan::ExecutionPlan,
    step::PipelineStep,
    topology::{check_name, TopologyExpander},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Instance identifier used to derive resource names (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Declared pipeline sequence
    pub stages: Vec<PipelineStep>,

    /// Failure notification wiring
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Build status relay wiring (disabled when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_relay: Option<StatusRelayConfig>,
}

/// Failure notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Explicit topic name; derived from the unique id otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            topic_name: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Build status relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusRelayConfig {
    /// Source repository as `owner/name`
    pub repository: String,

    /// Name of the secret parameter holding the repository token
    pub secret_parameter: String,

    /// Status context shown by the repository (defaults to the pipeline name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Link template; `{pipeline}` and `{execution_id}` are substituted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// In-process retry of transient relay failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per call; 1 leaves retrying to the event infrastructure
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles on every further attempt
    #[serde(default)]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: 0,
        }
    }
}

/// Repository coordinates, `owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySlug {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepositorySlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!("invalid repository '{}'", s)),
        }
    }
}

impl fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl StatusRelayConfig {
    pub fn repository_slug(&self) -> Result<RepositorySlug, ConfigError> {
        self.repository
            .parse()
            .map_err(|_| ConfigError::InvalidRepository(self.repository.clone()))
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Identifier used for deterministic resource naming
    pub fn unique_id(&self) -> &str {
        self.unique_id.as_deref().unwrap_or(&self.name)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.expand().map(|_| ())
    }

    /// Validate and expand the declared stages
    pub fn expand(&self) -> Result<ExecutionPlan, ConfigError> {
        check_name("Pipeline", &self.name)?;

        if self.stages.is_empty() {
            return Err(ConfigError::EmptyPipeline(self.name.clone()));
        }

        if let Some(relay) = &self.status_relay {
            relay.repository_slug()?;
            if relay.secret_parameter.trim().is_empty() {
                return Err(ConfigError::BlankName {
                    kind: "Secret parameter",
                });
            }
            if relay.retry.max_attempts == 0 {
                return Err(ConfigError::ZeroAttempts);
            }
        }

        TopologyExpander::new().expand(&self.stages)
    }

    /// Number of declared single environments plus environments across all waves
    pub fn environment_count(&self) -> usize {
        self.stages
            .iter()
            .map(|step| match step {
                PipelineStep::Wave(wave) => wave.environments.len(),
                PipelineStep::Environment(_) => 1,
            })
            .sum()
    }
}
