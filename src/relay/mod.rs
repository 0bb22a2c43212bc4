//! Build status relay
//!
//! Turns execution state-change events into commit statuses on the source
//! repository. Each invocation is independent: resolve the execution's commit,
//! read the token from the secret store, post one status. Nothing is cached
//! between invocations, and repeated deliveries of the same event simply
//! overwrite the same status (the repository API is last-write-wins per
//! commit and context).

pub mod github;
pub mod resolver;
pub mod retry;
pub mod secrets;
pub mod status;

pub use github::GitHubStatusClient;
pub use resolver::HttpExecutionResolver;
pub use retry::RetryPolicy;
pub use secrets::EnvSecretStore;
pub use crate::core::RepositorySlug;
pub use status::{CommitStatus, StatusState};

use crate::core::{ConfigError, StatusRelayConfig};
use crate::events::StateChangeEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Run-time relay errors, surfaced to the invoking event infrastructure
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Failed to look up execution {execution_id}: {message}")]
    Lookup {
        execution_id: String,
        message: String,
        transient: bool,
    },

    #[error("Execution {0} has no source revision")]
    MissingRevision(String),

    #[error("Failed to read secret parameter '{name}': {message}")]
    Secret { name: String, message: String },

    #[error("Failed to report status for commit {sha}: {message}")]
    Delivery {
        sha: String,
        message: String,
        transient: bool,
    },

    #[error("Invalid endpoint '{url}': {message}")]
    Endpoint { url: String, message: String },
}

impl RelayError {
    /// Whether a later attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RelayError::Lookup { transient, .. } | RelayError::Delivery { transient, .. } => *transient,
            _ => false,
        }
    }
}

/// Parse a base URL for one of the HTTP collaborators
pub(crate) fn parse_endpoint(url: &str) -> Result<Url, RelayError> {
    let endpoint_error = |message: String| RelayError::Endpoint {
        url: url.to_string(),
        message,
    };
    let parsed = Url::parse(url).map_err(|e| endpoint_error(e.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(endpoint_error("not a base URL".to_string()));
    }
    Ok(parsed)
}

/// Append path segments to `base`, percent-encoding each one
pub(crate) fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, RelayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RelayError::Endpoint {
            url: base.to_string(),
            message: "not a base URL".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Resolves a pipeline execution to the commit that triggered it
#[async_trait]
pub trait ExecutionDetailResolver: Send + Sync {
    async fn resolve_commit(&self, pipeline: &str, execution_id: &str) -> Result<String, RelayError>;
}

/// Read-only access to one named secret value
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<SecretString, RelayError>;
}

/// Status-reporting endpoint of the source repository
#[async_trait]
pub trait RepositoryStatusClient: Send + Sync {
    async fn report(
        &self,
        repository: &RepositorySlug,
        token: &SecretString,
        status: &CommitStatus,
    ) -> Result<(), RelayError>;
}

/// Relay settings derived from [`StatusRelayConfig`]
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub pipeline: String,
    pub repository: RepositorySlug,
    pub secret_parameter: String,
    pub context: String,
    pub target_url: Option<String>,
    pub retry: RetryPolicy,
}

impl RelaySettings {
    pub fn from_config(pipeline: &str, config: &StatusRelayConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            pipeline: pipeline.to_string(),
            repository: config.repository_slug()?,
            secret_parameter: config.secret_parameter.clone(),
            context: config.context.clone().unwrap_or_else(|| pipeline.to_string()),
            target_url: config.target_url.clone(),
            retry: config.retry.into(),
        })
    }

    fn render_target_url(&self, execution_id: &str) -> Option<String> {
        self.target_url.as_ref().map(|template| {
            template
                .replace("{pipeline}", &self.pipeline)
                .replace("{execution_id}", execution_id)
        })
    }
}

/// Result of one relay invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Reported {
        status: CommitStatus,
        reported_at: DateTime<Utc>,
    },
    Ignored { reason: String },
}

/// Event handler relaying execution states to the source repository
pub struct BuildStatusRelay<R, S, C> {
    settings: RelaySettings,
    resolver: R,
    secrets: S,
    client: C,
}

impl<R, S, C> BuildStatusRelay<R, S, C>
where
    R: ExecutionDetailResolver,
    S: SecretStore,
    C: RepositoryStatusClient,
{
    pub fn new(settings: RelaySettings, resolver: R, secrets: S, client: C) -> Self {
        Self {
            settings,
            resolver,
            secrets,
            client,
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Parse a JSON event envelope and handle it
    pub async fn handle_json(&self, json: &str) -> Result<RelayOutcome, RelayError> {
        let event = StateChangeEvent::from_json(json)
            .map_err(|e| RelayError::InvalidEvent(e.to_string()))?;
        self.handle(&event).await
    }

    /// Handle one state-change event: at most one status report
    pub async fn handle(&self, event: &StateChangeEvent) -> Result<RelayOutcome, RelayError> {
        if event.pipeline != self.settings.pipeline {
            let reason = format!(
                "event for pipeline '{}' does not belong to '{}'",
                event.pipeline, self.settings.pipeline
            );
            warn!("Ignoring {}: {}", event.state, reason);
            return Ok(RelayOutcome::Ignored { reason });
        }

        if event.execution_id.trim().is_empty() {
            return Err(RelayError::InvalidEvent("missing execution id".to_string()));
        }

        let retry = self.settings.retry;

        let sha = retry
            .run("Execution lookup", || {
                self.resolver
                    .resolve_commit(&event.pipeline, &event.execution_id)
            })
            .await?;
        debug!("Execution {} resolved to commit {}", event.execution_id, sha);

        // Read on every invocation so a rotated token is picked up
        let token = self.secrets.fetch(&self.settings.secret_parameter).await?;

        let status = CommitStatus {
            sha,
            state: StatusState::from(event.state),
            context: self.settings.context.clone(),
            description: format!("Pipeline execution {}", event.state),
            target_url: self.settings.render_target_url(&event.execution_id),
        };

        retry
            .run("Status delivery", || {
                self.client.report(&self.settings.repository, &token, &status)
            })
            .await?;

        info!(
            "Reported {:?} for {}@{} ({})",
            status.state, self.settings.repository, status.sha, event.state
        );
        Ok(RelayOutcome::Reported {
            status,
            reported_at: Utc::now(),
        })
    }
}
