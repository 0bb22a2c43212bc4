//! GitHub commit status client

use crate::relay::{
    endpoint_url, parse_endpoint, CommitStatus, RelayError, RepositorySlug, RepositoryStatusClient,
};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Posts commit statuses through the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubStatusClient {
    client: Client,
    api_url: Url,
}

impl GitHubStatusClient {
    pub fn new(api_url: &str) -> Result<Self, RelayError> {
        let api_url = parse_endpoint(api_url)?;
        let client = Client::builder()
            .user_agent(concat!("waveline/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RelayError::Endpoint {
                url: api_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { client, api_url })
    }

    /// `{api}/repos/{owner}/{repo}/statuses/{sha}`
    pub fn status_url(&self, repository: &RepositorySlug, sha: &str) -> Result<Url, RelayError> {
        endpoint_url(
            &self.api_url,
            &[
                "repos",
                repository.owner.as_str(),
                repository.name.as_str(),
                "statuses",
                sha,
            ],
        )
    }
}

/// Server errors and rate limiting are worth retrying; other rejections are not
pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl RepositoryStatusClient for GitHubStatusClient {
    async fn report(
        &self,
        repository: &RepositorySlug,
        token: &SecretString,
        status: &CommitStatus,
    ) -> Result<(), RelayError> {
        let url = self.status_url(repository, &status.sha)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .bearer_auth(token.expose_secret())
            .json(&serde_json::json!({
                "state": status.state,
                "context": status.context,
                "description": status.description,
                "target_url": status.target_url,
            }))
            .send()
            .await
            .map_err(|e| RelayError::Delivery {
                sha: status.sha.clone(),
                message: e.to_string(),
                transient: true,
            })?;

        if !response.status().is_success() {
            let code = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("GitHub rejected status for {}: {} - {}", status.sha, code, body);
            return Err(RelayError::Delivery {
                sha: status.sha.clone(),
                message: format!("{}: {}", code, body),
                transient: is_transient_status(code),
            });
        }

        Ok(())
    }
}
