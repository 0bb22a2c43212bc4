//! Execution-detail lookup over HTTP

use crate::relay::{
    endpoint_url, github::is_transient_status, parse_endpoint, ExecutionDetailResolver, RelayError,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Execution detail as returned by the provisioning engine
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDetail {
    pub pipeline_execution: PipelineExecution,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineExecution {
    #[serde(default)]
    pub pipeline_execution_id: Option<String>,

    #[serde(default)]
    pub artifact_revisions: Vec<ArtifactRevision>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRevision {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub revision_id: Option<String>,
}

impl ExecutionDetail {
    /// Commit of the first source artifact that carries one
    pub fn commit(&self) -> Option<&str> {
        self.pipeline_execution
            .artifact_revisions
            .iter()
            .filter_map(|rev| rev.revision_id.as_deref())
            .find(|id| !id.is_empty())
    }
}

/// Looks executions up at `{base_url}/pipelines/{pipeline}/executions/{id}`
#[derive(Debug, Clone)]
pub struct HttpExecutionResolver {
    client: Client,
    base_url: Url,
}

impl HttpExecutionResolver {
    pub fn new(base_url: &str) -> Result<Self, RelayError> {
        let base_url = parse_endpoint(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RelayError::Endpoint {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }

    pub fn execution_url(&self, pipeline: &str, execution_id: &str) -> Result<Url, RelayError> {
        endpoint_url(
            &self.base_url,
            &["pipelines", pipeline, "executions", execution_id],
        )
    }
}

#[async_trait]
impl ExecutionDetailResolver for HttpExecutionResolver {
    async fn resolve_commit(&self, pipeline: &str, execution_id: &str) -> Result<String, RelayError> {
        let url = self.execution_url(pipeline, execution_id)?;
        debug!("GET {}", url);

        let lookup_error = |message: String, transient: bool| RelayError::Lookup {
            execution_id: execution_id.to_string(),
            message,
            transient,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| lookup_error(e.to_string(), true))?;

        if !response.status().is_success() {
            let code = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(lookup_error(format!("{}: {}", code, body), is_transient_status(code)));
        }

        let detail: ExecutionDetail = response
            .json()
            .await
            .map_err(|e| lookup_error(e.to_string(), false))?;

        detail
            .commit()
            .map(str::to_string)
            .ok_or_else(|| RelayError::MissingRevision(execution_id.to_string()))
    }
}
