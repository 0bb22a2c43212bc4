//! Test fakes for the relay collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use waveline::notify::{FailureMessage, NotificationSink, NotifyError};
use waveline::relay::{
    CommitStatus, ExecutionDetailResolver, RelayError, RelaySettings, RepositorySlug,
    RepositoryStatusClient, RetryPolicy, SecretStore,
};

/// Resolver with a fixed execution → commit table and optional leading failures
#[derive(Clone, Default)]
pub struct FakeResolver {
    commits: Arc<HashMap<String, String>>,
    failures_left: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl FakeResolver {
    pub fn new(commits: &[(&str, &str)]) -> Self {
        Self {
            commits: Arc::new(
                commits
                    .iter()
                    .map(|(e, c)| (e.to_string(), c.to_string()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    /// Fail the next `n` lookups with a transient error
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionDetailResolver for FakeResolver {
    async fn resolve_commit(&self, _pipeline: &str, execution_id: &str) -> Result<String, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(RelayError::Lookup {
                execution_id: execution_id.to_string(),
                message: "503 Service Unavailable".to_string(),
                transient: true,
            });
        }

        self.commits
            .get(execution_id)
            .cloned()
            .ok_or_else(|| RelayError::MissingRevision(execution_id.to_string()))
    }
}

/// Secret store whose value can be rotated between invocations
#[derive(Clone, Default)]
pub struct FakeSecretStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    reads: Arc<AtomicUsize>,
}

impl FakeSecretStore {
    pub fn with(name: &str, value: &str) -> Self {
        let store = Self::default();
        store.rotate(name, value);
        store
    }

    pub fn rotate(&self, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn fetch(&self, name: &str) -> Result<SecretString, RelayError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.values
            .lock()
            .unwrap()
            .get(name)
            .map(|v| SecretString::from(v.clone()))
            .ok_or_else(|| RelayError::Secret {
                name: name.to_string(),
                message: "parameter not found".to_string(),
            })
    }
}

/// A status as the repository received it
#[derive(Debug, Clone)]
pub struct ReceivedStatus {
    pub repository: String,
    pub token: String,
    pub status: CommitStatus,
}

/// Repository client that records reports; last write wins per commit and context
#[derive(Clone, Default)]
pub struct FakeRepository {
    received: Arc<Mutex<Vec<ReceivedStatus>>>,
    failures_left: Arc<AtomicUsize>,
    permanent_failure: bool,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `n` reports with a transient error
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Reject every report with a permanent error
    pub fn rejecting(mut self) -> Self {
        self.permanent_failure = true;
        self
    }

    pub fn received(&self) -> Vec<ReceivedStatus> {
        self.received.lock().unwrap().clone()
    }

    /// Visible status for a commit and context after all writes
    pub fn visible_status(&self, sha: &str, context: &str) -> Option<CommitStatus> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.status.sha == sha && r.status.context == context)
            .map(|r| r.status.clone())
    }
}

#[async_trait]
impl RepositoryStatusClient for FakeRepository {
    async fn report(
        &self,
        repository: &RepositorySlug,
        token: &SecretString,
        status: &CommitStatus,
    ) -> Result<(), RelayError> {
        if self.permanent_failure {
            return Err(RelayError::Delivery {
                sha: status.sha.clone(),
                message: "422 Unprocessable Entity".to_string(),
                transient: false,
            });
        }

        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(RelayError::Delivery {
                sha: status.sha.clone(),
                message: "502 Bad Gateway".to_string(),
                transient: true,
            });
        }

        self.received.lock().unwrap().push(ReceivedStatus {
            repository: repository.to_string(),
            token: token.expose_secret().to_string(),
            status: status.clone(),
        });
        Ok(())
    }
}

pub const PIPELINE: &str = "checkout";
pub const SECRET: &str = "/ci/github-token";

pub fn relay_settings(retry: RetryPolicy) -> RelaySettings {
    RelaySettings {
        pipeline: PIPELINE.to_string(),
        repository: "acme/checkout".parse().unwrap(),
        secret_parameter: SECRET.to_string(),
        context: "deploy/checkout".to_string(),
        target_url: None,
        retry,
    }
}

pub fn event_json(pipeline: &str, execution_id: &str, state: &str) -> String {
    format!(
        r#"{{
  "version": "0",
  "detail-type": "CodePipeline Pipeline Execution State Change",
  "source": "aws.codepipeline",
  "detail": {{
    "pipeline": "{}",
    "execution-id": "{}",
    "state": "{}",
    "version": 1
  }}
}}"#,
        pipeline, execution_id, state
    )
}

/// Notification sink that records messages, or rejects them all
#[derive(Clone, Default)]
pub struct FakeSink {
    messages: Arc<Mutex<Vec<FailureMessage>>>,
    rejecting: bool,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            rejecting: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<FailureMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for FakeSink {
    async fn publish(&self, message: &FailureMessage) -> Result<(), NotifyError> {
        if self.rejecting {
            return Err(NotifyError::Publish {
                topic: message.topic.clone(),
                message: "connection refused".to_string(),
            });
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}
