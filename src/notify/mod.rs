//! Failure notification channel
//!
//! One outbound topic per pipeline, subscribed to execution failures. Resource
//! names derive from the pipeline's unique id so that several instances of the
//! same pipeline never collide.

pub mod webhook;

pub use webhook::WebhookNotificationSink;

use crate::events::{EventPattern, PipelineState, StateChangeEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Longest resource name the event substrate accepts
pub const MAX_RESOURCE_NAME_LEN: usize = 64;

/// Derive `<pipeline>-<purpose>-<hash>` from the pipeline's unique id
pub fn resource_name(pipeline: &str, unique_id: &str, purpose: &str) -> String {
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, unique_id.as_bytes())
        .simple()
        .to_string();
    let suffix = format!("-{}-{}", purpose, &digest[..8]);
    let mut budget = MAX_RESOURCE_NAME_LEN.saturating_sub(suffix.len()).min(pipeline.len());
    while !pipeline.is_char_boundary(budget) {
        budget -= 1;
    }
    format!("{}{}", &pipeline[..budget], suffix)
}

/// Outbound notification destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTopic {
    pub name: String,
}

/// Subscription routing matching events to the topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSubscription {
    pub name: String,
    pub pattern: EventPattern,
    pub topic: String,
}

/// Topic plus its single failure subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotification {
    pub topic: NotificationTopic,
    pub subscription: FailureSubscription,
}

impl FailureNotification {
    pub fn new(pipeline: &str, unique_id: &str, topic_name: Option<&str>) -> Self {
        let topic = NotificationTopic {
            name: topic_name
                .map(str::to_string)
                .unwrap_or_else(|| resource_name(pipeline, unique_id, "notifications")),
        };
        let subscription = FailureSubscription {
            name: resource_name(pipeline, unique_id, "failed"),
            pattern: EventPattern::for_pipeline(pipeline, &[PipelineState::Failed]),
            topic: topic.name.clone(),
        };

        info!(
            "Failure notifications for '{}' go to topic '{}' via '{}'",
            pipeline, topic.name, subscription.name
        );
        Self { topic, subscription }
    }
}

/// Errors raised while delivering a failure message
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to publish to '{topic}': {message}")]
    Publish { topic: String, message: String },

    #[error("Failed to set up notification sink for '{url}': {message}")]
    Sink { url: String, message: String },
}

/// Message published for a failed execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMessage {
    pub topic: String,
    pub pipeline: String,
    pub execution_id: String,
    pub state: PipelineState,
    pub occurred_at: DateTime<Utc>,
}

/// Message channel the topic delivers to
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, message: &FailureMessage) -> Result<(), NotifyError>;
}

/// Forwards failure events that match the subscription to a sink
pub struct FailureForwarder<S> {
    subscription: FailureSubscription,
    sink: S,
}

impl<S: NotificationSink> FailureForwarder<S> {
    pub fn new(subscription: FailureSubscription, sink: S) -> Self {
        Self { subscription, sink }
    }

    /// Returns whether the event was forwarded
    pub async fn forward(&self, event: &StateChangeEvent) -> Result<bool, NotifyError> {
        if !self.subscription.pattern.matches(event) {
            debug!(
                "Subscription '{}' ignores {} for '{}'",
                self.subscription.name, event.state, event.pipeline
            );
            return Ok(false);
        }

        let message = FailureMessage {
            topic: self.subscription.topic.clone(),
            pipeline: event.pipeline.clone(),
            execution_id: event.execution_id.clone(),
            state: event.state,
            occurred_at: Utc::now(),
        };
        self.sink.publish(&message).await?;

        info!(
            "Forwarded failure of execution {} to '{}'",
            event.execution_id, self.subscription.topic
        );
        Ok(true)
    }
}
