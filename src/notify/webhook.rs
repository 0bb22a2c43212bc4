//! Webhook-backed notification sink

use crate::notify::{FailureMessage, NotificationSink, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Posts failure messages as JSON to a chat or incident webhook
#[derive(Debug, Clone)]
pub struct WebhookNotificationSink {
    client: Client,
    url: String,
}

impl WebhookNotificationSink {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let url = url.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Sink {
                url: url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn publish(&self, message: &FailureMessage) -> Result<(), NotifyError> {
        debug!("POST {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| NotifyError::Publish {
                topic: message.topic.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Webhook rejected failure message: {} - {}", status, body);
            return Err(NotifyError::Publish {
                topic: message.topic.clone(),
                message: format!("{}: {}", status, body),
            });
        }

        Ok(())
    }
}
