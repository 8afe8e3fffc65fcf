use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tidy_core::gateway::HomeHub;
use tidy_core::{Priority, ServiceError};

use crate::payload::{build_payload, WebhookDialect};

/// A fully formatted notification, ready for any channel.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingMessage {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl OutgoingMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            priority,
            created_at: Utc::now(),
        }
    }
}

/// One delivery destination. A single call is one attempt; retry lives in
/// the sender.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, message: &OutgoingMessage) -> Result<(), ServiceError>;
}

const ACCEPTED: [u16; 4] = [200, 201, 202, 204];

pub struct WebhookChannel {
    client: Client,
    url: String,
    dialect: WebhookDialect,
    timeout: Duration,
}

impl WebhookChannel {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Unreachable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
            dialect: WebhookDialect::detect(url),
            timeout,
        })
    }

    pub fn dialect(&self) -> WebhookDialect {
        self.dialect
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, message: &OutgoingMessage) -> Result<(), ServiceError> {
        let payload = build_payload(
            self.dialect,
            &message.title,
            &message.body,
            message.priority,
            message.created_at,
        );
        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(self.timeout)
                } else {
                    ServiceError::Unreachable(e.to_string())
                }
            })?;

        let status = resp.status().as_u16();
        if ACCEPTED.contains(&status) {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ServiceError::from_status(status, body))
        }
    }
}

/// Hub-native `notify.*` service.
pub struct HubChannel {
    hub: Arc<dyn HomeHub>,
    service: String,
}

impl HubChannel {
    pub fn new(hub: Arc<dyn HomeHub>, service: impl Into<String>) -> Self {
        Self {
            hub,
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl NotificationChannel for HubChannel {
    fn name(&self) -> &str {
        "hub"
    }

    async fn deliver(&self, message: &OutgoingMessage) -> Result<(), ServiceError> {
        self.hub
            .send_notification(&self.service, &message.title, &message.body)
            .await
    }
}
