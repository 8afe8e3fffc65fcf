//! Fan-out delivery with per-channel retry.
//!
//! Every configured channel is tried in parallel. A channel gets
//! `retry.attempts` tries with `base_delay * 2^attempt` sleeps in between
//! (never after the last). A send is successful when any channel succeeds.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tidy_core::gateway::HomeHub;
use tidy_core::{Priority, ServiceError};
use tracing::{debug, info, warn};

use crate::channel::{HubChannel, NotificationChannel, OutgoingMessage, WebhookChannel};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries per channel, including the first.
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Sleep after the zero-based `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Clone, Debug, Default)]
pub struct SenderConfig {
    pub webhook_url: Option<String>,
    /// Hub notify service, e.g. `notify.mobile_app_phone`.
    pub hub_service: Option<String>,
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

/// Snapshot of sender wiring for status reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SenderStatus {
    pub configured: bool,
    pub channels: Vec<String>,
    pub attempts: u32,
    pub timeout_secs: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sender
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct NotificationSender {
    channels: Vec<Arc<dyn NotificationChannel>>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Default for NotificationSender {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, RetryPolicy::default())
    }
}

impl NotificationSender {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            channels: Vec::new(),
            timeout,
            retry,
        }
    }

    /// Builds whichever channels the config names. An invalid webhook client
    /// is logged and skipped rather than failing construction.
    pub fn from_config(config: &SenderConfig, hub: Option<Arc<dyn HomeHub>>) -> Self {
        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let mut sender = Self::new(timeout, config.retry);

        if let Some(url) = config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
            match WebhookChannel::new(url.trim(), timeout) {
                Ok(channel) => {
                    debug!(dialect = channel.dialect().as_str(), "webhook channel configured");
                    sender = sender.with_channel(Arc::new(channel));
                }
                Err(e) => warn!(error = %e, "webhook channel disabled"),
            }
        }
        if let (Some(service), Some(hub)) = (
            config.hub_service.as_deref().filter(|s| !s.trim().is_empty()),
            hub,
        ) {
            sender = sender.with_channel(Arc::new(HubChannel::new(hub, service.trim())));
        }
        sender
    }

    #[must_use]
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.channels.is_empty()
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// True when at least one channel accepted the message.
    pub async fn send(&self, message: &OutgoingMessage) -> bool {
        if self.channels.is_empty() {
            debug!("no notification channels configured");
            return false;
        }
        let results = join_all(
            self.channels
                .iter()
                .map(|channel| self.deliver_with_retry(channel.as_ref(), message)),
        )
        .await;
        results.iter().any(Result::is_ok)
    }

    async fn deliver_with_retry(
        &self,
        channel: &dyn NotificationChannel,
        message: &OutgoingMessage,
    ) -> Result<(), ServiceError> {
        let attempts = self.retry.attempts.max(1);
        let mut last = ServiceError::Cancelled;
        for attempt in 0..attempts {
            let outcome = match tokio::time::timeout(self.timeout, channel.deliver(message)).await
            {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout(self.timeout)),
            };
            match outcome {
                Ok(()) => {
                    debug!(channel = channel.name(), attempt, "notification delivered");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        channel = channel.name(),
                        attempt = attempt + 1,
                        attempts,
                        error_kind = e.error_kind(),
                        error = %e,
                        "notification attempt failed"
                    );
                    last = e;
                }
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(self.retry.delay_for(attempt)).await;
            }
        }
        Err(last)
    }

    pub fn status(&self) -> SenderStatus {
        SenderStatus {
            configured: self.is_configured(),
            channels: self.channels.iter().map(|c| c.name().to_string()).collect(),
            attempts: self.retry.attempts,
            timeout_secs: self.timeout.as_secs(),
        }
    }

    /// One un-retried test message per channel, reported by channel name.
    pub async fn test_connection(&self) -> Vec<(String, Result<(), ServiceError>)> {
        let test_message = OutgoingMessage::new(
            "Tidy: connection test",
            "Notification channel is reachable.",
            Priority::Low,
        );
        let results = join_all(self.channels.iter().map(|channel| {
            let test_message = &test_message;
            async move {
                let delivery = channel.deliver(test_message);
                let result = match tokio::time::timeout(self.timeout, delivery).await {
                    Ok(r) => r,
                    Err(_) => Err(ServiceError::Timeout(self.timeout)),
                };
                (channel.name().to_string(), result)
            }
        }))
        .await;
        for (name, result) in &results {
            info!(channel = %name, ok = result.is_ok(), "notification channel tested");
        }
        results
    }
}
