use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tidy_core::Priority;

/// Webhook body shape, chosen from the destination host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebhookDialect {
    /// Embed card with an integer color.
    Discord,
    /// Attachment with a named color.
    Slack,
    /// MessageCard with a hex theme color.
    Teams,
    Generic,
}

impl WebhookDialect {
    pub fn detect(url: &str) -> Self {
        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_default();

        if host.contains("discord") {
            Self::Discord
        } else if host.contains("slack") {
            Self::Slack
        } else if host.contains("teams") || host.ends_with("office.com") {
            Self::Teams
        } else {
            Self::Generic
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Slack => "slack",
            Self::Teams => "teams",
            Self::Generic => "generic",
        }
    }
}

fn discord_color(priority: Priority) -> u32 {
    match priority {
        Priority::Low => 0x00ff00,
        Priority::Normal => 0xffff00,
        Priority::High => 0xff0000,
    }
}

fn slack_color(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "good",
        Priority::Normal => "warning",
        Priority::High => "danger",
    }
}

fn teams_color(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "00ff00",
        Priority::Normal => "ffff00",
        Priority::High => "ff0000",
    }
}

pub fn build_payload(
    dialect: WebhookDialect,
    title: &str,
    message: &str,
    priority: Priority,
    at: DateTime<Utc>,
) -> Value {
    let footer = format!("Priority: {}", priority.as_str().to_uppercase());
    match dialect {
        WebhookDialect::Discord => json!({
            "embeds": [{
                "title": title,
                "description": message,
                "color": discord_color(priority),
                "timestamp": at.to_rfc3339(),
                "footer": { "text": footer }
            }]
        }),
        WebhookDialect::Slack => json!({
            "text": title,
            "attachments": [{
                "color": slack_color(priority),
                "text": message,
                "footer": footer,
                "ts": at.timestamp()
            }]
        }),
        WebhookDialect::Teams => json!({
            "@type": "MessageCard",
            "@context": "http://schema.org/extensions",
            "themeColor": teams_color(priority),
            "summary": title,
            "sections": [{
                "activityTitle": title,
                "activitySubtitle": footer,
                "text": message,
                "markdown": true
            }]
        }),
        WebhookDialect::Generic => json!({
            "message": message,
            "priority": priority.as_str(),
            "timestamp": at.to_rfc3339(),
            "source": "tidy"
        }),
    }
}
