//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values, so a partial JSON file only needs the
//! keys it changes.

mod zone;

pub use zone::*;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tidy_core::notification::QuietHours;

/// Root settings type.
///
/// ```json
/// {
///   "hub": { "url": "http://homeassistant.local:8123" },
///   "zones": [{ "name": "Kitchen", "cameraRef": "camera.kitchen", "taskListRef": "todo.kitchen" }]
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TidySettings {
    pub hub: HubSettings,
    pub vision: VisionSettings,
    pub notifications: NotificationSettings,
    pub scheduler: SchedulerSettings,
    pub logging: LoggingSettings,
    /// Directory for rule and zone-state files. A leading `~/` expands to `$HOME`.
    pub data_dir: String,
    pub zones: Vec<ZoneSettings>,
}

impl Default for TidySettings {
    fn default() -> Self {
        Self {
            hub: HubSettings::default(),
            vision: VisionSettings::default(),
            notifications: NotificationSettings::default(),
            scheduler: SchedulerSettings::default(),
            logging: LoggingSettings::default(),
            data_dir: "~/.tidy".to_string(),
            zones: Vec::new(),
        }
    }
}

impl TidySettings {
    pub fn data_dir_path(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }

    pub fn zone(&self, name: &str) -> Option<&ZoneSettings> {
        self.zones.iter().find(|z| z.name == name)
    }
}

pub(crate) fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        home_dir()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Home-automation hub connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    pub url: String,
    /// Long-lived access token. Empty means unauthenticated.
    pub token: String,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            url: "http://supervisor/core".to_string(),
            token: String::new(),
        }
    }
}

/// Image-understanding service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisionSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: String::new(),
        }
    }
}

/// Delivery channels shared by every zone.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Fallback hub notify service for zones that do not name their own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_notification_channel: Option<String>,
    pub timeout_seconds: u64,
    pub retry_count: u32,
    pub quiet_hours: QuietHoursSettings,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            hub_notification_channel: None,
            timeout_seconds: 10,
            retry_count: 3,
            quiet_hours: QuietHoursSettings::default(),
        }
    }
}

impl NotificationSettings {
    /// The active quiet window, if enabled and well-formed.
    pub fn quiet_window(&self) -> Option<QuietHours> {
        if !self.quiet_hours.enabled {
            return None;
        }
        QuietHours::parse(&self.quiet_hours.start, &self.quiet_hours.end)
    }
}

/// Local-time window (`HH:MM`) in which routine notifications are held back.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuietHoursSettings {
    pub enabled: bool,
    pub start: String,
    pub end: String,
}

impl Default for QuietHoursSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "22:00".to_string(),
            end: "07:00".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    /// How often the orchestrator checks which zones are due.
    pub tick_interval_secs: u64,
    /// Upper bound on any single external call.
    pub call_timeout_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            call_timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    /// Persist WARN and above to `<dataDir>/logs.db`.
    pub log_to_sqlite: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
            log_to_sqlite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = TidySettings::default();
        assert_eq!(s.notifications.timeout_seconds, 10);
        assert_eq!(s.notifications.retry_count, 3);
        assert_eq!(s.scheduler.tick_interval_secs, 60);
        assert_eq!(s.scheduler.call_timeout_secs, 10);
        assert_eq!(s.logging.level, "info");
        assert!(s.zones.is_empty());
        assert!(s.notifications.quiet_window().is_none());
    }

    #[test]
    fn quiet_window_when_enabled() {
        let mut n = NotificationSettings::default();
        n.quiet_hours.enabled = true;
        let window = n.quiet_window().unwrap();
        assert_eq!(window, QuietHours::parse("22:00", "07:00").unwrap());

        n.quiet_hours.end = "7am".into();
        assert!(n.quiet_window().is_none());
    }

    #[test]
    fn camel_case_wire_format() {
        let json = serde_json::to_value(TidySettings::default()).unwrap();
        assert!(json["notifications"]["retryCount"].is_number());
        assert!(json["scheduler"]["tickIntervalSecs"].is_number());
        assert!(json["dataDir"].is_string());
        assert!(json["notifications"].get("webhookUrl").is_none());
    }

    #[test]
    fn absolute_data_dir_is_kept() {
        let s = TidySettings {
            data_dir: "/var/lib/tidy".to_string(),
            ..Default::default()
        };
        assert_eq!(s.data_dir_path(), PathBuf::from("/var/lib/tidy"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let path = expand_home("~/.tidy");
        assert!(path.ends_with(".tidy"));
        assert!(!path.to_string_lossy().starts_with('~'));
    }
}
