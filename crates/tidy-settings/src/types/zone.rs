use serde::{Deserialize, Serialize};
use tidy_core::personality::Personality;
use tidy_core::text::slug;

/// One monitored area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneSettings {
    pub name: String,
    pub camera_ref: String,
    pub task_list_ref: String,
    /// Score sensor entity; derived from the zone name when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_ref: Option<String>,
    /// Free-text description handed to the vision service.
    pub purpose: String,
    pub update_frequency_hours: u32,
    pub notifications_enabled: bool,
    /// Hub notify service, e.g. `notify.mobile_app_phone`.
    pub notification_channel: String,
    pub personality: String,
    pub notify_on_create: bool,
    pub notify_on_complete: bool,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            camera_ref: String::new(),
            task_list_ref: String::new(),
            sensor_ref: None,
            purpose: "Keep area clean".to_string(),
            update_frequency_hours: 24,
            notifications_enabled: false,
            notification_channel: String::new(),
            personality: "default".to_string(),
            notify_on_create: true,
            notify_on_complete: true,
        }
    }
}

impl ZoneSettings {
    pub fn sensor_ref(&self) -> String {
        self.sensor_ref
            .clone()
            .unwrap_or_else(|| format!("sensor.tidy_{}_score", slug(&self.name)))
    }

    pub fn personality(&self) -> Personality {
        Personality::resolve(&self.personality)
    }
}
