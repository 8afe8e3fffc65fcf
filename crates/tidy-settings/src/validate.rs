use std::collections::{HashMap, HashSet};

use tidy_core::personality::Personality;
use tidy_core::text::slug;

use crate::errors::{Result, SettingsError};
use crate::types::TidySettings;

pub const MIN_UPDATE_FREQUENCY_HOURS: u32 = 1;
pub const MAX_UPDATE_FREQUENCY_HOURS: u32 = 168;

/// Check the loaded settings, collecting every violation before failing.
pub fn validate(settings: &TidySettings) -> Result<()> {
    let mut errors = Vec::new();

    if settings.hub.url.trim().is_empty() {
        errors.push("hub url is empty".to_string());
    }
    if settings.scheduler.tick_interval_secs == 0 {
        errors.push("scheduler tickIntervalSecs must be positive".to_string());
    }
    if settings.scheduler.call_timeout_secs == 0 {
        errors.push("scheduler callTimeoutSecs must be positive".to_string());
    }
    if settings.notifications.retry_count == 0 {
        errors.push("notifications retryCount must be at least 1".to_string());
    }
    let quiet = &settings.notifications.quiet_hours;
    if quiet.enabled && settings.notifications.quiet_window().is_none() {
        errors.push(format!(
            "notifications quietHours '{}'-'{}' must be HH:MM",
            quiet.start, quiet.end
        ));
    }

    let mut seen = HashSet::new();
    // Rule and state files are named by slug, so slugs must be unique too.
    let mut slugs: HashMap<String, &str> = HashMap::new();
    for (i, zone) in settings.zones.iter().enumerate() {
        let label = if zone.name.trim().is_empty() {
            errors.push(format!("zone #{i}: name is empty"));
            format!("zone #{i}")
        } else {
            if !seen.insert(zone.name.trim().to_lowercase()) {
                errors.push(format!("zone '{}': duplicate name", zone.name));
            } else if let Some(other) = slugs.insert(slug(&zone.name), &zone.name) {
                errors.push(format!(
                    "zone '{}': data file name '{}' collides with zone '{other}'",
                    zone.name,
                    slug(&zone.name)
                ));
            }
            format!("zone '{}'", zone.name)
        };

        if zone.camera_ref.trim().is_empty() {
            errors.push(format!("{label}: cameraRef is empty"));
        }
        if zone.task_list_ref.trim().is_empty() {
            errors.push(format!("{label}: taskListRef is empty"));
        }
        if !(MIN_UPDATE_FREQUENCY_HOURS..=MAX_UPDATE_FREQUENCY_HOURS)
            .contains(&zone.update_frequency_hours)
        {
            errors.push(format!(
                "{label}: updateFrequencyHours {} outside {MIN_UPDATE_FREQUENCY_HOURS}..={MAX_UPDATE_FREQUENCY_HOURS}",
                zone.update_frequency_hours
            ));
        }
        if Personality::from_name(&zone.personality).is_none() {
            let valid: Vec<_> = Personality::names().collect();
            errors.push(format!(
                "{label}: unknown personality '{}' (expected one of {})",
                zone.personality,
                valid.join(", ")
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SettingsError::Invalid(errors))
    }
}
