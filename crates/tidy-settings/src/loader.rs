//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TidySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{home_dir, TidySettings};

/// Default settings file (`~/.tidy/settings.json`).
pub fn settings_path() -> PathBuf {
    home_dir().join(".tidy").join("settings.json")
}

pub fn load_settings() -> Result<TidySettings> {
    load_settings_from_path(&settings_path())
}

/// Load from a specific file with env overrides. A missing file yields
/// defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<TidySettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<TidySettings> {
    let defaults = serde_json::to_value(TidySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

pub fn apply_env_overrides(settings: &mut TidySettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source. Empty values are
/// treated as unset; out-of-range numbers are ignored with a warning.
pub fn apply_overrides_from<F>(settings: &mut TidySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = string("TIDY_HUB_URL") {
        settings.hub.url = v;
    }
    if let Some(v) = string("TIDY_HUB_TOKEN").or_else(|| string("SUPERVISOR_TOKEN")) {
        settings.hub.token = v;
    }
    if let Some(v) = string("TIDY_VISION_API_KEY").or_else(|| string("GEMINI_API_KEY")) {
        settings.vision.api_key = v;
    }
    if let Some(v) = string("TIDY_WEBHOOK_URL") {
        settings.notifications.webhook_url = Some(v);
    }
    if let Some(v) = string("TIDY_DATA_DIR") {
        settings.data_dir = v;
    }
    if let Some(v) = string("TIDY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(raw) = string("TIDY_TICK_INTERVAL_SECS") {
        match parse_u64_range(&raw, 1, 3600) {
            Some(v) => settings.scheduler.tick_interval_secs = v,
            None => {
                tracing::warn!(
                    key = "TIDY_TICK_INTERVAL_SECS",
                    value = %raw,
                    "invalid u64 env var, ignoring"
                );
            }
        }
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
