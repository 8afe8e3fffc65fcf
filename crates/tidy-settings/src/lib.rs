//! # tidy-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TidySettings::default()`]
//! 2. **User file**: `~/.tidy/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TIDY_*` overrides (highest priority)
//!
//! [`validate`] then rejects configurations the pipeline cannot run with.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;
pub mod validate;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
pub use validate::validate;
