//! # twodo-settings
//!
//! Layered configuration for Two-Do.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TwoDoSettings::default()`]
//! 2. **User file**: `~/.twodo/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `TWODO_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_dir, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<TwoDoSettings> = OnceLock::new();

/// The global settings instance.
///
/// Loaded on first call; falls back to compiled defaults if the settings file
/// cannot be read.
pub fn get_settings() -> &'static TwoDoSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: TwoDoSettings) -> std::result::Result<(), TwoDoSettings> {
    SETTINGS.set(settings)
}
