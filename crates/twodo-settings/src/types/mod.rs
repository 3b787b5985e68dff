//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial settings file only needs the keys it changes.

mod logging;
mod progression;
mod store;

pub use logging::*;
pub use progression::*;
pub use store::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "store": { "dbPath": "/var/lib/twodo/twodo.db" },
///   "progression": { "utcOffsetMinutes": -300 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwoDoSettings {
    /// Settings schema version.
    pub version: String,
    /// Document database.
    pub store: StoreSettings,
    /// Progression rules that vary per deployment.
    pub progression: ProgressionSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl Default for TwoDoSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            store: StoreSettings::default(),
            progression: ProgressionSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl TwoDoSettings {
    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<()> {
        if self.progression.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(SettingsError::InvalidValue(format!(
                "progression.utcOffsetMinutes must be within ±1439, got {}",
                self.progression.utc_offset_minutes
            )));
        }
        if self.store.pool_size == 0 {
            return Err(SettingsError::InvalidValue("store.poolSize must be at least 1".into()));
        }
        Ok(())
    }
}
