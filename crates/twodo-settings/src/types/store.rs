use serde::{Deserialize, Serialize};

/// Document database settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Database file. Empty means `~/.twodo/twodo.db`.
    pub db_path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// `SQLite` busy timeout.
    pub busy_timeout_ms: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: String::new(),
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}
