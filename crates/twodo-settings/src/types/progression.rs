use serde::{Deserialize, Serialize};

/// Progression settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionSettings {
    /// Fixed UTC offset, in minutes, that calendar days (lateness, expiry,
    /// streaks) are evaluated in.
    pub utc_offset_minutes: i32,
    /// How long before a due date the reminder fires.
    pub reminder_lead_minutes: u32,
    /// Extra attempts when a streak write loses a race.
    pub streak_cas_retries: u32,
    /// Run the expiry sweep when the CLI starts.
    pub sweep_on_startup: bool,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            reminder_lead_minutes: 60,
            streak_cas_retries: 3,
            sweep_on_startup: true,
        }
    }
}
