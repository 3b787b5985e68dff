//! Engine configuration derived from settings.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use twodo_core::lifecycle::calendar_day;
use twodo_core::{ProgressionError, Result};
use twodo_settings::ProgressionSettings;

/// Runtime knobs for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Offset calendar days are evaluated in.
    pub utc_offset: FixedOffset,
    /// Reminder lead before a due date.
    pub reminder_lead: Duration,
    /// Extra attempts for a streak write that lost a race.
    pub streak_cas_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            reminder_lead: Duration::minutes(60),
            streak_cas_retries: 3,
        }
    }
}

impl EngineConfig {
    /// Build from the `progression` settings section.
    pub fn from_settings(settings: &ProgressionSettings) -> Result<Self> {
        let utc_offset = FixedOffset::east_opt(settings.utc_offset_minutes * 60).ok_or_else(|| {
            ProgressionError::Validation(format!(
                "utc offset out of range: {} minutes",
                settings.utc_offset_minutes
            ))
        })?;
        Ok(Self {
            utc_offset,
            reminder_lead: Duration::minutes(i64::from(settings.reminder_lead_minutes)),
            streak_cas_retries: settings.streak_cas_retries,
        })
    }

    /// Calendar day of `now` in the configured offset.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        calendar_day(now, self.utc_offset)
    }
}
