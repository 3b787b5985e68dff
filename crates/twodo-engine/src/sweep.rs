//! Expiry sweep.
//!
//! Each overdue quest is expired in its own batch. A failure is recorded in
//! the report and the sweep moves on to the next quest.

use serde::Serialize;
use tracing::{info, instrument, warn};
use twodo_core::lifecycle::is_past_due;
use twodo_core::{DuoId, Quest, QuestId, QuestStatus, Result};

use crate::engine::ProgressionEngine;

/// A quest the sweep could not expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    /// Quest.
    pub quest_id: QuestId,
    /// Rendered error.
    pub error: String,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Quests expired, in sweep order.
    pub expired: Vec<QuestId>,
    /// Quests that failed to expire.
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    /// Whether nothing was attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.failed.is_empty()
    }
}

impl ProgressionEngine {
    /// Expire every active, past-due quest of the duo.
    ///
    /// # Errors
    ///
    /// Only when the quest list itself cannot be read.
    #[instrument(skip_all, fields(duo_id = %duo_id))]
    pub async fn expire_sweep(&self, duo_id: &DuoId) -> Result<SweepReport> {
        let quests = self.repo.list_quests(duo_id).await?;
        Ok(self.expire_quests(duo_id, &quests).await)
    }

    /// Expire the active, past-due entries of `quests`; the rest are skipped.
    pub async fn expire_quests(&self, duo_id: &DuoId, quests: &[Quest]) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();
        let overdue = quests.iter().filter(|q| {
            q.status == QuestStatus::Active && is_past_due(q.due_date, now, self.config.utc_offset)
        });
        for quest in overdue {
            match self.expire_loaded(duo_id, quest).await {
                Ok(()) => report.expired.push(quest.id.clone()),
                Err(err) => {
                    warn!(quest_id = %quest.id, error = %err, "failed to expire quest, continuing sweep");
                    report.failed.push(SweepFailure {
                        quest_id: quest.id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        if !report.is_empty() {
            info!(expired = report.expired.len(), failed = report.failed.len(), "expiry sweep finished");
        }
        report
    }
}
