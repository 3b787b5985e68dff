//! Progression events for the presentation layer.
//!
//! The engine emits one event per observable outcome, in the order the
//! outcomes were committed. Simultaneous achievement unlocks arrive as
//! separate events in catalog order, so a UI can show them one at a time.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;
use twodo_core::{DuoId, QuestId, UserId};

const DEFAULT_CAPACITY: usize = 256;

/// Something that happened to a duo's progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ProgressionEvent {
    /// A quest was created.
    QuestCreated {
        /// Duo.
        duo_id: DuoId,
        /// Quest.
        quest_id: QuestId,
        /// Owner.
        assigned_to: UserId,
    },
    /// A quest was completed.
    QuestCompleted {
        /// Duo.
        duo_id: DuoId,
        /// Quest.
        quest_id: QuestId,
        /// Owner who completed it.
        user_id: UserId,
        /// XP awarded.
        earned_xp: i64,
        /// Whether the completion was late.
        is_late: bool,
    },
    /// A completion was undone.
    QuestReverted {
        /// Duo.
        duo_id: DuoId,
        /// Quest.
        quest_id: QuestId,
        /// Owner.
        user_id: UserId,
        /// XP taken back.
        xp_removed: i64,
    },
    /// A quest expired unmet.
    QuestExpired {
        /// Duo.
        duo_id: DuoId,
        /// Quest.
        quest_id: QuestId,
        /// Owner charged the penalty.
        user_id: UserId,
        /// XP removed.
        penalty: i64,
    },
    /// A quest was soft-deleted.
    QuestDeleted {
        /// Duo.
        duo_id: DuoId,
        /// Quest.
        quest_id: QuestId,
    },
    /// A member's level went up.
    LevelUp {
        /// Duo.
        duo_id: DuoId,
        /// Member.
        user_id: UserId,
        /// Previous level.
        from: u32,
        /// New level.
        to: u32,
    },
    /// The shared streak moved.
    StreakAdvanced {
        /// Duo.
        duo_id: DuoId,
        /// New current streak.
        current_streak: u32,
        /// New best streak.
        best_streak: u32,
    },
    /// An achievement was unlocked.
    AchievementUnlocked {
        /// Duo.
        duo_id: DuoId,
        /// Catalog ID.
        achievement_id: String,
        /// Display name.
        name: String,
        /// Icon.
        icon: String,
    },
    /// A member sent affection.
    AffectionSent {
        /// Duo.
        duo_id: DuoId,
        /// Sender.
        sent_by: UserId,
    },
}

impl ProgressionEvent {
    /// Duo the event belongs to.
    #[must_use]
    pub fn duo_id(&self) -> &DuoId {
        match self {
            Self::QuestCreated { duo_id, .. }
            | Self::QuestCompleted { duo_id, .. }
            | Self::QuestReverted { duo_id, .. }
            | Self::QuestExpired { duo_id, .. }
            | Self::QuestDeleted { duo_id, .. }
            | Self::LevelUp { duo_id, .. }
            | Self::StreakAdvanced { duo_id, .. }
            | Self::AchievementUnlocked { duo_id, .. }
            | Self::AffectionSent { duo_id, .. } => duo_id,
        }
    }
}

/// Broadcast-based event emitter. `emit` never blocks; slow receivers lag.
pub struct EventEmitter {
    tx: broadcast::Sender<ProgressionEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Emitter with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Emitter with a custom capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Send to all subscribers; returns how many received it.
    pub fn emit(&self, event: ProgressionEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressionEvent> {
        self.tx.subscribe()
    }

    /// Total events emitted.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
