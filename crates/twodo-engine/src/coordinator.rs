//! Progression coordinator.
//!
//! Every XP-moving action commits one primary batch: a status precondition on
//! the quest, the quest fields, and commutative increments on the owner's
//! user record and duo mirror. Secondary steps follow against the new state
//! and are individually idempotent:
//!
//! - **level sync**: rewrite `level` where it no longer equals `level_of(xp)`
//! - **streak**: compare-and-swap on `lastStreakDate`, retried on conflict
//! - **achievements**: set-union of newly satisfied IDs
//!
//! Undo and expiry only run level sync; achievements are never revoked and
//! streaks are not corrected.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};
use twodo_core::achievements::Achievement;
use twodo_core::lifecycle::{self, Transition};
use twodo_core::{
    DuoId, ProgressionError, ProgressionSnapshot, Quest, QuestId, QuestStatus, Result, StreakState, UserId,
    advance_streak, check_new_achievements, field, level_of, missed_penalty,
};
use twodo_store::{DocKey, StoreError, WriteOp};

use crate::engine::ProgressionEngine;
use crate::events::ProgressionEvent;

/// A level correction written by level sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelChange {
    /// Member whose level changed.
    pub user_id: UserId,
    /// Stored level before.
    pub from: u32,
    /// Level now stored.
    pub to: u32,
}

/// Result of a completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    /// Quest completed.
    pub quest_id: QuestId,
    /// XP awarded.
    pub earned_xp: i64,
    /// Whether the completion was late.
    pub is_late: bool,
    /// Shared streak after the completion; `None` if the streak write was dropped.
    pub new_streak: Option<u32>,
    /// Level correction, if the award crossed a threshold.
    pub level_change: Option<LevelChange>,
    /// Achievements unlocked by this completion, in catalog order.
    pub unlocked: Vec<&'static Achievement>,
}

/// Primary batch for a transition of `quest`.
///
/// Leaving `active` also clears the stored reminder handle.
pub(crate) fn transition_ops(duo_id: &DuoId, quest: &Quest, t: &Transition) -> Result<Vec<WriteOp>> {
    let quest_key = DocKey::quest(duo_id, &t.quest_id);
    let mut fields: Vec<(String, Value)> = vec![
        (field::STATUS.into(), json!(t.to.as_str())),
        (field::EARNED_XP.into(), json!(t.earned_xp)),
        (field::COMPLETED_AT.into(), serde_json::to_value(t.completed_at)?),
    ];
    if quest.reminder_id.is_some() && t.from == QuestStatus::Active {
        fields.push((field::REMINDER_ID.into(), Value::Null));
    }
    let mut ops = vec![
        WriteOp::precondition(quest_key.clone(), field::STATUS, json!(t.from.as_str())),
        WriteOp::Update {
            key: quest_key,
            fields,
        },
    ];

    let user_key = DocKey::user(&t.owner);
    let duo_key = DocKey::duo(duo_id);
    let deltas = [(field::XP, t.xp_delta), (field::QUESTS_COMPLETED, t.completed_delta)];
    for (name, delta) in deltas.into_iter().filter(|(_, d)| *d != 0) {
        ops.push(WriteOp::increment(user_key.clone(), name, delta));
        ops.push(WriteOp::increment(
            duo_key.clone(),
            field::member(&t.owner, name),
            delta,
        ));
    }
    Ok(ops)
}

impl ProgressionEngine {
    /// Complete an active quest as its owner.
    ///
    /// The XP award is durable once this returns `Ok`; streak, level and
    /// achievement bookkeeping after it is best-effort.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when the quest is not active or `actor` is not the
    /// owner; `Conflict` when the quest changed status concurrently; store
    /// errors from the primary batch.
    #[instrument(skip_all, fields(duo_id = %duo_id, quest_id = %quest_id, user_id = %actor))]
    pub async fn complete_quest(
        &self,
        duo_id: &DuoId,
        quest_id: &QuestId,
        actor: &UserId,
    ) -> Result<CompletionOutcome> {
        let quest = self.repo.require_quest(duo_id, quest_id).await?;
        let now = self.clock.now();
        let t = lifecycle::complete(&quest, actor, now, self.config.utc_offset)?;

        self.store.commit_batch(transition_ops(duo_id, &quest, &t)?).await?;
        info!(earned_xp = t.earned_xp, is_late = t.is_late, "quest completed");
        self.emit(ProgressionEvent::QuestCompleted {
            duo_id: duo_id.clone(),
            quest_id: quest_id.clone(),
            user_id: actor.clone(),
            earned_xp: t.earned_xp,
            is_late: t.is_late,
        });

        self.cancel_reminder(&quest).await;
        let level_change = self
            .secondary("level_sync", self.sync_level(duo_id, actor).await)
            .flatten();
        let today = self.config.today(now);
        let streak = self.secondary("streak", self.compute_streak(duo_id, today).await);
        let unlocked = self
            .secondary("achievements", self.evaluate_for(duo_id, actor, now).await)
            .unwrap_or_default();

        Ok(CompletionOutcome {
            quest_id: quest_id.clone(),
            earned_xp: t.earned_xp,
            is_late: t.is_late,
            new_streak: streak.map(|s| s.current_streak),
            level_change,
            unlocked,
        })
    }

    /// Undo a completion as the owner, removing exactly the recorded award.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when the quest is not completed or `actor` is not
    /// the owner; store errors from the primary batch.
    #[instrument(skip_all, fields(duo_id = %duo_id, quest_id = %quest_id, user_id = %actor))]
    pub async fn undo_quest(&self, duo_id: &DuoId, quest_id: &QuestId, actor: &UserId) -> Result<()> {
        let quest = self.repo.require_quest(duo_id, quest_id).await?;
        let t = lifecycle::undo(&quest, actor)?;
        self.store.commit_batch(transition_ops(duo_id, &quest, &t)?).await?;
        info!(xp_removed = quest.earned_xp, "quest completion undone");
        self.emit(ProgressionEvent::QuestReverted {
            duo_id: duo_id.clone(),
            quest_id: quest_id.clone(),
            user_id: actor.clone(),
            xp_removed: quest.earned_xp,
        });

        let _ = self.secondary("level_sync", self.sync_level(duo_id, actor).await);
        let mut reopened = quest;
        t.apply(&mut reopened);
        let _ = self.secondary("reminder", self.schedule_reminder(duo_id, &reopened).await);
        Ok(())
    }

    /// Expire an overdue active quest and charge the missed penalty.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the quest is active and past its due day.
    #[instrument(skip_all, fields(duo_id = %duo_id, quest_id = %quest_id))]
    pub async fn expire_quest(&self, duo_id: &DuoId, quest_id: &QuestId) -> Result<()> {
        let quest = self.repo.require_quest(duo_id, quest_id).await?;
        self.expire_loaded(duo_id, &quest).await
    }

    pub(crate) async fn expire_loaded(&self, duo_id: &DuoId, quest: &Quest) -> Result<()> {
        let t = lifecycle::expire(quest, self.clock.now(), self.config.utc_offset)?;
        self.store.commit_batch(transition_ops(duo_id, quest, &t)?).await?;
        info!(quest_id = %quest.id, owner = %t.owner, penalty = missed_penalty(), "quest expired");
        self.emit(ProgressionEvent::QuestExpired {
            duo_id: duo_id.clone(),
            quest_id: quest.id.clone(),
            user_id: t.owner.clone(),
            penalty: missed_penalty(),
        });

        self.cancel_reminder(quest).await;
        let _ = self.secondary("level_sync", self.sync_level(duo_id, &t.owner).await);
        Ok(())
    }

    /// Advance the duo's shared streak for a completion on `today`.
    ///
    /// At most one advance per calendar day. The write is guarded by a
    /// precondition on `lastStreakDate`; on conflict the duo is re-read and
    /// the streak recomputed, up to the configured number of retries.
    ///
    /// # Errors
    ///
    /// `Conflict` when every attempt lost a race; `NotFound` for an unknown duo.
    pub async fn compute_streak(&self, duo_id: &DuoId, today: NaiveDate) -> Result<StreakState> {
        let key = DocKey::duo(duo_id);
        for attempt in 0..=self.config.streak_cas_retries {
            let prior = self.repo.require_duo(duo_id).await?.streak_state();
            let next = advance_streak(today, &prior);
            if next == prior {
                return Ok(next);
            }

            let ops = vec![
                WriteOp::precondition(key.clone(), field::LAST_STREAK_DATE, serde_json::to_value(prior.last_streak_date)?),
                WriteOp::Update {
                    key: key.clone(),
                    fields: vec![
                        (field::CURRENT_STREAK.into(), json!(next.current_streak)),
                        (field::BEST_STREAK.into(), json!(next.best_streak)),
                        (field::LAST_STREAK_DATE.into(), serde_json::to_value(next.last_streak_date)?),
                    ],
                },
            ];
            match self.store.commit_batch(ops).await {
                Ok(()) => {
                    info!(duo_id = %duo_id, current = next.current_streak, best = next.best_streak, "streak advanced");
                    self.emit(ProgressionEvent::StreakAdvanced {
                        duo_id: duo_id.clone(),
                        current_streak: next.current_streak,
                        best_streak: next.best_streak,
                    });
                    return Ok(next);
                }
                Err(StoreError::PreconditionFailed { .. }) => {
                    debug!(duo_id = %duo_id, attempt, "streak write lost a race, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ProgressionError::Conflict(format!(
            "streak for duo {duo_id} kept changing after {} retries",
            self.config.streak_cas_retries
        )))
    }

    /// Unlock every achievement `snapshot` newly satisfies for the duo.
    ///
    /// Returns the newly unlocked entries in catalog order; calling again
    /// with the same snapshot returns nothing.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown duo; store errors from the union write.
    pub async fn check_achievements(
        &self,
        duo_id: &DuoId,
        snapshot: &ProgressionSnapshot,
    ) -> Result<Vec<&'static Achievement>> {
        let duo = self.repo.require_duo(duo_id).await?;
        let fresh = check_new_achievements(snapshot, &duo.unlocked_achievements);
        if fresh.is_empty() {
            return Ok(fresh);
        }

        self.store
            .commit_batch(vec![WriteOp::ArrayUnion {
                key: DocKey::duo(duo_id),
                field: field::UNLOCKED_ACHIEVEMENTS.into(),
                values: fresh.iter().map(|a| json!(a.id)).collect(),
            }])
            .await?;

        for achievement in &fresh {
            info!(duo_id = %duo_id, achievement = achievement.id, "achievement unlocked");
            self.emit(ProgressionEvent::AchievementUnlocked {
                duo_id: duo_id.clone(),
                achievement_id: achievement.id.to_string(),
                name: achievement.name.to_string(),
                icon: achievement.icon.to_string(),
            });
        }
        Ok(fresh)
    }

    /// Re-read the duo and evaluate achievements for `member`.
    pub(crate) async fn evaluate_for(
        &self,
        duo_id: &DuoId,
        member: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<&'static Achievement>> {
        let duo = self.repo.require_duo(duo_id).await?;
        let snapshot = ProgressionSnapshot::for_member(&duo, member, now);
        self.check_achievements(duo_id, &snapshot).await
    }

    /// Rewrite the stored level of `user` (record and duo mirror) when it no
    /// longer matches their XP. Emits `LevelUp` when it rose.
    ///
    /// The write is guarded by preconditions on the XP it was derived from,
    /// so a concurrent XP change forces a re-read instead of storing a stale
    /// level.
    pub(crate) async fn sync_level(&self, duo_id: &DuoId, user: &UserId) -> Result<Option<LevelChange>> {
        for attempt in 0..=self.config.streak_cas_retries {
            let profile = self.repo.require_user(user).await?;
            let duo = self.repo.require_duo(duo_id).await?;
            let Some(mirror) = duo.member(user) else {
                return Err(ProgressionError::Validation(format!("user {user} is not a member of duo {duo_id}")));
            };
            let expected = level_of(profile.xp);
            if profile.level == expected && mirror.level == expected {
                return Ok(None);
            }

            let ops = vec![
                WriteOp::precondition(DocKey::user(user), field::XP, json!(profile.xp)),
                WriteOp::precondition(DocKey::duo(duo_id), field::member(user, field::XP), json!(mirror.xp)),
                WriteOp::update_field(DocKey::user(user), field::LEVEL, json!(expected)),
                WriteOp::update_field(DocKey::duo(duo_id), field::member(user, field::LEVEL), json!(expected)),
            ];
            match self.store.commit_batch(ops).await {
                Ok(()) => return Ok(Some(self.level_changed(duo_id, user, profile.level, expected))),
                Err(StoreError::PreconditionFailed { .. }) => {
                    debug!(user_id = %user, attempt, "level write lost a race, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ProgressionError::Conflict(format!(
            "xp of {user} kept changing after {} retries",
            self.config.streak_cas_retries
        )))
    }

    fn level_changed(&self, duo_id: &DuoId, user: &UserId, from: u32, to: u32) -> LevelChange {
        if to > from {
            info!(user_id = %user, from, to, "level up");
            self.emit(ProgressionEvent::LevelUp {
                duo_id: duo_id.clone(),
                user_id: user.clone(),
                from,
                to,
            });
        } else {
            debug!(user_id = %user, from, to, "level corrected");
        }
        LevelChange {
            user_id: user.clone(),
            from,
            to,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
