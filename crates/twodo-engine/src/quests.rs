//! Quest creation, edits, deletion and queries.

use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use twodo_core::lifecycle;
use twodo_core::{
    DuoId, ProgressionError, Quest, QuestCreateParams, QuestId, QuestStatus, QuestUpdateParams,
    Result, UserId, field,
};
use twodo_store::{DocKey, WriteOp};

use crate::coordinator::transition_ops;
use crate::engine::ProgressionEngine;
use crate::events::ProgressionEvent;
use crate::reminders::reminder_for;

/// Narrows [`ProgressionEngine::list_quests`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestFilter {
    /// Only quests owned by this member.
    pub assigned_to: Option<UserId>,
    /// Only quests in this status.
    pub status: Option<QuestStatus>,
    /// Only quests in this category; `"all"` matches every category.
    pub category_id: Option<String>,
}

impl QuestFilter {
    /// Whether `quest` passes every set criterion.
    #[must_use]
    pub fn matches(&self, quest: &Quest) -> bool {
        self.assigned_to.as_ref().is_none_or(|u| &quest.assigned_to == u)
            && self.status.is_none_or(|s| quest.status == s)
            && self
                .category_id
                .as_deref()
                .is_none_or(|c| c == "all" || quest.category_id == c)
    }
}

impl ProgressionEngine {
    /// Create an active quest in `duo_id`.
    ///
    /// Owner and creator must both be members. A due reminder is scheduled
    /// when the quest has a due date far enough ahead.
    ///
    /// # Errors
    ///
    /// `Validation` for bad input or non-members; `NotFound` for an unknown duo.
    #[instrument(skip_all, fields(duo_id = %duo_id))]
    pub async fn create_quest(&self, duo_id: &DuoId, params: QuestCreateParams) -> Result<QuestId> {
        let duo = self.repo.require_duo(duo_id).await?;
        for (role, member) in [("owner", &params.assigned_to), ("creator", &params.created_by)] {
            match member {
                Some(user) if !duo.is_member(user) => {
                    return Err(ProgressionError::Validation(format!(
                        "quest {role} {user} is not a member of duo {duo_id}"
                    )));
                }
                _ => {}
            }
        }

        let quest = lifecycle::create(params, QuestId::generate(), self.clock.now())?;
        self.store
            .commit_batch(vec![WriteOp::set(DocKey::quest(duo_id, &quest.id), &quest)?])
            .await?;
        info!(quest_id = %quest.id, assigned_to = %quest.assigned_to, priority = %quest.priority, "quest created");
        self.emit(ProgressionEvent::QuestCreated {
            duo_id: duo_id.clone(),
            quest_id: quest.id.clone(),
            assigned_to: quest.assigned_to.clone(),
        });

        let _ = self.secondary("reminder", self.schedule_reminder(duo_id, &quest).await);
        Ok(quest.id)
    }

    /// Edit an active quest. A changed due date moves its reminder.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless active; `Validation` for an empty title;
    /// `Conflict` if the quest left `active` concurrently.
    #[instrument(skip_all, fields(duo_id = %duo_id, quest_id = %quest_id))]
    pub async fn update_quest(
        &self,
        duo_id: &DuoId,
        quest_id: &QuestId,
        params: QuestUpdateParams,
    ) -> Result<Quest> {
        let quest = self.repo.require_quest(duo_id, quest_id).await?;
        let mut edited = lifecycle::edit(&quest, params)?;
        let key = DocKey::quest(duo_id, quest_id);
        let due_changed = edited.due_date != quest.due_date;

        let mut fields = vec![
            ("title".to_string(), json!(edited.title)),
            ("description".to_string(), json!(edited.description)),
            ("categoryId".to_string(), json!(edited.category_id)),
            ("priority".to_string(), json!(edited.priority.as_str())),
            ("baseXp".to_string(), json!(edited.base_xp)),
            ("dueDate".to_string(), serde_json::to_value(edited.due_date)?),
        ];
        if due_changed && quest.reminder_id.is_some() {
            fields.push((field::REMINDER_ID.to_string(), Value::Null));
            edited.reminder_id = None;
        }
        self.store
            .commit_batch(vec![
                WriteOp::precondition(key.clone(), field::STATUS, json!(QuestStatus::Active.as_str())),
                WriteOp::Update { key, fields },
            ])
            .await?;
        info!(due_changed, "quest updated");

        if due_changed {
            self.cancel_reminder(&quest).await;
            if let Some(handle) = self
                .secondary("reminder", self.schedule_reminder(duo_id, &edited).await)
                .flatten()
            {
                edited.reminder_id = Some(handle);
            }
        }
        Ok(edited)
    }

    /// Soft-delete an active or completed quest. Awarded XP is kept.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` for expired or deleted quests.
    #[instrument(skip_all, fields(duo_id = %duo_id, quest_id = %quest_id))]
    pub async fn soft_delete_quest(&self, duo_id: &DuoId, quest_id: &QuestId) -> Result<()> {
        let quest = self.repo.require_quest(duo_id, quest_id).await?;
        let t = lifecycle::soft_delete(&quest)?;
        self.store.commit_batch(transition_ops(duo_id, &quest, &t)?).await?;
        info!(from = %t.from, kept_xp = t.earned_xp, "quest deleted");
        self.emit(ProgressionEvent::QuestDeleted {
            duo_id: duo_id.clone(),
            quest_id: quest_id.clone(),
        });
        self.cancel_reminder(&quest).await;
        Ok(())
    }

    /// A single quest.
    ///
    /// # Errors
    ///
    /// `NotFound` when absent.
    pub async fn get_quest(&self, duo_id: &DuoId, quest_id: &QuestId) -> Result<Quest> {
        self.repo.require_quest(duo_id, quest_id).await
    }

    /// Quests of a duo matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Store or decoding failures.
    pub async fn list_quests(&self, duo_id: &DuoId, filter: &QuestFilter) -> Result<Vec<Quest>> {
        let mut quests: Vec<Quest> = self
            .repo
            .list_quests(duo_id)
            .await?
            .into_iter()
            .filter(|q| filter.matches(q))
            .collect();
        quests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(quests)
    }

    /// Schedule the due reminder for an active quest and store its handle.
    ///
    /// Returns the handle, or `None` when no reminder applies. If the handle
    /// cannot be stored the reminder is cancelled again.
    pub(crate) async fn schedule_reminder(&self, duo_id: &DuoId, quest: &Quest) -> Result<Option<String>> {
        if quest.status != QuestStatus::Active {
            return Ok(None);
        }
        let Some(reminder) = reminder_for(quest, self.config.reminder_lead, self.clock.now()) else {
            return Ok(None);
        };
        let handle = self
            .scheduler
            .schedule(&reminder)
            .await
            .map_err(|e| ProgressionError::StoreUnavailable(e.to_string()))?;
        let stored = self
            .store
            .commit_batch(vec![WriteOp::update_field(
                DocKey::quest(duo_id, &quest.id),
                field::REMINDER_ID,
                json!(handle),
            )])
            .await;
        if let Err(err) = stored {
            if let Err(cancel) = self.scheduler.cancel(&handle).await {
                warn!(quest_id = %quest.id, handle, error = %cancel, "failed to cancel orphaned reminder");
            }
            return Err(err.into());
        }
        info!(quest_id = %quest.id, handle, fire_at = %reminder.fire_at, "reminder scheduled");
        Ok(Some(handle))
    }

    /// Cancel the quest's reminder, if one was scheduled. Failures are logged.
    pub(crate) async fn cancel_reminder(&self, quest: &Quest) {
        let Some(handle) = quest.reminder_id.as_deref() else {
            return;
        };
        if let Err(err) = self.scheduler.cancel(handle).await {
            warn!(quest_id = %quest.id, handle, error = %err, "failed to cancel reminder");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
