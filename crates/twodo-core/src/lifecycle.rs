//! Quest lifecycle state machine.
//!
//! ```text
//!   active ──complete(owner)──▶ completed
//!   completed ──undo(owner)───▶ active
//!   active ──expire(past due)─▶ expired     (terminal)
//!   active | completed ─delete▶ deleted     (terminal)
//! ```
//!
//! Every check runs before any write: the functions here only inspect a
//! [`Quest`] and describe the outcome as a [`Transition`]. Applying the
//! transition to the stored records is the coordinator's job.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::errors::{ProgressionError, Result};
use crate::ids::{QuestId, UserId};
use crate::types::{Quest, QuestCreateParams, QuestPriority, QuestRecurring, QuestStatus, QuestUpdateParams, RecurringType};
use crate::xp::{base_xp_for, earned_xp_for, missed_penalty};

/// Actions that move a quest between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestAction {
    /// Owner marks the quest done.
    Complete,
    /// Owner reverts a completion.
    Undo,
    /// Sweep expires an overdue quest.
    Expire,
    /// Soft deletion.
    Delete,
    /// Field edit of an active quest.
    Edit,
}

impl QuestAction {
    /// Verb used in messages and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Undo => "undo",
            Self::Expire => "expire",
            Self::Delete => "delete",
            Self::Edit => "edit",
        }
    }
}

impl std::fmt::Display for QuestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated status change and its effect on the owner's aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Quest being transitioned.
    pub quest_id: QuestId,
    /// Action that produced it.
    pub action: QuestAction,
    /// Status before.
    pub from: QuestStatus,
    /// Status after.
    pub to: QuestStatus,
    /// Owner whose aggregates move.
    pub owner: UserId,
    /// `earnedXp` stored on the quest afterwards.
    pub earned_xp: i64,
    /// Increment to the owner's XP (user record and duo mirror).
    pub xp_delta: i64,
    /// Increment to the owner's completed count.
    pub completed_delta: i64,
    /// `completedAt` stored on the quest afterwards.
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether a completion landed after the due day.
    pub is_late: bool,
}

impl Transition {
    /// Apply the status fields to an in-memory quest.
    pub fn apply(&self, quest: &mut Quest) {
        quest.status = self.to;
        quest.earned_xp = self.earned_xp;
        quest.completed_at = self.completed_at;
    }

    /// Whether the owner's aggregates change.
    #[must_use]
    pub fn moves_aggregates(&self) -> bool {
        self.xp_delta != 0 || self.completed_delta != 0
    }
}

fn refuse(quest: &Quest, action: QuestAction, reason: impl Into<String>) -> ProgressionError {
    ProgressionError::InvalidTransition {
        quest_id: quest.id.to_string(),
        status: quest.status,
        action,
        reason: reason.into(),
    }
}

fn require_status(quest: &Quest, action: QuestAction, allowed: &[QuestStatus]) -> Result<()> {
    if allowed.contains(&quest.status) {
        Ok(())
    } else {
        Err(refuse(quest, action, format!("quest is {}", quest.status)))
    }
}

fn require_owner(quest: &Quest, action: QuestAction, actor: &UserId) -> Result<()> {
    if &quest.assigned_to == actor {
        Ok(())
    } else {
        Err(refuse(
            quest,
            action,
            format!("only {} may {action} this quest", quest.assigned_to),
        ))
    }
}

/// Calendar day of `instant` in `offset`.
#[must_use]
pub fn calendar_day(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// Whether `now` is strictly after the end of the calendar day containing `due`.
#[must_use]
pub fn is_past_due(due: Option<DateTime<Utc>>, now: DateTime<Utc>, offset: FixedOffset) -> bool {
    due.is_some_and(|due| calendar_day(now, offset) > calendar_day(due, offset))
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ProgressionError::Validation("title is required".into()));
    }
    Ok(trimmed.to_string())
}

fn validate_recurring(recurring: Option<&QuestRecurring>) -> Result<()> {
    let Some(r) = recurring else {
        return Ok(());
    };
    if r.kind == RecurringType::Custom && r.custom_days.is_empty() {
        return Err(ProgressionError::Validation(
            "custom recurrence needs at least one weekday".into(),
        ));
    }
    if let Some(day) = r.custom_days.iter().find(|&&d| d > 6) {
        return Err(ProgressionError::Validation(format!(
            "invalid weekday {day} (expected 0-6)"
        )));
    }
    Ok(())
}

/// Build a new `active` quest.
///
/// # Errors
///
/// `Validation` for an empty title, a missing owner or creator, or a bad
/// recurrence descriptor.
pub fn create(params: QuestCreateParams, id: QuestId, now: DateTime<Utc>) -> Result<Quest> {
    let title = validate_title(&params.title)?;
    let assigned_to = params
        .assigned_to
        .ok_or_else(|| ProgressionError::Validation("quest owner is required".into()))?;
    let created_by = params
        .created_by
        .ok_or_else(|| ProgressionError::Validation("quest creator is required".into()))?;
    validate_recurring(params.recurring.as_ref())?;
    let priority = params.priority.unwrap_or(QuestPriority::Medium);
    let category_id = if params.category_id.trim().is_empty() {
        "all".to_string()
    } else {
        params.category_id
    };

    Ok(Quest {
        id,
        title,
        description: params.description,
        category_id,
        created_by,
        assigned_to,
        due_date: params.due_date,
        priority,
        base_xp: base_xp_for(priority),
        earned_xp: 0,
        status: QuestStatus::Active,
        created_at: now,
        completed_at: None,
        recurring: params.recurring,
        reminder_id: None,
    })
}

/// `active --complete(owner)--> completed`.
///
/// # Errors
///
/// `InvalidTransition` unless the quest is active and `actor` owns it.
pub fn complete(
    quest: &Quest,
    actor: &UserId,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<Transition> {
    require_status(quest, QuestAction::Complete, &[QuestStatus::Active])?;
    require_owner(quest, QuestAction::Complete, actor)?;
    let is_late = is_past_due(quest.due_date, now, offset);
    let earned = earned_xp_for(quest.priority, is_late);
    Ok(Transition {
        quest_id: quest.id.clone(),
        action: QuestAction::Complete,
        from: quest.status,
        to: QuestStatus::Completed,
        owner: quest.assigned_to.clone(),
        earned_xp: earned,
        xp_delta: earned,
        completed_delta: 1,
        completed_at: Some(now),
        is_late,
    })
}

/// `completed --undo(owner)--> active`, reversing the recorded award.
///
/// # Errors
///
/// `InvalidTransition` unless the quest is completed and `actor` owns it.
pub fn undo(quest: &Quest, actor: &UserId) -> Result<Transition> {
    require_status(quest, QuestAction::Undo, &[QuestStatus::Completed])?;
    require_owner(quest, QuestAction::Undo, actor)?;
    Ok(Transition {
        quest_id: quest.id.clone(),
        action: QuestAction::Undo,
        from: quest.status,
        to: QuestStatus::Active,
        owner: quest.assigned_to.clone(),
        earned_xp: 0,
        xp_delta: -quest.earned_xp,
        completed_delta: -1,
        completed_at: None,
        is_late: false,
    })
}

/// `active --expire--> expired`, charging the missed penalty.
///
/// # Errors
///
/// `InvalidTransition` unless the quest is active and past its due day.
pub fn expire(quest: &Quest, now: DateTime<Utc>, offset: FixedOffset) -> Result<Transition> {
    require_status(quest, QuestAction::Expire, &[QuestStatus::Active])?;
    if !is_past_due(quest.due_date, now, offset) {
        return Err(refuse(quest, QuestAction::Expire, "quest is not past due"));
    }
    Ok(Transition {
        quest_id: quest.id.clone(),
        action: QuestAction::Expire,
        from: quest.status,
        to: QuestStatus::Expired,
        owner: quest.assigned_to.clone(),
        earned_xp: 0,
        xp_delta: -missed_penalty(),
        completed_delta: 0,
        completed_at: None,
        is_late: true,
    })
}

/// `active|completed --delete--> deleted`. Awarded XP is kept.
///
/// # Errors
///
/// `InvalidTransition` for expired or already deleted quests.
pub fn soft_delete(quest: &Quest) -> Result<Transition> {
    require_status(
        quest,
        QuestAction::Delete,
        &[QuestStatus::Active, QuestStatus::Completed],
    )?;
    Ok(Transition {
        quest_id: quest.id.clone(),
        action: QuestAction::Delete,
        from: quest.status,
        to: QuestStatus::Deleted,
        owner: quest.assigned_to.clone(),
        earned_xp: quest.earned_xp,
        xp_delta: 0,
        completed_delta: 0,
        completed_at: quest.completed_at,
        is_late: false,
    })
}

/// Edited copy of an active quest. Changing priority re-derives `baseXp`.
///
/// # Errors
///
/// `InvalidTransition` unless active; `Validation` for an empty title.
pub fn edit(quest: &Quest, params: QuestUpdateParams) -> Result<Quest> {
    require_status(quest, QuestAction::Edit, &[QuestStatus::Active])?;
    let mut edited = quest.clone();
    if let Some(title) = params.title {
        edited.title = validate_title(&title)?;
    }
    if let Some(description) = params.description {
        edited.description = description;
    }
    if let Some(category_id) = params.category_id {
        edited.category_id = category_id;
    }
    if let Some(priority) = params.priority {
        edited.priority = priority;
        edited.base_xp = base_xp_for(priority);
    }
    if let Some(due_date) = params.due_date {
        edited.due_date = due_date;
    }
    Ok(edited)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn params(priority: QuestPriority, due: Option<DateTime<Utc>>) -> QuestCreateParams {
        QuestCreateParams {
            title: "Take out trash".into(),
            description: String::new(),
            category_id: "chores".into(),
            assigned_to: Some("bob".into()),
            created_by: Some("alice".into()),
            due_date: due,
            priority: Some(priority),
            recurring: None,
        }
    }

    fn active(priority: QuestPriority, due: Option<DateTime<Utc>>) -> Quest {
        create(params(priority, due), "quest-1".into(), at(2024, 1, 1, 8)).unwrap()
    }

    #[test]
    fn create_derives_base_xp_and_starts_active() {
        let q = active(QuestPriority::Hard, None);
        assert_eq!(q.status, QuestStatus::Active);
        assert_eq!(q.base_xp, 50);
        assert_eq!(q.earned_xp, 0);
        assert!(q.completed_at.is_none());
    }

    #[test]
    fn create_rejects_blank_title() {
        let mut p = params(QuestPriority::Easy, None);
        p.title = "   ".into();
        assert_matches!(
            create(p, "q".into(), at(2024, 1, 1, 0)),
            Err(ProgressionError::Validation(_))
        );
    }

    #[test]
    fn create_rejects_missing_owner() {
        let mut p = params(QuestPriority::Easy, None);
        p.assigned_to = None;
        assert_matches!(
            create(p, "q".into(), at(2024, 1, 1, 0)),
            Err(ProgressionError::Validation(msg)) if msg.contains("owner")
        );
    }

    #[test]
    fn create_defaults_priority_and_category() {
        let mut p = params(QuestPriority::Easy, None);
        p.priority = None;
        p.category_id = String::new();
        let q = create(p, "q".into(), at(2024, 1, 1, 0)).unwrap();
        assert_eq!(q.priority, QuestPriority::Medium);
        assert_eq!(q.category_id, "all");
    }

    #[test]
    fn create_validates_custom_recurrence() {
        let mut p = params(QuestPriority::Easy, None);
        p.recurring = Some(QuestRecurring {
            kind: RecurringType::Custom,
            custom_days: vec![],
            next_occurrence: at(2024, 1, 2, 0),
        });
        assert_matches!(create(p.clone(), "q".into(), at(2024, 1, 1, 0)), Err(ProgressionError::Validation(_)));
        if let Some(r) = p.recurring.as_mut() {
            r.custom_days = vec![1, 7];
        }
        assert_matches!(create(p, "q".into(), at(2024, 1, 1, 0)), Err(ProgressionError::Validation(_)));
    }

    #[test]
    fn complete_on_time_awards_full_xp() {
        let q = active(QuestPriority::Hard, Some(at(2024, 1, 5, 9)));
        let t = complete(&q, &"bob".into(), at(2024, 1, 5, 23), utc()).unwrap();
        assert!(!t.is_late);
        assert_eq!(t.earned_xp, 50);
        assert_eq!(t.xp_delta, 50);
        assert_eq!(t.completed_delta, 1);
        assert_eq!(t.to, QuestStatus::Completed);
    }

    #[test]
    fn complete_after_due_day_halves_xp() {
        let q = active(QuestPriority::Hard, Some(at(2024, 1, 5, 9)));
        let t = complete(&q, &"bob".into(), at(2024, 1, 6, 0), utc()).unwrap();
        assert!(t.is_late);
        assert_eq!(t.earned_xp, 25);
    }

    #[test]
    fn lateness_uses_offset_calendar_day() {
        // 2024-01-05 23:30 UTC is already 2024-01-06 in UTC+2.
        let due = Some(at(2024, 1, 5, 12));
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 23, 30, 0).unwrap();
        assert!(!is_past_due(due, now, utc()));
        assert!(is_past_due(due, now, FixedOffset::east_opt(2 * 3600).unwrap()));
    }

    #[test]
    fn non_owner_cannot_complete() {
        let q = active(QuestPriority::Easy, None);
        assert_matches!(
            complete(&q, &"alice".into(), at(2024, 1, 2, 0), utc()),
            Err(ProgressionError::InvalidTransition { action: QuestAction::Complete, .. })
        );
    }

    #[test]
    fn cannot_complete_twice() {
        let mut q = active(QuestPriority::Easy, None);
        complete(&q, &"bob".into(), at(2024, 1, 2, 0), utc()).unwrap().apply(&mut q);
        assert_matches!(
            complete(&q, &"bob".into(), at(2024, 1, 2, 1), utc()),
            Err(ProgressionError::InvalidTransition { status: QuestStatus::Completed, .. })
        );
    }

    #[test]
    fn undo_reverses_recorded_award() {
        let mut q = active(QuestPriority::Hard, Some(at(2024, 1, 1, 9)));
        complete(&q, &"bob".into(), at(2024, 1, 3, 0), utc()).unwrap().apply(&mut q);
        assert_eq!(q.earned_xp, 25);

        let t = undo(&q, &"bob".into()).unwrap();
        assert_eq!(t.xp_delta, -25);
        assert_eq!(t.completed_delta, -1);
        t.apply(&mut q);
        assert_eq!(q.status, QuestStatus::Active);
        assert_eq!(q.earned_xp, 0);
        assert!(q.completed_at.is_none());
    }

    #[test]
    fn undo_requires_completed() {
        let q = active(QuestPriority::Easy, None);
        assert_matches!(undo(&q, &"bob".into()), Err(ProgressionError::InvalidTransition { .. }));
    }

    #[test]
    fn expire_charges_penalty_and_is_terminal() {
        let mut q = active(QuestPriority::Medium, Some(at(2024, 1, 1, 9)));
        let t = expire(&q, at(2024, 1, 2, 1), utc()).unwrap();
        assert_eq!(t.xp_delta, -5);
        assert_eq!(t.completed_delta, 0);
        t.apply(&mut q);
        assert_eq!(q.status, QuestStatus::Expired);
        assert!(undo(&q, &"bob".into()).is_err());
        assert!(complete(&q, &"bob".into(), at(2024, 1, 2, 2), utc()).is_err());
        assert!(soft_delete(&q).is_err());
    }

    #[test]
    fn expire_requires_past_due() {
        let q = active(QuestPriority::Medium, Some(at(2024, 1, 1, 9)));
        assert_matches!(
            expire(&q, at(2024, 1, 1, 23), utc()),
            Err(ProgressionError::InvalidTransition { action: QuestAction::Expire, .. })
        );
        let undated = active(QuestPriority::Medium, None);
        assert!(expire(&undated, at(2030, 1, 1, 0), utc()).is_err());
    }

    #[test]
    fn delete_completed_keeps_xp() {
        let mut q = active(QuestPriority::Medium, None);
        complete(&q, &"bob".into(), at(2024, 1, 2, 0), utc()).unwrap().apply(&mut q);
        let t = soft_delete(&q).unwrap();
        assert!(!t.moves_aggregates());
        assert_eq!(t.earned_xp, 25);
        t.apply(&mut q);
        assert_eq!(q.status, QuestStatus::Deleted);
        assert_matches!(soft_delete(&q), Err(ProgressionError::InvalidTransition { .. }));
    }

    #[test]
    fn edit_rederives_base_xp() {
        let q = active(QuestPriority::Easy, None);
        let edited = edit(
            &q,
            QuestUpdateParams {
                title: Some(" Laundry ".into()),
                priority: Some(QuestPriority::Hard),
                ..QuestUpdateParams::default()
            },
        )
        .unwrap();
        assert_eq!(edited.title, "Laundry");
        assert_eq!(edited.base_xp, 50);
        assert_eq!(edited.id, q.id);
    }

    #[test]
    fn edit_rejects_non_active() {
        let mut q = active(QuestPriority::Easy, None);
        complete(&q, &"bob".into(), at(2024, 1, 2, 0), utc()).unwrap().apply(&mut q);
        assert_matches!(
            edit(&q, QuestUpdateParams::default()),
            Err(ProgressionError::InvalidTransition { action: QuestAction::Edit, .. })
        );
    }
}
