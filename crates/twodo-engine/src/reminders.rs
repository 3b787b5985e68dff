//! Due-date reminders.
//!
//! The engine only decides *when* a reminder fires and what it says;
//! delivery belongs to a [`NotificationScheduler`]. Scheduling and
//! cancelling are best-effort: failures are logged by the caller and never
//! undo a quest write.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;
use twodo_core::Quest;
use uuid::Uuid;

/// Title of every due reminder.
pub const REMINDER_TITLE: &str = "Quest Due Soon!";

/// A fire-once notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// When to fire.
    pub fire_at: DateTime<Utc>,
}

/// Scheduler failure.
#[derive(Debug, Error)]
#[error("notification scheduler failed: {0}")]
pub struct ReminderError(pub String);

/// Schedules and cancels fire-once notifications.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Schedule `reminder`; returns a handle for [`cancel`](Self::cancel).
    async fn schedule(&self, reminder: &Reminder) -> Result<String, ReminderError>;

    /// Cancel a previously scheduled reminder.
    async fn cancel(&self, handle: &str) -> Result<(), ReminderError>;
}

fn describe_lead(lead: Duration) -> String {
    let minutes = lead.num_minutes();
    match minutes {
        60 => "1 hour".to_string(),
        m if m > 0 && m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".to_string(),
        m => format!("{m} minutes"),
    }
}

/// Reminder for `quest`, firing `lead` before its due date.
///
/// `None` when the quest has no due date or the firing instant is not in the
/// future.
#[must_use]
pub fn reminder_for(quest: &Quest, lead: Duration, now: DateTime<Utc>) -> Option<Reminder> {
    let fire_at = quest.due_date? - lead;
    (fire_at > now).then(|| Reminder {
        title: REMINDER_TITLE.to_string(),
        body: format!("\"{}\" is due in {}", quest.title, describe_lead(lead)),
        fire_at,
    })
}

/// Scheduler that only logs. Used where no device delivery exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyScheduler;

#[async_trait]
impl NotificationScheduler for LogOnlyScheduler {
    async fn schedule(&self, reminder: &Reminder) -> Result<String, ReminderError> {
        let handle = format!("reminder-{}", Uuid::now_v7());
        info!(handle, fire_at = %reminder.fire_at, body = %reminder.body, "reminder scheduled");
        Ok(handle)
    }

    async fn cancel(&self, handle: &str) -> Result<(), ReminderError> {
        info!(handle, "reminder cancelled");
        Ok(())
    }
}

/// Scheduler that records calls, with optional forced failure.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(String, Reminder)>>,
    cancelled: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl RecordingScheduler {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Handles and reminders scheduled so far, in order.
    #[must_use]
    pub fn scheduled(&self) -> Vec<(String, Reminder)> {
        self.scheduled.lock().clone()
    }

    /// Handles cancelled so far, in order.
    #[must_use]
    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().clone()
    }
}

#[async_trait]
impl NotificationScheduler for RecordingScheduler {
    async fn schedule(&self, reminder: &Reminder) -> Result<String, ReminderError> {
        if *self.failing.lock() {
            return Err(ReminderError("scheduler offline".into()));
        }
        let mut scheduled = self.scheduled.lock();
        let handle = format!("reminder-{}", scheduled.len() + 1);
        scheduled.push((handle.clone(), reminder.clone()));
        Ok(handle)
    }

    async fn cancel(&self, handle: &str) -> Result<(), ReminderError> {
        if *self.failing.lock() {
            return Err(ReminderError("scheduler offline".into()));
        }
        self.cancelled.lock().push(handle.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use twodo_core::{QuestPriority, QuestStatus};

    fn quest(due: Option<DateTime<Utc>>) -> Quest {
        Quest {
            id: "quest-1".into(),
            title: "Buy flowers".into(),
            description: String::new(),
            category_id: "date-night".into(),
            created_by: "alice".into(),
            assigned_to: "bob".into(),
            due_date: due,
            priority: QuestPriority::Medium,
            base_xp: 25,
            earned_xp: 0,
            status: QuestStatus::Active,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            completed_at: None,
            recurring: None,
            reminder_id: None,
        }
    }

    #[test]
    fn fires_one_hour_before_due() {
        let due = Utc.with_ymd_and_hms(2024, 1, 5, 18, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        let r = reminder_for(&quest(Some(due)), Duration::minutes(60), now).unwrap();
        assert_eq!(r.fire_at, Utc.with_ymd_and_hms(2024, 1, 5, 17, 0, 0).unwrap());
        assert_eq!(r.title, "Quest Due Soon!");
        assert_eq!(r.body, "\"Buy flowers\" is due in 1 hour");
    }

    #[test]
    fn skips_past_firing_instant() {
        let due = Utc.with_ymd_and_hms(2024, 1, 5, 18, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 17, 30, 0).unwrap();
        assert!(reminder_for(&quest(Some(due)), Duration::minutes(60), now).is_none());
        assert!(reminder_for(&quest(None), Duration::minutes(60), now).is_none());
    }

    #[test]
    fn body_follows_lead() {
        assert_eq!(describe_lead(Duration::minutes(120)), "2 hours");
        assert_eq!(describe_lead(Duration::minutes(30)), "30 minutes");
        assert_eq!(describe_lead(Duration::minutes(1)), "1 minute");
    }

    #[tokio::test]
    async fn recording_scheduler_tracks_calls() {
        let scheduler = RecordingScheduler::new();
        let reminder = Reminder {
            title: REMINDER_TITLE.into(),
            body: "x".into(),
            fire_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let handle = scheduler.schedule(&reminder).await.unwrap();
        scheduler.cancel(&handle).await.unwrap();
        assert_eq!(scheduler.scheduled().len(), 1);
        assert_eq!(scheduler.cancelled(), vec![handle]);

        scheduler.set_failing(true);
        assert!(scheduler.schedule(&reminder).await.is_err());
    }

    #[tokio::test]
    async fn log_only_scheduler_issues_handles() {
        let handle = LogOnlyScheduler
            .schedule(&Reminder {
                title: REMINDER_TITLE.into(),
                body: "x".into(),
                fire_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(handle.starts_with("reminder-"));
        LogOnlyScheduler.cancel(&handle).await.unwrap();
    }
}
