//! # twodo-engine
//!
//! Progression coordinator for Two-Do.
//!
//! [`ProgressionEngine`] turns a user action (complete, undo, expire, delete
//! a quest; send affection; ...) into store batches in dependency order:
//!
//! 1. Validate through the quest state machine ([`twodo_core::lifecycle`]).
//! 2. Commit the primary batch: quest status plus commutative XP/count
//!    increments on the user record and the duo member mirror.
//! 3. Run the secondary steps against the new state: level sync, the shared
//!    streak (compare-and-swap on `lastStreakDate`), achievements. These are
//!    idempotent and a failure is logged, never surfaced.
//!
//! Collaborators are injected: a [`DocumentStore`](twodo_store::DocumentStore),
//! a [`Clock`], and a [`NotificationScheduler`]. Outcomes are also published
//! as [`ProgressionEvent`]s for the presentation layer.

#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod duos;
pub mod engine;
pub mod events;
pub mod quests;
pub mod reminders;
pub mod repository;
pub mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use coordinator::{CompletionOutcome, LevelChange};
pub use duos::AffectionOutcome;
pub use engine::ProgressionEngine;
pub use events::{EventEmitter, ProgressionEvent};
pub use quests::QuestFilter;
pub use reminders::{
    LogOnlyScheduler, NotificationScheduler, RecordingScheduler, Reminder, ReminderError,
    reminder_for,
};
pub use repository::Repository;
pub use sweep::{SweepFailure, SweepReport};
