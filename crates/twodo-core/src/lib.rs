//! # twodo-core
//!
//! Progression domain for Two-Do, the cooperative quest log shared by a duo.
//!
//! Everything in this crate is pure and synchronous:
//!
//! - **Branded IDs**: [`UserId`], [`DuoId`], [`QuestId`] as newtypes
//! - **Data model**: [`Quest`], [`UserProfile`], [`Duo`], [`MemberProfile`]
//! - **XP & leveling**: [`xp`] maps priority/lateness to XP and XP to levels
//! - **Streaks**: [`streak::advance_streak`] computes the shared daily streak
//! - **Achievements**: [`achievements::check_new_achievements`] over a
//!   [`ProgressionSnapshot`]
//! - **Lifecycle**: [`lifecycle`] is the quest state machine producing
//!   [`lifecycle::Transition`]s with their XP effects
//! - **Errors**: [`ProgressionError`] taxonomy shared by the store and engine

#![deny(unsafe_code)]

pub mod achievements;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod lifecycle;
pub mod logging;
pub mod streak;
pub mod types;
pub mod xp;

pub use achievements::{ACHIEVEMENTS, Achievement, check_new_achievements};
pub use errors::{ProgressionError, Result};
pub use ids::{DuoId, QuestId, UserId};
pub use lifecycle::{QuestAction, Transition};
pub use streak::{StreakState, advance_streak};
pub use types::*;
pub use xp::{LevelProgress, base_xp_for, earned_xp_for, level_of, missed_penalty, progress_within_level};
