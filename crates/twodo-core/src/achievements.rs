//! Achievement catalog and evaluator.
//!
//! The catalog is static. Each entry holds a threshold [`Requirement`] over a
//! [`ProgressionSnapshot`]; evaluation returns entries that are not yet
//! unlocked and whose requirement holds, in catalog order.

use serde::Serialize;

use crate::types::ProgressionSnapshot;

/// Threshold an achievement unlocks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "metric", content = "atLeast", rename_all = "camelCase")]
pub enum Requirement {
    /// Completed quests of the acting member.
    QuestsCompleted(i64),
    /// Level of the acting member.
    Level(u32),
    /// Duo affection counter.
    AffectionCount(i64),
    /// Duo best streak.
    BestStreak(u32),
    /// XP of the acting member.
    Xp(i64),
    /// Days since the relationship start.
    DaysTogether(i64),
}

impl Requirement {
    /// Whether `snapshot` satisfies this requirement.
    #[must_use]
    pub fn is_met(self, snapshot: &ProgressionSnapshot) -> bool {
        match self {
            Self::QuestsCompleted(n) => snapshot.quests_completed >= n,
            Self::Level(n) => snapshot.level >= n,
            Self::AffectionCount(n) => snapshot.affection_count >= n,
            Self::BestStreak(n) => snapshot.best_streak >= n,
            Self::Xp(n) => snapshot.xp >= n,
            Self::DaysTogether(n) => snapshot.days_together_count >= n,
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    /// Stable ID stored in `unlockedAchievements`.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Display description.
    pub description: &'static str,
    /// Emoji icon.
    pub icon: &'static str,
    /// Unlock condition.
    pub requirement: Requirement,
}

const fn entry(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    requirement: Requirement,
) -> Achievement {
    Achievement {
        id,
        name,
        description,
        icon,
        requirement,
    }
}

/// Every achievement, in canonical unlock order.
pub static ACHIEVEMENTS: [Achievement; 15] = [
    entry("first_quest", "First Steps", "Complete your first quest", "🎯", Requirement::QuestsCompleted(1)),
    entry("quest_10", "Adventurer", "Complete 10 quests", "⚔️", Requirement::QuestsCompleted(10)),
    entry("quest_50", "Veteran", "Complete 50 quests", "🏆", Requirement::QuestsCompleted(50)),
    entry("quest_100", "Legend", "Complete 100 quests", "👑", Requirement::QuestsCompleted(100)),
    entry("level_3", "Rising Star", "Reach level 3", "⭐", Requirement::Level(3)),
    entry("level_5", "Elite", "Reach level 5", "🌟", Requirement::Level(5)),
    entry("level_10", "Max Power", "Reach level 10", "💫", Requirement::Level(10)),
    entry("affection_10", "Warmhearted", "Send 10 affections", "💗", Requirement::AffectionCount(10)),
    entry("affection_100", "Devoted", "Send 100 affections", "💖", Requirement::AffectionCount(100)),
    entry("streak_3", "On a Roll", "3-day quest streak", "🔥", Requirement::BestStreak(3)),
    entry("streak_7", "Unstoppable", "7-day quest streak", "🔥", Requirement::BestStreak(7)),
    entry("streak_30", "Legendary Streak", "30-day quest streak", "🔥", Requirement::BestStreak(30)),
    entry("xp_1000", "XP Hoarder", "Earn 1,000 XP", "✨", Requirement::Xp(1000)),
    entry("together_30", "One Month", "Together for 30 days", "📅", Requirement::DaysTogether(30)),
    entry("together_365", "Anniversary", "Together for 1 year", "🎂", Requirement::DaysTogether(365)),
];

/// Achievements satisfied by `snapshot` that are not in `unlocked`.
#[must_use]
pub fn check_new_achievements(
    snapshot: &ProgressionSnapshot,
    unlocked: &[String],
) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !unlocked.iter().any(|id| id == a.id))
        .filter(|a| a.requirement.is_met(snapshot))
        .collect()
}

/// Look up a catalog entry by ID.
#[must_use]
pub fn find_achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}
