//! Core types for the progression engine.
//!
//! All serializable types use `camelCase` so stored documents keep the field
//! names the mobile clients already read (`memberProfiles`, `lastStreakDate`,
//! `unlockedAchievements`, ...).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{EASY_XP, FALLBACK_XP, HARD_XP, MEDIUM_XP};
use crate::ids::{DuoId, QuestId, UserId};
use crate::streak::StreakState;

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Quest difficulty, which fixes its base XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestPriority {
    /// 10 XP.
    Easy,
    /// 25 XP.
    Medium,
    /// 50 XP.
    Hard,
}

impl QuestPriority {
    /// Wire string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Parse a wire label; `None` for anything unrecognised.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    /// Base XP awarded for an on-time completion.
    #[must_use]
    pub fn base_xp(self) -> i64 {
        match self {
            Self::Easy => EASY_XP,
            Self::Medium => MEDIUM_XP,
            Self::Hard => HARD_XP,
        }
    }

    /// Base XP for a raw label, falling back to the easy reward when unknown.
    #[must_use]
    pub fn base_xp_for_label(label: &str) -> i64 {
        Self::parse(label).map_or(FALLBACK_XP, Self::base_xp)
    }
}

impl std::fmt::Display for QuestPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quest lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    /// Open and completable by its owner.
    Active,
    /// Completed; `earnedXp` holds the award.
    Completed,
    /// Due date passed unmet. Terminal.
    Expired,
    /// Soft-deleted. Terminal.
    Deleted,
}

impl QuestStatus {
    /// Wire string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Deleted => "deleted",
        }
    }

    /// Whether no further transition can leave this status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Deleted)
    }
}

impl std::fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the two participants relate; drives presentation copy only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    /// Romantic couple.
    Couple,
    /// Friends.
    Friends,
    /// Long-distance.
    Ld,
}

impl RelationshipType {
    /// Parse a wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "couple" => Some(Self::Couple),
            "friends" => Some(Self::Friends),
            "ld" => Some(Self::Ld),
            _ => None,
        }
    }
}

/// Recurrence cadence of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringType {
    /// Every day.
    Daily,
    /// Every week.
    Weekly,
    /// On selected weekdays.
    Custom,
}

// ─────────────────────────────────────────────────────────────────────────────
// Quest
// ─────────────────────────────────────────────────────────────────────────────

/// Recurrence descriptor stored with a quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestRecurring {
    /// Cadence.
    #[serde(rename = "type")]
    pub kind: RecurringType,
    /// Weekdays for `custom` (0 = Sunday .. 6 = Saturday).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_days: Vec<u8>,
    /// Next time the quest recurs.
    pub next_occurrence: DateTime<Utc>,
}

/// A unit of work owned by exactly one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    /// Unique ID (`quest-{uuid}`).
    pub id: QuestId,
    /// Short title (never empty).
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Category the quest is filed under.
    pub category_id: String,
    /// Participant who created it.
    pub created_by: UserId,
    /// Participant who owns it for completion purposes.
    pub assigned_to: UserId,
    /// Optional due instant.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Difficulty.
    pub priority: QuestPriority,
    /// XP derived from priority at creation (or last edit).
    pub base_xp: i64,
    /// XP actually awarded; non-zero only while completed.
    #[serde(default)]
    pub earned_xp: i64,
    /// Lifecycle status.
    pub status: QuestStatus,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Completion instant (only while completed).
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Recurrence descriptor.
    #[serde(default)]
    pub recurring: Option<QuestRecurring>,
    /// Handle of the scheduled due reminder, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_id: Option<String>,
}

/// Parameters for creating a quest.
#[derive(Debug, Clone, Default)]
pub struct QuestCreateParams {
    /// Title (trimmed; must not be empty).
    pub title: String,
    /// Description.
    pub description: String,
    /// Category ID.
    pub category_id: String,
    /// Owner.
    pub assigned_to: Option<UserId>,
    /// Creator.
    pub created_by: Option<UserId>,
    /// Optional due instant.
    pub due_date: Option<DateTime<Utc>>,
    /// Difficulty (defaults to medium).
    pub priority: Option<QuestPriority>,
    /// Optional recurrence.
    pub recurring: Option<QuestRecurring>,
}

/// Editable fields of an active quest. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct QuestUpdateParams {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub category_id: Option<String>,
    /// New priority (re-derives `baseXp`).
    pub priority: Option<QuestPriority>,
    /// New due date; `Some(None)` clears it.
    pub due_date: Option<Option<DateTime<Utc>>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Participants and duos
// ─────────────────────────────────────────────────────────────────────────────

/// Per-user aggregate record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity from the authentication provider.
    pub uid: UserId,
    /// Email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Avatar key.
    #[serde(default = "default_avatar")]
    pub avatar_id: String,
    /// Duo this user belongs to.
    #[serde(default)]
    pub duo_id: Option<DuoId>,
    /// Cumulative XP.
    #[serde(default)]
    pub xp: i64,
    /// Denormalized `level_of(xp)`.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Quests currently completed by this user.
    #[serde(default)]
    pub quests_completed: i64,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

fn default_avatar() -> String {
    "warrior".to_string()
}

fn default_level() -> u32 {
    1
}

/// A member's progression as mirrored on the duo record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    /// Display name.
    pub display_name: String,
    /// Partner-assigned nickname.
    #[serde(default)]
    pub nickname: String,
    /// Avatar key.
    #[serde(default = "default_avatar")]
    pub avatar_id: String,
    /// Mirrored XP.
    #[serde(default)]
    pub xp: i64,
    /// Mirrored level.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Mirrored completed count.
    #[serde(default)]
    pub quests_completed: i64,
}

impl MemberProfile {
    /// Mirror a user's current progression.
    #[must_use]
    pub fn mirror(user: &UserProfile) -> Self {
        Self {
            display_name: user.display_name.clone(),
            nickname: String::new(),
            avatar_id: user.avatar_id.clone(),
            xp: user.xp,
            level: user.level,
            quests_completed: user.quests_completed,
        }
    }
}

/// A quest category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Slug ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Emoji icon.
    pub icon: String,
    /// Whether this is a built-in category.
    pub is_default: bool,
}

impl Category {
    fn builtin(id: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            is_default: true,
        }
    }

    /// Slug for a user-supplied category name: lower-cased, whitespace runs to `-`.
    #[must_use]
    pub fn slug(name: &str) -> String {
        name.trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Built-in categories, in display order.
#[must_use]
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::builtin("all", "All", "📋"),
        Category::builtin("daily", "Daily", "☀️"),
        Category::builtin("errands", "Errands", "🏃"),
        Category::builtin("self-care", "Self-Care", "🧘"),
        Category::builtin("date-night", "Date Night", "💕"),
        Category::builtin("fitness", "Fitness", "💪"),
        Category::builtin("learning", "Learning", "📚"),
        Category::builtin("chores", "Chores", "🧹"),
    ]
}

/// Shared record of the two linked participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Duo {
    /// Duo ID.
    pub id: DuoId,
    /// The two members.
    pub member_ids: [UserId; 2],
    /// Per-member progression mirrors keyed by user ID.
    pub member_profiles: BTreeMap<UserId, MemberProfile>,
    /// Relationship flavour.
    pub relationship_type: RelationshipType,
    /// Shared affection counter.
    #[serde(default)]
    pub affection_count: i64,
    /// Last member to send affection.
    #[serde(default)]
    pub last_affection_sent_by: Option<UserId>,
    /// When affection was last sent.
    #[serde(default)]
    pub last_affection_at: Option<DateTime<Utc>>,
    /// User-defined categories.
    #[serde(default)]
    pub custom_categories: Vec<Category>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Current daily streak.
    #[serde(default)]
    pub current_streak: u32,
    /// Best daily streak ever reached.
    #[serde(default)]
    pub best_streak: u32,
    /// Calendar date of the last streak-advancing completion.
    #[serde(default)]
    pub last_streak_date: Option<NaiveDate>,
    /// Optional anniversary.
    #[serde(default)]
    pub relationship_start_date: Option<DateTime<Utc>>,
    /// Unlocked achievement IDs (append-only).
    #[serde(default)]
    pub unlocked_achievements: Vec<String>,
}

impl Duo {
    /// Whether `user` is one of the two members.
    #[must_use]
    pub fn is_member(&self, user: &UserId) -> bool {
        self.member_ids.contains(user)
    }

    /// The other member.
    #[must_use]
    pub fn partner_of(&self, user: &UserId) -> Option<&UserId> {
        match &self.member_ids {
            [a, b] if a == user => Some(b),
            [a, b] if b == user => Some(a),
            _ => None,
        }
    }

    /// Mirrored profile of a member.
    #[must_use]
    pub fn member(&self, user: &UserId) -> Option<&MemberProfile> {
        self.member_profiles.get(user)
    }

    /// Current streak fields.
    #[must_use]
    pub fn streak_state(&self) -> StreakState {
        StreakState {
            current_streak: self.current_streak,
            best_streak: self.best_streak,
            last_streak_date: self.last_streak_date,
        }
    }

    /// Built-in categories followed by the duo's custom ones.
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        let mut all = default_categories();
        all.extend(self.custom_categories.iter().cloned());
        all
    }

    /// Whole days since the relationship start (0 when unset or in the future).
    #[must_use]
    pub fn days_together(&self, now: DateTime<Utc>) -> i64 {
        self.relationship_start_date
            .map_or(0, |start| (now - start).num_days().max(0))
    }
}

/// Inputs every achievement predicate is evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionSnapshot {
    /// Completed quests of the acting member.
    pub quests_completed: i64,
    /// XP of the acting member.
    pub xp: i64,
    /// Level of the acting member.
    pub level: u32,
    /// Duo affection counter.
    pub affection_count: i64,
    /// Duo current streak.
    pub current_streak: u32,
    /// Duo best streak.
    pub best_streak: u32,
    /// Whole days since the relationship start.
    pub days_together_count: i64,
}

impl ProgressionSnapshot {
    /// Snapshot for `member` as seen on the duo record at `now`.
    #[must_use]
    pub fn for_member(duo: &Duo, member: &UserId, now: DateTime<Utc>) -> Self {
        let profile = duo.member(member);
        Self {
            quests_completed: profile.map_or(0, |p| p.quests_completed),
            xp: profile.map_or(0, |p| p.xp),
            level: profile.map_or(1, |p| p.level),
            affection_count: duo.affection_count,
            current_streak: duo.current_streak,
            best_streak: duo.best_streak,
            days_together_count: duo.days_together(now),
        }
    }
}

/// Dotted field paths into stored documents.
pub mod field {
    use crate::ids::UserId;

    /// Quest/user/member XP.
    pub const XP: &str = "xp";
    /// User/member level.
    pub const LEVEL: &str = "level";
    /// User/member completed count.
    pub const QUESTS_COMPLETED: &str = "questsCompleted";
    /// Quest status.
    pub const STATUS: &str = "status";
    /// Quest earned XP.
    pub const EARNED_XP: &str = "earnedXp";
    /// Quest completion instant.
    pub const COMPLETED_AT: &str = "completedAt";
    /// Quest reminder handle.
    pub const REMINDER_ID: &str = "reminderId";
    /// User duo membership.
    pub const DUO_ID: &str = "duoId";
    /// Duo streak.
    pub const CURRENT_STREAK: &str = "currentStreak";
    /// Duo best streak.
    pub const BEST_STREAK: &str = "bestStreak";
    /// Duo streak date.
    pub const LAST_STREAK_DATE: &str = "lastStreakDate";
    /// Duo achievements.
    pub const UNLOCKED_ACHIEVEMENTS: &str = "unlockedAchievements";
    /// Duo affection counter.
    pub const AFFECTION_COUNT: &str = "affectionCount";
    /// Duo last affection sender.
    pub const LAST_AFFECTION_SENT_BY: &str = "lastAffectionSentBy";
    /// Duo last affection instant.
    pub const LAST_AFFECTION_AT: &str = "lastAffectionAt";
    /// Duo custom categories.
    pub const CUSTOM_CATEGORIES: &str = "customCategories";
    /// Duo anniversary.
    pub const RELATIONSHIP_START_DATE: &str = "relationshipStartDate";

    /// Path of a member-mirror field on the duo record.
    #[must_use]
    pub fn member(user: &UserId, name: &str) -> String {
        format!("memberProfiles.{user}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_duo() -> Duo {
        let a = UserId::from("alice");
        let b = UserId::from("bob");
        let mut profiles = BTreeMap::new();
        let _ = profiles.insert(
            a.clone(),
            MemberProfile {
                display_name: "Alice".into(),
                nickname: String::new(),
                avatar_id: "mage".into(),
                xp: 120,
                level: 2,
                quests_completed: 4,
            },
        );
        Duo {
            id: DuoId::for_members(&a, &b),
            member_ids: [a, b],
            member_profiles: profiles,
            relationship_type: RelationshipType::Couple,
            affection_count: 3,
            last_affection_sent_by: None,
            last_affection_at: None,
            custom_categories: vec![],
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            current_streak: 2,
            best_streak: 5,
            last_streak_date: NaiveDate::from_ymd_opt(2024, 1, 2),
            relationship_start_date: None,
            unlocked_achievements: vec![],
        }
    }

    #[test]
    fn priority_base_xp() {
        assert_eq!(QuestPriority::Easy.base_xp(), 10);
        assert_eq!(QuestPriority::Medium.base_xp(), 25);
        assert_eq!(QuestPriority::Hard.base_xp(), 50);
    }

    #[test]
    fn unknown_priority_label_falls_back_to_ten() {
        assert_eq!(QuestPriority::base_xp_for_label("legendary"), 10);
        assert_eq!(QuestPriority::base_xp_for_label("hard"), 50);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&QuestStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert!(QuestStatus::Expired.is_terminal());
        assert!(!QuestStatus::Completed.is_terminal());
    }

    #[test]
    fn duo_partner_lookup() {
        let duo = sample_duo();
        assert_eq!(duo.partner_of(&"alice".into()).unwrap().as_str(), "bob");
        assert_eq!(duo.partner_of(&"bob".into()).unwrap().as_str(), "alice");
        assert!(duo.partner_of(&"carol".into()).is_none());
    }

    #[test]
    fn duo_serializes_camel_case_with_member_map() {
        let json = serde_json::to_value(sample_duo()).unwrap();
        assert_eq!(json["memberProfiles"]["alice"]["questsCompleted"], 4);
        assert_eq!(json["lastStreakDate"], "2024-01-02");
        assert_eq!(json["memberIds"][1], "bob");
    }

    #[test]
    fn days_together_counts_whole_days() {
        let mut duo = sample_duo();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(duo.days_together(now), 0);
        duo.relationship_start_date = Some(Utc.with_ymd_and_hms(2024, 1, 31, 18, 0, 0).unwrap());
        assert_eq!(duo.days_together(now), 29);
        duo.relationship_start_date = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(duo.days_together(now), 0);
    }

    #[test]
    fn snapshot_reads_member_and_duo_fields() {
        let duo = sample_duo();
        let now = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let snap = ProgressionSnapshot::for_member(&duo, &"alice".into(), now);
        assert_eq!(snap.xp, 120);
        assert_eq!(snap.level, 2);
        assert_eq!(snap.quests_completed, 4);
        assert_eq!(snap.affection_count, 3);
        assert_eq!(snap.best_streak, 5);

        let missing = ProgressionSnapshot::for_member(&duo, &"bob".into(), now);
        assert_eq!(missing.level, 1);
        assert_eq!(missing.xp, 0);
    }

    #[test]
    fn category_slug() {
        assert_eq!(Category::slug("  Board   Games "), "board-games");
        assert_eq!(Category::slug("Garden"), "garden");
    }

    #[test]
    fn categories_put_defaults_first() {
        let mut duo = sample_duo();
        duo.custom_categories.push(Category {
            id: "garden".into(),
            name: "Garden".into(),
            icon: "🌱".into(),
            is_default: false,
        });
        let all = duo.categories();
        assert_eq!(all.first().unwrap().id, "all");
        assert_eq!(all.last().unwrap().id, "garden");
        assert_eq!(all.len(), default_categories().len() + 1);
    }

    #[test]
    fn member_field_path() {
        assert_eq!(
            field::member(&"alice".into(), field::XP),
            "memberProfiles.alice.xp"
        );
    }

    #[test]
    fn quest_roundtrips_through_json() {
        let quest = Quest {
            id: "quest-1".into(),
            title: "Water plants".into(),
            description: String::new(),
            category_id: "chores".into(),
            created_by: "alice".into(),
            assigned_to: "bob".into(),
            due_date: None,
            priority: QuestPriority::Easy,
            base_xp: 10,
            earned_xp: 0,
            status: QuestStatus::Active,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            completed_at: None,
            recurring: None,
            reminder_id: None,
        };
        let json = serde_json::to_value(&quest).unwrap();
        assert_eq!(json["assignedTo"], "bob");
        assert!(json.get("reminderId").is_none());
        let back: Quest = serde_json::from_value(json).unwrap();
        assert_eq!(back, quest);
    }
}
