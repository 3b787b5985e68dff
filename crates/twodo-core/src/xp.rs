//! XP and leveling.
//!
//! Pure functions: priority and lateness to XP, XP to level and in-level
//! progress. Levels are 1-based and capped at [`MAX_LEVEL`].

use serde::{Deserialize, Serialize};

use crate::constants::{LATE_XP_MULTIPLIER, LEVEL_THRESHOLDS, MAX_LEVEL, MISSED_XP_PENALTY};
use crate::types::QuestPriority;

/// Position of an XP total inside its level band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// XP earned since reaching `level`.
    pub current_in_level: i64,
    /// Width of the band to the next level (1 at [`MAX_LEVEL`]).
    pub needed_for_next_level: i64,
    /// Level the XP total falls in.
    pub level: u32,
}

/// Base XP for a priority.
#[must_use]
pub fn base_xp_for(priority: QuestPriority) -> i64 {
    priority.base_xp()
}

/// XP awarded for completing a quest of `priority`, halved (floored) when late.
#[must_use]
pub fn earned_xp_for(priority: QuestPriority, is_late: bool) -> i64 {
    let base = base_xp_for(priority);
    if is_late {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let late = (base as f64 * LATE_XP_MULTIPLIER).floor() as i64;
        late.max(0)
    } else {
        base
    }
}

/// XP removed from the owner when a quest expires.
#[must_use]
pub const fn missed_penalty() -> i64 {
    MISSED_XP_PENALTY
}

/// Minimum XP for `level` (clamped to `1..=MAX_LEVEL`).
#[must_use]
pub fn threshold(level: u32) -> i64 {
    let idx = level.clamp(1, MAX_LEVEL) as usize - 1;
    LEVEL_THRESHOLDS[idx]
}

/// Highest level whose threshold is at or below `xp`. Negative XP is level 1.
#[must_use]
pub fn level_of(xp: i64) -> u32 {
    let reached = LEVEL_THRESHOLDS.iter().take_while(|&&t| t <= xp).count();
    u32::try_from(reached).unwrap_or(MAX_LEVEL).max(1)
}

/// Progress of `xp` within its level band.
///
/// At [`MAX_LEVEL`] the band width is reported as 1 and `current_in_level`
/// keeps growing past it.
#[must_use]
pub fn progress_within_level(xp: i64) -> LevelProgress {
    let level = level_of(xp);
    let floor = threshold(level);
    let needed = if level >= MAX_LEVEL {
        1
    } else {
        threshold(level + 1) - floor
    };
    LevelProgress {
        current_in_level: xp - floor,
        needed_for_next_level: needed,
        level,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_boundaries() {
        assert_eq!(level_of(0), 1);
        assert_eq!(level_of(99), 1);
        assert_eq!(level_of(100), 2);
        assert_eq!(level_of(249), 2);
        assert_eq!(level_of(250), 3);
        assert_eq!(level_of(11_999), 9);
        assert_eq!(level_of(12_000), 10);
        assert_eq!(level_of(1_000_000), 10);
    }

    #[test]
    fn negative_xp_is_level_one() {
        assert_eq!(level_of(-5), 1);
        assert_eq!(progress_within_level(-5).current_in_level, -5);
    }

    #[test]
    fn earned_xp_on_time_and_late() {
        assert_eq!(earned_xp_for(QuestPriority::Hard, false), 50);
        assert_eq!(earned_xp_for(QuestPriority::Hard, true), 25);
        assert_eq!(earned_xp_for(QuestPriority::Easy, true), 5);
        assert_eq!(earned_xp_for(QuestPriority::Medium, true), 12);
    }

    #[test]
    fn missed_penalty_is_five() {
        assert_eq!(missed_penalty(), 5);
    }

    #[test]
    fn progress_mid_band() {
        let p = progress_within_level(300);
        assert_eq!(
            p,
            LevelProgress {
                current_in_level: 50,
                needed_for_next_level: 250,
                level: 3
            }
        );
    }

    #[test]
    fn progress_saturates_at_max_level() {
        let p = progress_within_level(12_500);
        assert_eq!(p.level, MAX_LEVEL);
        assert_eq!(p.needed_for_next_level, 1);
        assert_eq!(p.current_in_level, 500);
    }

    #[test]
    fn threshold_clamps_level() {
        assert_eq!(threshold(0), 0);
        assert_eq!(threshold(2), 100);
        assert_eq!(threshold(99), 12_000);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn level_is_monotonic(a in -1_000i64..20_000, b in -1_000i64..20_000) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(level_of(lo) <= level_of(hi));
            }

            #[test]
            fn level_threshold_is_reached(xp in 0i64..20_000) {
                let level = level_of(xp);
                prop_assert!(threshold(level) <= xp);
                if level < MAX_LEVEL {
                    prop_assert!(threshold(level + 1) > xp);
                }
            }

            #[test]
            fn late_award_never_exceeds_on_time(idx in 0usize..3) {
                let p = [QuestPriority::Easy, QuestPriority::Medium, QuestPriority::Hard][idx];
                let late = earned_xp_for(p, true);
                prop_assert!(late >= 0);
                prop_assert!(late <= earned_xp_for(p, false));
            }
        }
    }
}
