//! Progression constants.

/// Current version of Two-Do (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "twodo";

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 10;

/// Minimum cumulative XP for levels `1..=MAX_LEVEL` (index 0 is level 1).
pub const LEVEL_THRESHOLDS: [i64; MAX_LEVEL as usize] =
    [0, 100, 250, 500, 1000, 1750, 3000, 5000, 8000, 12000];

/// XP for an `easy` quest.
pub const EASY_XP: i64 = 10;

/// XP for a `medium` quest.
pub const MEDIUM_XP: i64 = 25;

/// XP for a `hard` quest.
pub const HARD_XP: i64 = 50;

/// XP used when a stored priority label is not recognised.
pub const FALLBACK_XP: i64 = 10;

/// Multiplier applied to the base XP of a late completion.
pub const LATE_XP_MULTIPLIER: f64 = 0.5;

/// XP removed from the owner when a quest expires unmet.
pub const MISSED_XP_PENALTY: i64 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3, "VERSION must be semver (MAJOR.MINOR.PATCH)");
        for part in parts {
            let _: u32 = part.parse().expect("each semver segment must be a number");
        }
    }

    #[test]
    fn name_is_lowercase() {
        assert_eq!(NAME, NAME.to_lowercase());
    }

    #[test]
    fn thresholds_start_at_zero_and_strictly_increase() {
        assert_eq!(LEVEL_THRESHOLDS[0], 0);
        for pair in LEVEL_THRESHOLDS.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn late_multiplier_is_a_fraction() {
        assert!(LATE_XP_MULTIPLIER > 0.0 && LATE_XP_MULTIPLIER <= 1.0);
    }
}
