//! Branded ID newtypes.
//!
//! Users, duos and quests each get a distinct ID type so a quest ID can never
//! be handed to something expecting a user ID. Generated IDs are UUID v7
//! (time-ordered) with an entity prefix; user IDs come from the
//! authentication provider and are only ever wrapped.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{ProgressionError, Result};

/// Generate a prefixed UUID v7 string.
fn prefixed_v7(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7())
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Stable identity issued by the authentication provider.
    UserId
}

branded_id! {
    /// Identifier of a two-participant duo.
    DuoId
}

branded_id! {
    /// Identifier of a quest within a duo.
    QuestId
}

impl QuestId {
    /// Create a new quest ID (`quest-{uuid v7}`).
    #[must_use]
    pub fn generate() -> Self {
        Self(prefixed_v7("quest"))
    }
}

impl UserId {
    /// Characters a user ID may not contain. `.` and `/` separate field paths
    /// and document keys; `_` joins the members of a duo ID.
    pub const RESERVED: [char; 3] = ['.', '/', '_'];

    /// Reject IDs that cannot be embedded in keys, field paths or duo IDs.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty ID, surrounding whitespace or a reserved
    /// character.
    pub fn validate(&self) -> Result<()> {
        if self.0.trim().is_empty() {
            return Err(ProgressionError::Validation("user id is required".into()));
        }
        if self.0.trim() != self.0 {
            return Err(ProgressionError::Validation(format!(
                "user id {:?} has surrounding whitespace",
                self.0
            )));
        }
        if let Some(c) = self.0.chars().find(|c| Self::RESERVED.contains(c)) {
            return Err(ProgressionError::Validation(format!(
                "user id {:?} contains reserved character {c:?}",
                self.0
            )));
        }
        Ok(())
    }
}

impl DuoId {
    /// Deterministic duo ID for a pair of members (`{a}_{b}`). Unambiguous
    /// only for IDs that pass [`UserId::validate`].
    #[must_use]
    pub fn for_members(a: &UserId, b: &UserId) -> Self {
        Self(format!("{a}_{b}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_quest_id_is_prefixed_uuid_v7() {
        let id = QuestId::generate();
        let raw = id.as_str().strip_prefix("quest-").expect("quest- prefix");
        let parsed = Uuid::parse_str(raw).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn generated_quest_ids_are_unique() {
        assert_ne!(QuestId::generate(), QuestId::generate());
    }

    #[test]
    fn duo_id_joins_members() {
        let id = DuoId::for_members(&UserId::from("alice"), &UserId::from("bob"));
        assert_eq!(id.as_str(), "alice_bob");
    }

    #[test]
    fn user_id_rejects_path_separators() {
        for bad in ["", "  ", " alice", "alice.smith", "a/b", "a_b"] {
            assert!(
                matches!(UserId::from(bad).validate(), Err(ProgressionError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
        for good in ["alice", "u-1", "Bob42", "firebase-UID-xyz"] {
            assert!(UserId::from(good).validate().is_ok(), "{good:?} should pass");
        }
    }

    #[test]
    fn deref_and_display() {
        let id = UserId::from("u-1");
        let s: &str = &id;
        assert_eq!(s, "u-1");
        assert_eq!(format!("{id}"), "u-1");
    }

    #[test]
    fn serde_is_transparent() {
        let id = QuestId::from("quest-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"quest-1\"");
        let back: QuestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn into_inner_returns_string() {
        let id = DuoId::from("duo-x");
        assert_eq!(id.into_inner(), "duo-x");
    }
}
