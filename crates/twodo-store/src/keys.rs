//! Document keys.
//!
//! Keys are slash-separated paths. A collection key (`duos/{id}/quests`)
//! addresses no document itself; [`DocKey::is_child_of`] selects its direct
//! children.

use serde::{Deserialize, Serialize};
use std::fmt;
use twodo_core::{DuoId, QuestId, UserId};

/// Path of a document or collection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocKey(String);

impl DocKey {
    /// Wrap a raw path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// `users/{uid}`.
    #[must_use]
    pub fn user(uid: &UserId) -> Self {
        Self(format!("users/{uid}"))
    }

    /// `duos/{duoId}`.
    #[must_use]
    pub fn duo(duo: &DuoId) -> Self {
        Self(format!("duos/{duo}"))
    }

    /// `duos/{duoId}/quests` (collection).
    #[must_use]
    pub fn quests(duo: &DuoId) -> Self {
        Self(format!("duos/{duo}/quests"))
    }

    /// `duos/{duoId}/quests/{questId}`.
    #[must_use]
    pub fn quest(duo: &DuoId, quest: &QuestId) -> Self {
        Self(format!("duos/{duo}/quests/{quest}"))
    }

    /// The raw path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Whether this key is a direct child of `collection`.
    #[must_use]
    pub fn is_child_of(&self, collection: &DocKey) -> bool {
        self.0
            .strip_prefix(collection.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_paths() {
        let duo = DuoId::from("alice_bob");
        assert_eq!(DocKey::user(&"alice".into()).as_str(), "users/alice");
        assert_eq!(DocKey::duo(&duo).as_str(), "duos/alice_bob");
        assert_eq!(
            DocKey::quest(&duo, &"quest-1".into()).as_str(),
            "duos/alice_bob/quests/quest-1"
        );
    }

    #[test]
    fn id_is_last_segment() {
        let key = DocKey::quest(&"d".into(), &"quest-9".into());
        assert_eq!(key.id(), "quest-9");
    }

    #[test]
    fn direct_children_only() {
        let duo = DuoId::from("d");
        let quests = DocKey::quests(&duo);
        assert!(DocKey::quest(&duo, &"q1".into()).is_child_of(&quests));
        assert!(!DocKey::new("duos/d/quests/q1/notes/n1").is_child_of(&quests));
        assert!(!DocKey::new("duos/d/questsX/q1").is_child_of(&quests));
        assert!(!DocKey::duo(&duo).is_child_of(&quests));
        assert!(!DocKey::new("duos/d/quests/").is_child_of(&quests));
    }
}
