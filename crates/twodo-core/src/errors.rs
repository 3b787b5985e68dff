//! Progression error types.
//!
//! `Validation` and `InvalidTransition` are raised before any write is issued.
//! `Conflict` and `StoreUnavailable` come back from the document store and are
//! the only retryable variants; the engine never retries them on its own for
//! primary writes.

use thiserror::Error;

use crate::lifecycle::QuestAction;
use crate::types::QuestStatus;

/// Errors from progression operations.
#[derive(Debug, Error)]
pub enum ProgressionError {
    /// Input rejected before any write (empty title, missing owner, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The quest is not in a state (or not owned by the actor) that allows the action.
    #[error("Invalid transition: cannot {action} quest {quest_id} in status {status}: {reason}")]
    InvalidTransition {
        /// Quest the action targeted.
        quest_id: String,
        /// Status the quest was in.
        status: QuestStatus,
        /// Attempted action.
        action: QuestAction,
        /// Why the transition was refused.
        reason: String,
    },

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type (e.g., "Quest", "Duo", "User").
        entity: &'static str,
        /// The ID that was looked up.
        id: String,
    },

    /// Two writers raced on a non-commutative field.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The document store could not be reached or failed to commit.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for progression operations.
pub type Result<T> = std::result::Result<T, ProgressionError>;

impl ProgressionError {
    /// Create a not-found error for a quest.
    pub fn quest_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Quest",
            id: id.into(),
        }
    }

    /// Create a not-found error for a duo.
    pub fn duo_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Duo",
            id: id.into(),
        }
    }

    /// Create a not-found error for a user.
    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "User",
            id: id.into(),
        }
    }

    /// Whether the caller may retry the same operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::StoreUnavailable(_))
    }
}

impl From<serde_json::Error> for ProgressionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quest_not_found_display() {
        let err = ProgressionError::quest_not_found("quest-123");
        assert_eq!(err.to_string(), "Quest not found: quest-123");
    }

    #[test]
    fn duo_not_found_display() {
        let err = ProgressionError::duo_not_found("a_b");
        assert_eq!(err.to_string(), "Duo not found: a_b");
    }

    #[test]
    fn validation_display() {
        let err = ProgressionError::Validation("title is required".to_string());
        assert_eq!(err.to_string(), "Validation error: title is required");
    }

    #[test]
    fn invalid_transition_display() {
        let err = ProgressionError::InvalidTransition {
            quest_id: "q1".to_string(),
            status: QuestStatus::Deleted,
            action: QuestAction::Complete,
            reason: "quest is deleted".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot complete quest q1 in status deleted: quest is deleted"
        );
    }

    #[test]
    fn only_store_errors_are_retryable() {
        assert!(ProgressionError::Conflict("x".into()).is_retryable());
        assert!(ProgressionError::StoreUnavailable("x".into()).is_retryable());
        assert!(!ProgressionError::Validation("x".into()).is_retryable());
        assert!(!ProgressionError::user_not_found("u").is_retryable());
    }

    #[test]
    fn serde_error_converts_to_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err = ProgressionError::from(json_err);
        assert!(matches!(err, ProgressionError::Serialization(_)));
    }
}
