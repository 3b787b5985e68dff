//! Error types for the document store.
//!
//! [`StoreError`] is returned by every backend. It converts into
//! [`ProgressionError`] at the engine boundary: precondition failures become
//! `Conflict`, missing documents become `NotFound`, and everything else is
//! `StoreUnavailable`.

use thiserror::Error;
use twodo_core::ProgressionError;

/// Errors from document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A write targeted a document that does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A `Precondition` op did not hold; nothing in the batch was written.
    #[error("precondition failed on {key}.{field}: expected {expected}, found {actual}")]
    PreconditionFailed {
        /// Document key.
        key: String,
        /// Dotted field path.
        field: String,
        /// Value the batch expected.
        expected: serde_json::Value,
        /// Value actually stored.
        actual: serde_json::Value,
    },

    /// A dotted path traversed or targeted a value of the wrong shape.
    #[error("invalid path {path} in {key}: {reason}")]
    InvalidPath {
        /// Document key.
        key: String,
        /// Dotted field path.
        path: String,
        /// What was wrong.
        reason: String,
    },

    /// The backend refused or failed the commit.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Internal error (e.g. a blocking task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

fn entity_of(key: &str) -> &'static str {
    match key.split('/').collect::<Vec<_>>().as_slice() {
        ["users", _] => "User",
        ["duos", _] => "Duo",
        ["duos", _, "quests", _] => "Quest",
        _ => "Document",
    }
}

fn id_of(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

impl From<StoreError> for ProgressionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PreconditionFailed { .. } => Self::Conflict(err.to_string()),
            StoreError::NotFound(key) => Self::NotFound {
                entity: entity_of(&key),
                id: id_of(&key),
            },
            StoreError::Serde(e) => Self::Serialization(e.to_string()),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
