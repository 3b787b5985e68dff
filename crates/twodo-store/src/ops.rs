//! Write operations and their application to JSON documents.
//!
//! [`apply_batch`] is shared by every backend: it stages the touched
//! documents, applies the ops in order against the staged copies and returns
//! the documents to persist. Any failing op aborts the whole batch before a
//! backend writes anything.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{Result, StoreError};
use crate::keys::DocKey;

/// One write in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Replace (or create) the whole document.
    Set {
        /// Target document.
        key: DocKey,
        /// New document body (a JSON object).
        value: Value,
    },
    /// Overwrite dotted fields of an existing document.
    Update {
        /// Target document.
        key: DocKey,
        /// `(dotted path, value)` pairs.
        fields: Vec<(String, Value)>,
    },
    /// Add `delta` to an integer field; a missing field counts as 0.
    Increment {
        /// Target document.
        key: DocKey,
        /// Dotted field path.
        field: String,
        /// Signed amount.
        delta: i64,
    },
    /// Append each value not already present in an array field.
    ArrayUnion {
        /// Target document.
        key: DocKey,
        /// Dotted field path.
        field: String,
        /// Values to add, in order.
        values: Vec<Value>,
    },
    /// Abort the batch unless the field currently equals `expected`.
    /// Missing documents and fields read as `null`.
    Precondition {
        /// Guarded document.
        key: DocKey,
        /// Dotted field path.
        field: String,
        /// Required current value.
        expected: Value,
    },
}

impl WriteOp {
    /// `Set` from any serializable document.
    pub fn set<T: Serialize>(key: DocKey, doc: &T) -> Result<Self> {
        Ok(Self::Set {
            key,
            value: serde_json::to_value(doc)?,
        })
    }

    /// `Update` of a single field.
    #[must_use]
    pub fn update_field(key: DocKey, field: impl Into<String>, value: Value) -> Self {
        Self::Update {
            key,
            fields: vec![(field.into(), value)],
        }
    }

    /// `Increment`.
    #[must_use]
    pub fn increment(key: DocKey, field: impl Into<String>, delta: i64) -> Self {
        Self::Increment {
            key,
            field: field.into(),
            delta,
        }
    }

    /// `Precondition`.
    #[must_use]
    pub fn precondition(key: DocKey, field: impl Into<String>, expected: Value) -> Self {
        Self::Precondition {
            key,
            field: field.into(),
            expected,
        }
    }

    /// Document this op targets.
    #[must_use]
    pub fn key(&self) -> &DocKey {
        match self {
            Self::Set { key, .. }
            | Self::Update { key, .. }
            | Self::Increment { key, .. }
            | Self::ArrayUnion { key, .. }
            | Self::Precondition { key, .. } => key,
        }
    }

    /// Whether the op modifies its document.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Precondition { .. })
    }

    /// Field paths this op touches (`Set` touches the whole document: `""`).
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Set { .. } => vec![""],
            Self::Update { fields, .. } => fields.iter().map(|(f, _)| f.as_str()).collect(),
            Self::Increment { field, .. }
            | Self::ArrayUnion { field, .. }
            | Self::Precondition { field, .. } => vec![field.as_str()],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dotted paths
// ─────────────────────────────────────────────────────────────────────────────

/// Read a dotted path.
#[must_use]
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |cur, seg| cur.as_object()?.get(seg))
}

/// Write a dotted path, creating intermediate objects.
pub fn set_path(doc: &mut Value, key: &DocKey, path: &str, value: Value) -> Result<()> {
    let invalid = |reason: String| StoreError::InvalidPath {
        key: key.to_string(),
        path: path.to_string(),
        reason,
    };
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(invalid("empty path segment".into()));
    }
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments.pop().unwrap_or_default();

    let mut cur = doc;
    for seg in segments {
        let obj = cur
            .as_object_mut()
            .ok_or_else(|| invalid(format!("parent of {seg} is not an object")))?;
        cur = obj
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let obj = cur
        .as_object_mut()
        .ok_or_else(|| invalid(format!("parent of {last} is not an object")))?;
    let _ = obj.insert(last.to_string(), value);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Batch application
// ─────────────────────────────────────────────────────────────────────────────

/// Apply `ops` in order to staged copies of the touched documents.
///
/// `load` is called at most once per key. Returns the final body of every
/// document written by the batch.
pub fn apply_batch<F>(ops: &[WriteOp], mut load: F) -> Result<BTreeMap<DocKey, Value>>
where
    F: FnMut(&DocKey) -> Result<Option<Value>>,
{
    let mut staged: BTreeMap<DocKey, Option<Value>> = BTreeMap::new();
    let mut written: BTreeSet<DocKey> = BTreeSet::new();

    for op in ops {
        let key = op.key();
        if !staged.contains_key(key) {
            let current = load(key)?;
            let _ = staged.insert(key.clone(), current);
        }
        let slot = staged
            .get_mut(key)
            .ok_or_else(|| StoreError::Internal(format!("unstaged key {key}")))?;

        match op {
            WriteOp::Set { value, .. } => {
                if !value.is_object() {
                    return Err(StoreError::InvalidPath {
                        key: key.to_string(),
                        path: String::new(),
                        reason: "document body must be an object".into(),
                    });
                }
                *slot = Some(value.clone());
            }
            WriteOp::Update { fields, .. } => {
                let doc = existing(slot, key)?;
                for (path, value) in fields {
                    set_path(doc, key, path, value.clone())?;
                }
            }
            WriteOp::Increment { field, delta, .. } => {
                let doc = existing(slot, key)?;
                let current = match get_path(doc, field) {
                    None | Some(Value::Null) => 0,
                    Some(v) => v.as_i64().ok_or_else(|| StoreError::InvalidPath {
                        key: key.to_string(),
                        path: field.clone(),
                        reason: format!("cannot increment non-integer {v}"),
                    })?,
                };
                set_path(doc, key, field, Value::from(current.saturating_add(*delta)))?;
            }
            WriteOp::ArrayUnion { field, values, .. } => {
                let doc = existing(slot, key)?;
                let mut items = match get_path(doc, field) {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items.clone(),
                    Some(v) => {
                        return Err(StoreError::InvalidPath {
                            key: key.to_string(),
                            path: field.clone(),
                            reason: format!("cannot union into non-array {v}"),
                        });
                    }
                };
                for v in values {
                    if !items.contains(v) {
                        items.push(v.clone());
                    }
                }
                set_path(doc, key, field, Value::Array(items))?;
            }
            WriteOp::Precondition { field, expected, .. } => {
                let actual = slot
                    .as_ref()
                    .and_then(|doc| get_path(doc, field))
                    .cloned()
                    .unwrap_or(Value::Null);
                if &actual != expected {
                    return Err(StoreError::PreconditionFailed {
                        key: key.to_string(),
                        field: field.clone(),
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
        }
        if op.is_write() {
            let _ = written.insert(key.clone());
        }
    }

    Ok(written
        .into_iter()
        .filter_map(|key| {
            let body = staged.remove(&key).flatten()?;
            Some((key, body))
        })
        .collect())
}

fn existing<'a>(slot: &'a mut Option<Value>, key: &DocKey) -> Result<&'a mut Value> {
    slot.as_mut()
        .ok_or_else(|| StoreError::NotFound(key.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
