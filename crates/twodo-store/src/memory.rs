//! Process-local document store.
//!
//! Backs tests and short-lived tools. Faults can be injected per batch so
//! tests can fail a specific secondary write (e.g. only batches touching
//! `currentStreak`) and check that the primary effect survives.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::errors::{Result, StoreError};
use crate::keys::DocKey;
use crate::ops::{WriteOp, apply_batch};
use crate::subscriptions::{DocumentChange, Subscriptions};
use crate::traits::DocumentStore;

/// Error an injected fault produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// `StoreError::Unavailable`.
    Unavailable,
    /// `StoreError::PreconditionFailed`.
    Conflict,
}

type Matcher = Box<dyn Fn(&[WriteOp]) -> bool + Send + Sync>;

struct Fault {
    kind: FaultKind,
    remaining: Option<usize>,
    matcher: Matcher,
}

impl Fault {
    fn error(&self, ops: &[WriteOp]) -> StoreError {
        let key = ops.first().map(|op| op.key().to_string()).unwrap_or_default();
        match self.kind {
            FaultKind::Unavailable => StoreError::Unavailable(format!("injected failure on {key}")),
            FaultKind::Conflict => StoreError::PreconditionFailed {
                key,
                field: "<injected>".into(),
                expected: Value::Null,
                actual: Value::Null,
            },
        }
    }
}

/// In-memory [`DocumentStore`].
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<DocKey, Value>>,
    subscriptions: Subscriptions,
    faults: Mutex<Vec<Fault>>,
    commits: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind an `Arc`.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Fail the next `count` batches with `StoreError::Unavailable`.
    pub fn fail_next_commits(&self, count: usize) {
        self.inject(FaultKind::Unavailable, Some(count), |_| true);
    }

    /// Fail batches that touch `field` on any document, `times` times
    /// (`None` for every matching batch).
    pub fn fail_commits_touching(&self, field: &str, kind: FaultKind, times: Option<usize>) {
        let field = field.to_string();
        self.inject(kind, times, move |ops| {
            ops.iter()
                .filter(|op| op.is_write())
                .any(|op| op.fields().iter().any(|f| *f == field))
        });
    }

    /// Fail matching batches with `kind`, `times` times (`None` for always).
    pub fn inject<F>(&self, kind: FaultKind, times: Option<usize>, matcher: F)
    where
        F: Fn(&[WriteOp]) -> bool + Send + Sync + 'static,
    {
        self.faults.lock().push(Fault {
            kind,
            remaining: times,
            matcher: Box::new(matcher),
        });
    }

    /// Remove every injected fault.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Number of batches committed successfully.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    fn take_fault(&self, ops: &[WriteOp]) -> Option<StoreError> {
        let mut faults = self.faults.lock();
        let idx = faults.iter().position(|f| (f.matcher)(ops))?;
        let err = faults[idx].error(ops);
        if let Some(remaining) = faults[idx].remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                let _ = faults.remove(idx);
            }
        }
        Some(err)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Value>> {
        Ok(self.docs.read().get(key).cloned())
    }

    async fn list(&self, collection: &DocKey) -> Result<Vec<(DocKey, Value)>> {
        Ok(self
            .docs
            .read()
            .iter()
            .filter(|(k, _)| k.is_child_of(collection))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn commit_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        if let Some(err) = self.take_fault(&ops) {
            debug!(error = %err, "injected commit failure");
            return Err(err);
        }

        let written = {
            let mut docs = self.docs.write();
            let written = apply_batch(&ops, |key| Ok(docs.get(key).cloned()))?;
            for (key, body) in &written {
                let _ = docs.insert(key.clone(), body.clone());
            }
            written
        };
        let _ = self.commits.fetch_add(1, Ordering::SeqCst);

        for (key, body) in &written {
            self.subscriptions.publish(key, body);
        }
        Ok(())
    }

    fn subscribe(&self, key: &DocKey) -> broadcast::Receiver<DocumentChange> {
        self.subscriptions.subscribe(key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn user() -> DocKey {
        DocKey::new("users/alice")
    }

    #[tokio::test]
    async fn set_get_roundtrip() {
        let store = MemoryStore::new();
        store.set(&user(), json!({"xp": 0})).await.unwrap();
        assert_eq!(store.get(&user()).await.unwrap(), Some(json!({"xp": 0})));
        assert!(store.get(&DocKey::new("users/bob")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = MemoryStore::shared();
        store.set(&user(), json!({"xp": 0})).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.atomic_increment(&user(), "xp", 5).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.get(&user()).await.unwrap().unwrap()["xp"], 100);
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_trace() {
        let store = MemoryStore::new();
        store.set(&user(), json!({"xp": 10})).await.unwrap();
        let ops = vec![
            WriteOp::increment(user(), "xp", 5),
            WriteOp::increment(DocKey::new("users/ghost"), "xp", 5),
        ];
        assert_matches!(store.commit_batch(ops).await, Err(StoreError::NotFound(_)));
        assert_eq!(store.get(&user()).await.unwrap().unwrap()["xp"], 10);
    }

    #[tokio::test]
    async fn list_returns_direct_children() {
        let store = MemoryStore::new();
        let quests = DocKey::new("duos/d/quests");
        store.set(&DocKey::new("duos/d"), json!({})).await.unwrap();
        store.set(&DocKey::new("duos/d/quests/q2"), json!({"n": 2})).await.unwrap();
        store.set(&DocKey::new("duos/d/quests/q1"), json!({"n": 1})).await.unwrap();
        store.set(&DocKey::new("duos/e/quests/q3"), json!({"n": 3})).await.unwrap();

        let listed = store.list(&quests).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|(k, _)| k.id()).collect();
        assert_eq!(ids, vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn fail_next_commits_counts_down() {
        let store = MemoryStore::new();
        store.fail_next_commits(2);
        assert_matches!(store.set(&user(), json!({})).await, Err(StoreError::Unavailable(_)));
        assert_matches!(store.set(&user(), json!({})).await, Err(StoreError::Unavailable(_)));
        store.set(&user(), json!({})).await.unwrap();
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn field_fault_only_hits_matching_batches() {
        let store = MemoryStore::new();
        store.set(&user(), json!({})).await.unwrap();
        store.fail_commits_touching("currentStreak", FaultKind::Conflict, None);

        store.atomic_increment(&user(), "xp", 1).await.unwrap();
        assert_matches!(
            store.update(&user(), vec![("currentStreak".into(), json!(1))]).await,
            Err(StoreError::PreconditionFailed { .. })
        );
        store.clear_faults();
        store.update(&user(), vec![("currentStreak".into(), json!(1))]).await.unwrap();
    }

    #[tokio::test]
    async fn subscribers_see_committed_body() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe(&user());
        store.set(&user(), json!({"xp": 0})).await.unwrap();
        store.atomic_increment(&user(), "xp", 25).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().value["xp"], 0);
        assert_eq!(rx.recv().await.unwrap().value["xp"], 25);
    }

    #[tokio::test]
    async fn failed_commit_is_not_published() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe(&user());
        store.fail_next_commits(1);
        let _ = store.set(&user(), json!({})).await;
        assert!(rx.try_recv().is_err());
    }
}
