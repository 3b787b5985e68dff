//! The document store capability.
//!
//! The engine only ever talks to a `dyn DocumentStore`; backends live in
//! [`crate::memory`] and [`crate::sqlite`].

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::errors::Result;
use crate::keys::DocKey;
use crate::ops::WriteOp;
use crate::subscriptions::DocumentChange;

/// Key-addressed JSON document store with all-or-nothing batches.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document.
    async fn get(&self, key: &DocKey) -> Result<Option<Value>>;

    /// Direct children of `collection`, ordered by key.
    async fn list(&self, collection: &DocKey) -> Result<Vec<(DocKey, Value)>>;

    /// Commit `ops` atomically. Either every op applies or none does;
    /// subscribers are notified only after success.
    async fn commit_batch(&self, ops: Vec<WriteOp>) -> Result<()>;

    /// Receive changes to `key` committed from now on.
    fn subscribe(&self, key: &DocKey) -> broadcast::Receiver<DocumentChange>;

    /// Replace (or create) a document.
    async fn set(&self, key: &DocKey, value: Value) -> Result<()> {
        self.commit_batch(vec![WriteOp::Set {
            key: key.clone(),
            value,
        }])
        .await
    }

    /// Overwrite fields of an existing document.
    async fn update(&self, key: &DocKey, fields: Vec<(String, Value)>) -> Result<()> {
        self.commit_batch(vec![WriteOp::Update {
            key: key.clone(),
            fields,
        }])
        .await
    }

    /// Atomically add `delta` to an integer field.
    async fn atomic_increment(&self, key: &DocKey, field: &str, delta: i64) -> Result<()> {
        self.commit_batch(vec![WriteOp::increment(key.clone(), field, delta)])
            .await
    }
}
