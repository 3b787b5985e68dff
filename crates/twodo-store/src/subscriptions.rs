//! Per-document change notifications.
//!
//! One `broadcast` channel per subscribed key. Backends call
//! [`Subscriptions::publish`] after a batch commits; senders with no live
//! receivers are pruned on publish.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::keys::DocKey;

const CHANNEL_CAPACITY: usize = 64;

/// New body of a document after a committed batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    /// Document that changed.
    pub key: DocKey,
    /// Its body after the commit.
    pub value: Value,
}

/// Registry of change channels keyed by document.
#[derive(Default)]
pub struct Subscriptions {
    senders: Mutex<HashMap<DocKey, broadcast::Sender<DocumentChange>>>,
}

impl Subscriptions {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every future change of `key`.
    pub fn subscribe(&self, key: &DocKey) -> broadcast::Receiver<DocumentChange> {
        self.senders
            .lock()
            .entry(key.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Notify subscribers of `key`.
    pub fn publish(&self, key: &DocKey, value: &Value) {
        let mut senders = self.senders.lock();
        let Some(tx) = senders.get(key) else {
            return;
        };
        if tx.receiver_count() == 0 {
            let _ = senders.remove(key);
            return;
        }
        let _ = tx.send(DocumentChange {
            key: key.clone(),
            value: value.clone(),
        });
    }

    /// Number of keys with a live channel.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.senders.lock().len()
    }
}
