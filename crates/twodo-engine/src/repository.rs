//! Typed reads over the document store.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use twodo_core::{Duo, DuoId, ProgressionError, Quest, QuestId, Result, UserId, UserProfile};
use twodo_store::{DocKey, DocumentStore};

/// Deserializing accessor for users, duos and quests.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    /// Wrap a store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    async fn get_typed<T: DeserializeOwned>(&self, key: &DocKey) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// User record, if present.
    pub async fn get_user(&self, uid: &UserId) -> Result<Option<UserProfile>> {
        self.get_typed(&DocKey::user(uid)).await
    }

    /// User record or `NotFound`.
    pub async fn require_user(&self, uid: &UserId) -> Result<UserProfile> {
        self.get_user(uid)
            .await?
            .ok_or_else(|| ProgressionError::user_not_found(uid.as_str()))
    }

    /// Duo record, if present.
    pub async fn get_duo(&self, duo_id: &DuoId) -> Result<Option<Duo>> {
        self.get_typed(&DocKey::duo(duo_id)).await
    }

    /// Duo record or `NotFound`.
    pub async fn require_duo(&self, duo_id: &DuoId) -> Result<Duo> {
        self.get_duo(duo_id)
            .await?
            .ok_or_else(|| ProgressionError::duo_not_found(duo_id.as_str()))
    }

    /// Quest record or `NotFound`.
    pub async fn require_quest(&self, duo_id: &DuoId, quest_id: &QuestId) -> Result<Quest> {
        self.get_typed(&DocKey::quest(duo_id, quest_id))
            .await?
            .ok_or_else(|| ProgressionError::quest_not_found(quest_id.as_str()))
    }

    /// Every quest of a duo, in key order.
    pub async fn list_quests(&self, duo_id: &DuoId) -> Result<Vec<Quest>> {
        self.store
            .list(&DocKey::quests(duo_id))
            .await?
            .into_iter()
            .map(|(_, value)| serde_json::from_value(value).map_err(ProgressionError::from))
            .collect()
    }
}
