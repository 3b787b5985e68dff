//! Participants, duo setup and duo-level counters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{info, instrument};
use twodo_core::achievements::Achievement;
use twodo_core::{
    Category, Duo, DuoId, MemberProfile, ProgressionError, RelationshipType, Result, UserId,
    UserProfile, default_categories, field,
};
use twodo_store::{DocKey, DocumentChange, WriteOp};

use crate::engine::ProgressionEngine;
use crate::events::ProgressionEvent;

/// Result of [`ProgressionEngine::send_affection`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectionOutcome {
    /// Counter value after the increment, as re-read.
    pub affection_count: i64,
    /// Achievements unlocked by it.
    pub unlocked: Vec<&'static Achievement>,
}

impl ProgressionEngine {
    /// Create `users/{uid}` with zeroed progression.
    ///
    /// # Errors
    ///
    /// `Validation` for a uid rejected by [`UserId::validate`] or an empty
    /// display name; `Conflict` when the user already exists.
    #[instrument(skip_all, fields(user_id = %uid))]
    pub async fn create_user(
        &self,
        uid: &UserId,
        email: &str,
        display_name: &str,
    ) -> Result<UserProfile> {
        uid.validate()?;
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ProgressionError::Validation("display name is required".into()));
        }

        let profile = UserProfile {
            uid: uid.clone(),
            email: email.trim().to_string(),
            display_name: display_name.to_string(),
            avatar_id: "warrior".into(),
            duo_id: None,
            xp: 0,
            level: 1,
            quests_completed: 0,
            created_at: self.clock.now(),
        };
        let key = DocKey::user(uid);
        self.store
            .commit_batch(vec![
                WriteOp::precondition(key.clone(), "uid", Value::Null),
                WriteOp::set(key, &profile)?,
            ])
            .await?;
        info!("user created");
        Ok(profile)
    }

    /// Link two users into a new duo `{a}_{b}`.
    ///
    /// Member profiles mirror each user's current progression. The duo and
    /// both users' `duoId` are written in one batch, guarded so that neither
    /// user can be linked twice and an existing duo is never overwritten.
    ///
    /// # Errors
    ///
    /// `Validation` for identical members, malformed IDs or a user already
    /// in a duo; `NotFound` for unknown users; `Conflict` if a user was
    /// linked concurrently or the duo ID is taken.
    #[instrument(skip_all, fields(user_a = %a, user_b = %b))]
    pub async fn create_duo(&self, a: &UserId, b: &UserId, relationship: RelationshipType) -> Result<Duo> {
        if a == b {
            return Err(ProgressionError::Validation("a duo needs two different users".into()));
        }
        a.validate()?;
        b.validate()?;
        let user_a = self.repo.require_user(a).await?;
        let user_b = self.repo.require_user(b).await?;
        for user in [&user_a, &user_b] {
            if let Some(existing) = &user.duo_id {
                return Err(ProgressionError::Validation(format!(
                    "user {} is already in duo {existing}",
                    user.uid
                )));
            }
        }

        let id = DuoId::for_members(a, b);
        let member_profiles: BTreeMap<UserId, MemberProfile> = [&user_a, &user_b]
            .into_iter()
            .map(|u| (u.uid.clone(), MemberProfile::mirror(u)))
            .collect();
        let duo = Duo {
            id: id.clone(),
            member_ids: [a.clone(), b.clone()],
            member_profiles,
            relationship_type: relationship,
            affection_count: 0,
            last_affection_sent_by: None,
            last_affection_at: None,
            custom_categories: Vec::new(),
            created_at: self.clock.now(),
            current_streak: 0,
            best_streak: 0,
            last_streak_date: None,
            relationship_start_date: None,
            unlocked_achievements: Vec::new(),
        };

        let mut ops = Vec::with_capacity(6);
        for uid in [a, b] {
            ops.push(WriteOp::precondition(DocKey::user(uid), field::DUO_ID, Value::Null));
        }
        ops.push(WriteOp::precondition(DocKey::duo(&id), "id", Value::Null));
        ops.push(WriteOp::set(DocKey::duo(&id), &duo)?);
        for uid in [a, b] {
            ops.push(WriteOp::update_field(DocKey::user(uid), field::DUO_ID, json!(id)));
        }
        self.store.commit_batch(ops).await?;
        info!(duo_id = %id, "duo created");
        Ok(duo)
    }

    /// User record, if present.
    ///
    /// # Errors
    ///
    /// Store or decoding failures.
    pub async fn get_user(&self, uid: &UserId) -> Result<Option<UserProfile>> {
        self.repo.get_user(uid).await
    }

    /// Duo record, if present.
    ///
    /// # Errors
    ///
    /// Store or decoding failures.
    pub async fn get_duo(&self, duo_id: &DuoId) -> Result<Option<Duo>> {
        self.repo.get_duo(duo_id).await
    }

    /// Committed changes to the duo record.
    pub fn subscribe_duo(&self, duo_id: &DuoId) -> broadcast::Receiver<DocumentChange> {
        self.store.subscribe(&DocKey::duo(duo_id))
    }

    /// Committed changes to a user record.
    pub fn subscribe_user(&self, uid: &UserId) -> broadcast::Receiver<DocumentChange> {
        self.store.subscribe(&DocKey::user(uid))
    }

    /// Record an affection from `from` to their partner.
    ///
    /// The counter increment is primary; the affection achievements are
    /// evaluated afterwards, best-effort.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown duo; `Validation` when `from` is not a member.
    #[instrument(skip_all, fields(duo_id = %duo_id, user_id = %from))]
    pub async fn send_affection(&self, duo_id: &DuoId, from: &UserId) -> Result<AffectionOutcome> {
        let duo = self.repo.require_duo(duo_id).await?;
        require_member(&duo, from)?;
        let now = self.clock.now();
        let key = DocKey::duo(duo_id);
        self.store
            .commit_batch(vec![
                WriteOp::increment(key.clone(), field::AFFECTION_COUNT, 1),
                WriteOp::Update {
                    key,
                    fields: vec![
                        (field::LAST_AFFECTION_SENT_BY.to_string(), json!(from)),
                        (field::LAST_AFFECTION_AT.to_string(), serde_json::to_value(now)?),
                    ],
                },
            ])
            .await?;
        info!("affection sent");
        self.emit(ProgressionEvent::AffectionSent {
            duo_id: duo_id.clone(),
            sent_by: from.clone(),
        });

        let unlocked = self
            .secondary("achievements", self.evaluate_for(duo_id, from, now).await)
            .unwrap_or_default();
        let affection_count = self
            .repo
            .get_duo(duo_id)
            .await
            .ok()
            .flatten()
            .map_or(duo.affection_count + 1, |d| d.affection_count);
        Ok(AffectionOutcome {
            affection_count,
            unlocked,
        })
    }

    /// Add a custom category to the duo.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty name, or an ID that collides with a
    /// built-in or existing custom category.
    #[instrument(skip_all, fields(duo_id = %duo_id))]
    pub async fn add_category(&self, duo_id: &DuoId, name: &str, icon: &str) -> Result<Category> {
        let id = Category::slug(name);
        if id.is_empty() {
            return Err(ProgressionError::Validation("category name is required".into()));
        }
        let duo = self.repo.require_duo(duo_id).await?;
        if default_categories().iter().any(|c| c.id == id) {
            return Err(ProgressionError::Validation(format!(
                "category {id} is a built-in category"
            )));
        }
        if duo.custom_categories.iter().any(|c| c.id == id) {
            return Err(ProgressionError::Validation(format!("category {id} already exists")));
        }

        let category = Category {
            id,
            name: name.trim().to_string(),
            icon: icon.to_string(),
            is_default: false,
        };
        self.store
            .commit_batch(vec![WriteOp::ArrayUnion {
                key: DocKey::duo(duo_id),
                field: field::CUSTOM_CATEGORIES.into(),
                values: vec![serde_json::to_value(&category)?],
            }])
            .await?;
        info!(category_id = %category.id, "category added");
        Ok(category)
    }

    /// Built-in categories followed by the duo's custom ones.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown duo.
    pub async fn categories(&self, duo_id: &DuoId) -> Result<Vec<Category>> {
        Ok(self.repo.require_duo(duo_id).await?.categories())
    }

    /// Set (or clear) the relationship start date, then evaluate the
    /// days-together achievements for both members.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown duo.
    #[instrument(skip_all, fields(duo_id = %duo_id))]
    pub async fn set_relationship_start(
        &self,
        duo_id: &DuoId,
        start: Option<DateTime<Utc>>,
    ) -> Result<Vec<&'static Achievement>> {
        let duo = self.repo.require_duo(duo_id).await?;
        self.store
            .commit_batch(vec![WriteOp::update_field(
                DocKey::duo(duo_id),
                field::RELATIONSHIP_START_DATE,
                serde_json::to_value(start)?,
            )])
            .await?;
        info!(start = ?start, "relationship start updated");

        let now = self.clock.now();
        let mut unlocked = Vec::new();
        for member in &duo.member_ids {
            if let Some(fresh) = self.secondary("achievements", self.evaluate_for(duo_id, member, now).await) {
                unlocked.extend(fresh);
            }
        }
        Ok(unlocked)
    }
}

fn require_member(duo: &Duo, user: &UserId) -> Result<()> {
    if duo.is_member(user) {
        Ok(())
    } else {
        Err(ProgressionError::Validation(format!(
            "user {user} is not a member of duo {}",
            duo.id
        )))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
