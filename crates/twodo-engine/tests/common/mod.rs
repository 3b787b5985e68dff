//! Shared fixture: two paired users over an injected store, a manual clock
//! and a recording scheduler.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use twodo_core::{
    Duo, DuoId, QuestCreateParams, QuestId, QuestPriority, RelationshipType, UserId, UserProfile,
};
use twodo_engine::{ManualClock, ProgressionEngine, RecordingScheduler};
use twodo_store::{DocumentStore, MemoryStore};

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

/// 2024-01-01 09:00 UTC.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

pub struct Harness {
    pub engine: ProgressionEngine,
    pub clock: Arc<ManualClock>,
    pub scheduler: Arc<RecordingScheduler>,
    pub duo_id: DuoId,
}

impl Harness {
    pub async fn on(store: Arc<dyn DocumentStore>) -> Self {
        let clock = Arc::new(ManualClock::new(start()));
        let scheduler = Arc::new(RecordingScheduler::new());
        let engine = ProgressionEngine::new(store)
            .with_clock(clock.clone())
            .with_scheduler(scheduler.clone());

        let _ = engine.create_user(&ALICE.into(), "alice@example.com", "Alice").await.unwrap();
        let _ = engine.create_user(&BOB.into(), "bob@example.com", "Bob").await.unwrap();
        let duo = engine
            .create_duo(&ALICE.into(), &BOB.into(), RelationshipType::Couple)
            .await
            .unwrap();

        Self {
            engine,
            clock,
            scheduler,
            duo_id: duo.id,
        }
    }

    pub async fn memory() -> (Self, Arc<MemoryStore>) {
        let store = MemoryStore::shared();
        (Self::on(store.clone()).await, store)
    }

    pub async fn quest(&self, owner: &str, priority: QuestPriority, due: Option<DateTime<Utc>>) -> QuestId {
        self.engine
            .create_quest(
                &self.duo_id,
                QuestCreateParams {
                    title: format!("{priority} quest for {owner}"),
                    category_id: "chores".into(),
                    assigned_to: Some(owner.into()),
                    created_by: Some(ALICE.into()),
                    due_date: due,
                    priority: Some(priority),
                    ..QuestCreateParams::default()
                },
            )
            .await
            .unwrap()
    }

    pub async fn complete(&self, quest_id: &QuestId, owner: &str) -> twodo_engine::CompletionOutcome {
        self.engine
            .complete_quest(&self.duo_id, quest_id, &owner.into())
            .await
            .unwrap()
    }

    pub async fn user(&self, uid: &str) -> UserProfile {
        self.engine.get_user(&UserId::from(uid)).await.unwrap().unwrap()
    }

    pub async fn duo(&self) -> Duo {
        self.engine.get_duo(&self.duo_id).await.unwrap().unwrap()
    }

    pub fn next_day(&self) {
        self.clock.advance(Duration::days(1));
    }
}
