//! Full flows against the SQLite store.

mod common;

use std::sync::Arc;

use common::{ALICE, BOB, Harness, at};
use twodo_core::{QuestPriority, QuestStatus, UserId};
use twodo_engine::{ProgressionEngine, QuestFilter};
use twodo_store::{ConnectionConfig, SqliteStore};

#[tokio::test]
async fn complete_undo_and_sweep_on_sqlite() {
    let h = Harness::on(Arc::new(SqliteStore::in_memory().unwrap())).await;
    let done = h.quest(BOB, QuestPriority::Hard, None).await;
    let overdue = h.quest(ALICE, QuestPriority::Easy, Some(at(1, 12))).await;

    let outcome = h.complete(&done, BOB).await;
    assert_eq!(outcome.earned_xp, 50);
    assert_eq!(outcome.new_streak, Some(1));
    assert_eq!(h.user(BOB).await.xp, 50);

    h.clock.set(at(2, 9));
    let report = h.engine.expire_sweep(&h.duo_id).await.unwrap();
    assert_eq!(report.expired, vec![overdue]);
    assert_eq!(h.user(ALICE).await.xp, -5);

    h.engine.undo_quest(&h.duo_id, &done, &BOB.into()).await.unwrap();
    let duo = h.duo().await;
    assert_eq!(duo.member_profiles[&UserId::from(BOB)].xp, 0);
    assert_eq!(duo.member_profiles[&UserId::from(ALICE)].xp, -5);
    assert_eq!(duo.unlocked_achievements, vec!["first_quest".to_string()]);
}

#[tokio::test]
async fn progression_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("twodo.db");
    let path = path.to_str().unwrap();

    let (duo_id, qid) = {
        let store = SqliteStore::open(path, &ConnectionConfig::default()).unwrap();
        let h = Harness::on(Arc::new(store)).await;
        let qid = h.quest(BOB, QuestPriority::Medium, None).await;
        let _ = h.complete(&qid, BOB).await;
        (h.duo_id.clone(), qid)
    };

    let store = SqliteStore::open(path, &ConnectionConfig::default()).unwrap();
    let engine = ProgressionEngine::new(Arc::new(store));
    let quest = engine.get_quest(&duo_id, &qid).await.unwrap();
    assert_eq!(quest.status, QuestStatus::Completed);
    assert_eq!(quest.earned_xp, 25);

    let bob = engine.get_user(&BOB.into()).await.unwrap().unwrap();
    assert_eq!((bob.xp, bob.quests_completed), (25, 1));
    let duo = engine.get_duo(&duo_id).await.unwrap().unwrap();
    assert_eq!(duo.current_streak, 1);

    let completed = engine
        .list_quests(
            &duo_id,
            &QuestFilter {
                status: Some(QuestStatus::Completed),
                ..QuestFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_completions_keep_aggregates_consistent() {
    let h = Arc::new(Harness::on(Arc::new(SqliteStore::in_memory().unwrap())).await);
    let mut ids = Vec::new();
    for owner in [ALICE, BOB, ALICE, BOB, ALICE, BOB] {
        ids.push((owner, h.quest(owner, QuestPriority::Easy, None).await));
    }

    let mut tasks = Vec::new();
    for (owner, qid) in ids {
        let h = Arc::clone(&h);
        tasks.push(tokio::spawn(async move {
            h.engine.complete_quest(&h.duo_id, &qid, &owner.into()).await.unwrap()
        }));
    }
    for task in tasks {
        let _ = task.await.unwrap();
    }

    let duo = h.duo().await;
    for uid in [ALICE, BOB] {
        let user = h.user(uid).await;
        assert_eq!((user.xp, user.quests_completed), (30, 3));
        let mirror = &duo.member_profiles[&UserId::from(uid)];
        assert_eq!((mirror.xp, mirror.quests_completed), (30, 3));
    }
    assert_eq!(duo.current_streak, 1);
    assert_eq!(duo.unlocked_achievements, vec!["first_quest".to_string()]);
}
