// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use super::*;
use crate::config::StoreConfig;
use crate::test_helpers::*;
use crate::transport::DeliveryError;
use serde_json::json;
use tether_core::{ConflictStatus, ManualClock, ResolvedSide, SyncPriority};

struct Fixture {
    engine: SyncEngine,
    clock: Arc<ManualClock>,
    actions: MockActionExecutor,
    syncs: MockSyncExecutor,
}

fn fixture() -> Fixture {
    let clock = clock();
    let actions = MockActionExecutor::new();
    let syncs = MockSyncExecutor::new();
    let engine = SyncEngine::with_store(
        Config::default(),
        store(),
        Collaborators {
            action_executor: Arc::new(actions.clone()),
            sync_executor: Arc::new(syncs.clone()),
            prober: Arc::new(MockProber::new()),
            clock: clock.clone(),
        },
    )
    .unwrap();
    Fixture {
        engine,
        clock,
        actions,
        syncs,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[test]
fn open_creates_store_at_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("tether.db");
    let config = Config {
        store: StoreConfig {
            path: Some(path.clone()),
        },
        ..Config::default()
    };

    let engine = SyncEngine::open(config, Collaborators::disconnected()).unwrap();

    assert!(path.exists());
    let status = engine.status().unwrap();
    assert!(!status.online);
    assert!(!status.started);
    assert_eq!(status.queue.total(), 0);
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = Config::default();
    config.queue.capacity = 0;
    let result = SyncEngine::with_store(config, store(), Collaborators::disconnected());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn enqueue_publishes_and_counts() {
    let f = fixture();
    let mut events = f.engine.subscribe();

    let id = f
        .engine
        .enqueue_action(send_message("c1", "hi"), None, ActionPriority::High)
        .unwrap();

    assert_eq!(
        events.try_recv(),
        Some(EngineEvent::ActionQueued {
            id: id.clone(),
            kind: tether_core::ActionKind::SendMessage,
        })
    );
    assert_eq!(f.engine.status().unwrap().queue.pending, 1);
    assert!(f.engine.cancel_action(&id).unwrap());
    assert_eq!(f.engine.action(&id).unwrap().status, ActionStatus::Cancelled);
}

#[tokio::test]
async fn start_twice_fails_and_stop_requires_start() {
    let f = fixture();
    assert!(matches!(f.engine.stop().await, Err(Error::NotStarted)));

    let (_tx, rx) = mpsc::channel(1);
    f.engine.start(rx).unwrap();
    let (_tx2, rx2) = mpsc::channel(1);
    assert!(matches!(f.engine.start(rx2), Err(Error::AlreadyStarted)));
    assert!(f.engine.status().unwrap().started);

    f.engine.stop().await.unwrap();
    assert!(!f.engine.is_started());
}

#[tokio::test(start_paused = true)]
async fn restored_connection_drains_queue() {
    let f = fixture();
    let (tx, rx) = mpsc::channel(8);
    f.engine.start(rx).unwrap();
    let mut events = f.engine.subscribe();

    let id = f
        .engine
        .enqueue_action(send_message("c1", "hi"), None, ActionPriority::High)
        .unwrap();
    settle().await;
    assert!(f.actions.calls().is_empty());

    tx.send(Reachability::online(tether_core::ConnectionType::Wifi))
        .await
        .unwrap();
    settle().await;

    assert_eq!(f.actions.call_ids(), vec![id.clone()]);
    assert_eq!(f.engine.action(&id).unwrap().status, ActionStatus::Completed);
    let seen: Vec<_> = std::iter::from_fn(|| events.try_recv()).collect();
    assert!(seen.contains(&EngineEvent::Online {
        offline_for: Duration::ZERO
    }));

    tx.send(Reachability::offline()).await.unwrap();
    settle().await;
    assert_eq!(events.try_recv(), Some(EngineEvent::Offline));

    f.engine.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn enqueue_while_online_drains_promptly() {
    let f = fixture();
    let (tx, rx) = mpsc::channel(8);
    f.engine.start(rx).unwrap();
    tx.send(Reachability::online(tether_core::ConnectionType::Cellular))
        .await
        .unwrap();
    settle().await;

    let id = f
        .engine
        .enqueue_action(send_message("c1", "hi"), None, ActionPriority::Medium)
        .unwrap();
    settle().await;

    assert_eq!(f.actions.call_ids(), vec![id]);
    f.engine.stop().await.unwrap();
}

#[tokio::test]
async fn drain_records_delivery_conflicts() {
    let f = fixture();
    f.actions.push(Err(DeliveryError::conflict(
        server_profile("B"),
        f.clock.now(),
    )));
    f.engine
        .enqueue_action(update_bio("u1", "A"), Some("u1".into()), ActionPriority::Medium)
        .unwrap();

    let report = f.engine.drain().await.unwrap().unwrap();

    assert_eq!(report.conflicts.len(), 1);
    let conflicts = f.engine.conflicts().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].conflicted_fields, vec!["bio".to_string()]);
    assert_eq!(f.engine.status().unwrap().pending_conflicts, 1);
}

#[tokio::test]
async fn unresolvable_conflict_shows_as_failed_in_status() {
    let f = fixture();
    f.actions.push(Err(DeliveryError::conflict(
        json!({"chat_id": "c1", "content": "edited elsewhere"}),
        f.clock.now(),
    )));
    f.engine
        .enqueue_action(send_message("c1", "hi"), None, ActionPriority::High)
        .unwrap();

    let report = f.engine.drain().await.unwrap().unwrap();

    assert_eq!(report.failed, 1);
    assert!(f.engine.conflicts().unwrap().is_empty());
    let status = f.engine.status().unwrap();
    assert_eq!(status.queue.failed, 1);
    assert_eq!(status.pending_conflicts, 0);
}

#[tokio::test]
async fn client_wins_resolution_is_requeued() {
    let f = fixture();
    f.actions.push(Err(DeliveryError::conflict(
        server_profile("B"),
        f.clock.now(),
    )));
    f.engine
        .enqueue_action(update_bio("u1", "A"), Some("u1".into()), ActionPriority::Medium)
        .unwrap();
    f.engine.drain().await.unwrap();
    let id = f.engine.conflicts().unwrap()[0].id.clone();

    let result = f
        .engine
        .resolve_conflict(&id, Some(ResolutionStrategy::ClientWins), None)
        .unwrap();

    let ResolutionResult::Resolved(record) = result else {
        panic!("expected a resolution");
    };
    assert_eq!(record.resolution.unwrap().winner, ResolvedSide::Local);
    let pending = f.engine.actions(Some(ActionStatus::Pending)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, tether_core::ActionKind::UpdateProfile);
    assert_eq!(pending[0].target_id.as_deref(), Some("u1"));

    // Resolving again changes nothing.
    let again = f.engine.resolve_conflict(&id, None, None).unwrap();
    assert!(matches!(again, ResolutionResult::AlreadyResolved(_)));
    assert_eq!(f.engine.actions(Some(ActionStatus::Pending)).unwrap().len(), 1);
}

#[tokio::test]
async fn server_wins_resolution_is_not_requeued() {
    let f = fixture();
    f.actions.push(Err(DeliveryError::conflict(
        server_profile("B"),
        f.clock.now(),
    )));
    f.engine
        .enqueue_action(update_bio("u1", "A"), Some("u1".into()), ActionPriority::Medium)
        .unwrap();
    f.engine.drain().await.unwrap();
    let id = f.engine.conflicts().unwrap()[0].id.clone();

    f.engine
        .resolve_conflict(&id, Some(ResolutionStrategy::ServerWins), None)
        .unwrap();

    assert_eq!(f.engine.conflict(&id).unwrap().status, ConflictStatus::Resolved);
    assert!(f.engine.actions(Some(ActionStatus::Pending)).unwrap().is_empty());
}

#[tokio::test]
async fn force_sync_limits_to_domain() {
    let f = fixture();
    let (tx, rx) = mpsc::channel(8);
    f.engine.start(rx).unwrap();
    tx.send(Reachability::online(tether_core::ConnectionType::Wifi))
        .await
        .unwrap();
    settle().await;

    let chat = f
        .engine
        .schedule_sync(SyncRequest::new(SyncDomain::Chats, SyncPriority::High).target("c1"))
        .unwrap();
    f.engine
        .schedule_sync(SyncRequest::new(SyncDomain::Profile, SyncPriority::High).target("u1"))
        .unwrap();

    let report = f
        .engine
        .force_sync(Some(SyncDomain::Chats))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(f.syncs.call_ids(), vec![chat]);
    assert_eq!(f.engine.sync_items().unwrap().len(), 1);
    assert!(f.engine.status().unwrap().last_sync_at.is_some());
    f.engine.stop().await.unwrap();
}

#[tokio::test]
async fn purge_removes_settled_rows_past_retention() {
    let f = fixture();
    let done = f
        .engine
        .enqueue_action(send_message("c1", "done"), None, ActionPriority::Medium)
        .unwrap();
    f.engine.drain().await.unwrap();
    let pending = f
        .engine
        .enqueue_action(send_message("c1", "later"), None, ActionPriority::Medium)
        .unwrap();

    assert_eq!(f.engine.purge().unwrap(), PurgeReport::default());

    f.clock.advance(Duration::from_secs(8 * 24 * 3600));
    let report = f.engine.purge().unwrap();

    assert_eq!(report.actions, 1);
    assert!(f.engine.action(&done).is_err());
    assert!(f.engine.action(&pending).is_ok());
}

#[tokio::test]
async fn disconnected_transport_keeps_actions_queued() {
    let engine =
        SyncEngine::with_store(Config::default(), store(), Collaborators::disconnected()).unwrap();
    let id = engine
        .enqueue_action(send_message("c1", "hi"), None, ActionPriority::High)
        .unwrap();

    let report = engine.drain().await.unwrap().unwrap();

    assert_eq!(report.retried, 1);
    let action = engine.action(&id).unwrap();
    assert_eq!(action.status, ActionStatus::Pending);
    assert_eq!(action.retry_count, 1);
}

#[tokio::test]
async fn background_run_is_reachable_through_facade() {
    let f = fixture();
    f.engine
        .enqueue_action(send_message("c1", "hi"), None, ActionPriority::High)
        .unwrap();

    let summary = f.engine.force_background_run().await.unwrap().unwrap();

    assert_eq!(summary.actions_delivered, 1);
    assert_eq!(f.engine.background_stats().total_runs, 1);
    assert_eq!(f.engine.app_state(), AppState::Foreground);
}
