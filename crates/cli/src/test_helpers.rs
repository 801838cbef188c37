// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared by command and display tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tether_core::clock::from_millis;
use tether_core::{
    ActionKind, ActionPayload, ActionPriority, ConflictKind, ConflictRecord, ConflictStatus,
    ManualClock, QueuedAction, Store,
};
use tether_engine::{Collaborators, Config, Disconnected, SyncEngine};

/// 2026-01-01T00:00:00Z plus `secs`.
pub fn at(secs: i64) -> DateTime<Utc> {
    from_millis(1_767_225_600_000 + secs * 1000)
}

pub fn like_action(id: &str, user_id: &str) -> QueuedAction {
    QueuedAction::new(
        id.to_string(),
        ActionPayload::Like {
            user_id: user_id.to_string(),
        },
        Some(user_id.to_string()),
        ActionPriority::Medium,
        3,
        at(0),
    )
}

/// A pending profile conflict where the local edit is an hour newer.
pub fn profile_conflict(id: &str) -> ConflictRecord {
    ConflictRecord {
        id: id.to_string(),
        kind: ConflictKind::ProfileUpdate,
        entity_id: "user-1".to_string(),
        entity_type: "profile".to_string(),
        local_version: json!({"user_id": "user-1", "name": "Ana", "bio": "climber"}),
        server_version: json!({"user_id": "user-1", "name": "Anna", "bio": "hiker"}),
        local_timestamp: at(3600),
        server_timestamp: at(0),
        conflicted_fields: vec!["bio".to_string(), "name".to_string()],
        description: "profile_update on user-1: bio, name differ".to_string(),
        status: ConflictStatus::Pending,
        resolution: None,
        source_action: Some(ActionKind::UpdateProfile),
        created_at: at(3600),
    }
}

pub struct TestEngine {
    pub engine: SyncEngine,
    pub store: Store,
    pub clock: ManualClock,
}

/// An engine over an in-memory store with a frozen clock and no network.
pub fn test_engine() -> TestEngine {
    let store = Store::open_in_memory().unwrap();
    let clock = ManualClock::default();
    let engine = engine_over(&store, &clock);
    TestEngine {
        engine,
        store,
        clock,
    }
}

/// An engine over a store seeded before construction.
pub fn engine_over(store: &Store, clock: &ManualClock) -> SyncEngine {
    let collaborators = Collaborators {
        action_executor: Arc::new(Disconnected),
        sync_executor: Arc::new(Disconnected),
        prober: Arc::new(Disconnected),
        clock: Arc::new(clock.clone()),
    };
    SyncEngine::with_store(Config::default(), store.clone(), collaborators).unwrap()
}
