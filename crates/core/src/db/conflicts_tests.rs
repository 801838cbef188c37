// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::action::ActionKind;
use crate::conflict::{ConflictKind, ResolutionStrategy, ResolvedBy, ResolvedSide};
use chrono::{Duration, TimeZone};
use serde_json::json;

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_225_600, 0).unwrap()
}

fn record(id: &str) -> ConflictRecord {
    ConflictRecord {
        id: id.into(),
        kind: ConflictKind::ProfileUpdate,
        entity_id: "u-1".into(),
        entity_type: "profile".into(),
        local_version: json!({"bio": "A", "age": 30}),
        server_version: json!({"bio": "B", "age": 30}),
        local_timestamp: t0() + Duration::seconds(2),
        server_timestamp: t0(),
        conflicted_fields: vec!["bio".into()],
        description: "profile u-1 changed locally and on the server: bio".into(),
        status: ConflictStatus::Pending,
        resolution: None,
        source_action: Some(ActionKind::UpdateProfile),
        created_at: t0(),
    }
}

fn resolution(at: DateTime<Utc>) -> Resolution {
    Resolution {
        strategy: ResolutionStrategy::Merge,
        value: json!({"bio": "A", "age": 30}),
        winner: ResolvedSide::Merged,
        resolved_by: ResolvedBy::System,
        reason: "merged fields: bio".into(),
        resolved_at: at,
    }
}

#[test]
fn insert_and_get_round_trips() {
    let store = Store::open_in_memory().unwrap();
    let rec = record("cfl-1");
    store.insert_conflict(&rec).unwrap();
    assert_eq!(store.get_conflict("cfl-1").unwrap(), rec);
    assert!(store.conflict_exists("cfl-1").unwrap());
    assert!(matches!(
        store.get_conflict("cfl-2"),
        Err(Error::ConflictNotFound(_))
    ));
}

#[test]
fn resolution_is_saved_once() {
    let store = Store::open_in_memory().unwrap();
    store.insert_conflict(&record("cfl-1")).unwrap();

    assert!(store.save_resolution("cfl-1", &resolution(t0())).unwrap());
    let loaded = store.get_conflict("cfl-1").unwrap();
    assert_eq!(loaded.status, ConflictStatus::Resolved);
    assert_eq!(loaded.resolution, Some(resolution(t0())));

    let later = resolution(t0() + Duration::hours(1));
    assert!(!store.save_resolution("cfl-1", &later).unwrap());
    assert_eq!(
        store.get_conflict("cfl-1").unwrap().resolution,
        Some(resolution(t0()))
    );
}

#[test]
fn list_and_count_by_status() {
    let store = Store::open_in_memory().unwrap();
    store.insert_conflict(&record("cfl-1")).unwrap();
    store.insert_conflict(&record("cfl-2")).unwrap();
    store.insert_conflict(&record("cfl-3")).unwrap();
    store.save_resolution("cfl-2", &resolution(t0())).unwrap();
    assert!(store
        .set_conflict_status("cfl-3", ConflictStatus::Cancelled)
        .unwrap());

    let pending = store.list_conflicts(Some(ConflictStatus::Pending)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "cfl-1");
    assert_eq!(store.list_conflicts(None).unwrap().len(), 3);
    assert_eq!(store.count_conflicts(ConflictStatus::Resolved).unwrap(), 1);
    assert_eq!(store.count_conflicts(ConflictStatus::Cancelled).unwrap(), 1);
}

#[test]
fn purge_removes_settled_conflicts_only() {
    let store = Store::open_in_memory().unwrap();
    store.insert_conflict(&record("old-resolved")).unwrap();
    store.insert_conflict(&record("new-resolved")).unwrap();
    store.insert_conflict(&record("pending")).unwrap();
    store
        .save_resolution("old-resolved", &resolution(t0()))
        .unwrap();
    store
        .save_resolution("new-resolved", &resolution(t0() + Duration::days(3)))
        .unwrap();

    let purged = store.purge_conflicts(t0() + Duration::days(1)).unwrap();
    assert_eq!(purged, 1);
    assert!(!store.conflict_exists("old-resolved").unwrap());
    assert!(store.conflict_exists("new-resolved").unwrap());
    assert!(store.conflict_exists("pending").unwrap());
}
