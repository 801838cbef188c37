// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `tether status`, `tether items`, `tether history` and
//! `tether stats`.

mod common;
use common::*;

use tether_core::stats::RunError;
use tether_core::{
    ActionStatus, BackgroundRunStats, ConnectionEvent, ConnectionEventKind, ConnectionQuality,
    ConnectionType, SyncDomain, SyncItem, SyncPriority,
};

#[test]
fn status_on_fresh_database() {
    let sb = Sandbox::new();
    sb.tether()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Connection: offline"))
        .stdout(predicate::str::contains("Actions: 0 pending"))
        .stdout(predicate::str::contains("Last sync: never"));
    assert!(sb.db_path().exists());
}

#[test]
fn status_counts_seeded_rows() {
    let sb = Sandbox::new();
    {
        let store = sb.store();
        seed_action(&store, "act-1", ActionStatus::Pending);
        seed_action(&store, "act-2", ActionStatus::Pending);
        seed_action(&store, "act-3", ActionStatus::Failed);
        seed_profile_conflict(&store, "cfl-1");
    }

    let status = sb.json(&["status"]);
    assert_eq!(status["online"], false);
    assert_eq!(status["queue"]["pending"], 2);
    assert_eq!(status["queue"]["failed"], 1);
    assert_eq!(status["pending_conflicts"], 1);
    assert_eq!(status["started"], false);
}

#[test]
fn items_lists_sync_queue() {
    let sb = Sandbox::new();
    {
        let store = sb.store();
        let mut item = SyncItem::new(
            "sync-messages-1".to_string(),
            SyncDomain::Messages,
            SyncPriority::Critical,
            Some("chat-7".to_string()),
            3,
            chrono::Utc::now(),
        );
        item.dependencies.insert("sync-chats-1".to_string());
        store.insert_sync_item(&item).unwrap();
    }

    sb.tether()
        .arg("items")
        .assert()
        .success()
        .stdout("- [critical] sync-messages-1: messages chat-7 (after sync-chats-1)\n");
}

#[test]
fn history_shows_persisted_transitions() {
    let sb = Sandbox::new();
    {
        let store = sb.store();
        let now = chrono::Utc::now();
        for (kind, quality, ago) in [
            (ConnectionEventKind::Online, ConnectionQuality::Good, 10),
            (ConnectionEventKind::Offline, ConnectionQuality::Offline, 5),
        ] {
            let event = ConnectionEvent {
                kind,
                connection_type: ConnectionType::Cellular,
                quality,
                latency_ms: None,
                at: now - chrono::Duration::minutes(ago),
            };
            store.append_connection_event(&event, 100).unwrap();
        }
    }

    let events = sb.json(&["history"]);
    let kinds: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["offline", "online"]);

    sb.tether()
        .args(["history", "-n", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("offline  cellular/offline"))
        .stdout(predicate::str::contains("online").not());
}

#[test]
fn history_empty() {
    let sb = Sandbox::new();
    sb.tether()
        .arg("history")
        .assert()
        .success()
        .stdout("No connection changes recorded\n");
}

#[test]
fn stats_reads_persisted_run_stats() {
    let sb = Sandbox::new();
    {
        let store = sb.store();
        let mut stats = BackgroundRunStats {
            total_runs: 4,
            successful_runs: 3,
            partial_runs: 1,
            failed_runs: 1,
            items_synced: 17,
            conflicts_resolved: 2,
            average_run_time_ms: 850.0,
            last_run_at: Some(chrono::Utc::now()),
            ..BackgroundRunStats::default()
        };
        stats.recent_errors.push_front(RunError {
            at: chrono::Utc::now(),
            message: "database is locked".to_string(),
        });
        store.save_run_stats(&stats).unwrap();
    }

    sb.tether()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Runs: 4 total, 3 successful (1 partial), 1 failed",
        ))
        .stdout(predicate::str::contains("Items synced: 17"))
        .stdout(predicate::str::contains("database is locked"));

    let json = sb.json(&["stats"]);
    assert_eq!(json["total_runs"], 4);
    assert_eq!(json["conflicts_resolved"], 2);
}
