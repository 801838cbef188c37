// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `tether conflicts` and `tether resolve`.

mod common;
use common::*;

use tether_core::{ActionKind, ActionPriority, ActionStatus, ConflictStatus, ResolvedSide};

fn seeded() -> Sandbox {
    let sb = Sandbox::new();
    seed_profile_conflict(&sb.store(), "cfl-1");
    sb
}

#[test]
fn lists_pending_conflicts() {
    let sb = seeded();
    sb.tether()
        .arg("conflicts")
        .assert()
        .success()
        .stdout("- (pending) cfl-1: profile_update user-1 [bio, name]\n");
}

#[test]
fn keep_local_requeues_the_local_profile() {
    let sb = seeded();
    sb.tether()
        .args(["resolve", "cfl-1", "--keep", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Resolved by user with user-choice: local wins",
        ));

    let store = sb.store();
    let record = store.get_conflict("cfl-1").unwrap();
    assert_eq!(record.status, ConflictStatus::Resolved);
    assert_eq!(record.resolution.unwrap().winner, ResolvedSide::Local);

    let queued = store.list_actions(Some(ActionStatus::Pending)).unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].kind, ActionKind::UpdateProfile);
    assert_eq!(queued[0].priority, ActionPriority::High);
    assert_eq!(queued[0].target_id.as_deref(), Some("user-1"));
}

#[test]
fn last_writer_wins_picks_newer_local_edit() {
    let sb = seeded();
    let record = sb.json(&["resolve", "cfl-1", "--strategy", "last-writer-wins"]);
    assert_eq!(record["resolution"]["winner"], "local");
    assert_eq!(record["resolution"]["resolved_by"], "system");
}

#[test]
fn server_wins_queues_nothing() {
    let sb = seeded();
    sb.tether()
        .args(["resolve", "cfl-1", "--strategy", "server-wins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("server wins"));

    assert!(sb
        .store()
        .list_actions(Some(ActionStatus::Pending))
        .unwrap()
        .is_empty());

    sb.tether()
        .arg("conflicts")
        .assert()
        .success()
        .stdout("No conflicts\n");
    sb.tether()
        .args(["conflicts", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(resolved) cfl-1"));
}

#[test]
fn user_choice_without_keep_asks_for_a_decision() {
    let sb = seeded();
    sb.tether()
        .args(["resolve", "cfl-1", "--strategy", "user-choice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a decision"))
        .stderr(predicate::str::contains("--keep local"));
}

#[test]
fn keep_and_strategy_are_exclusive() {
    let sb = seeded();
    sb.tether()
        .args(["resolve", "cfl-1", "--keep", "local", "--strategy", "merge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn resolving_again_reports_the_first_outcome() {
    let sb = seeded();
    sb.tether()
        .args(["resolve", "cfl-1", "--keep", "server"])
        .assert()
        .success();
    sb.tether()
        .args(["resolve", "cfl-1", "--keep", "local"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Conflict cfl-1 was already resolved",
        ))
        .stdout(predicate::str::contains("server wins"));
}

#[test]
fn unknown_conflict() {
    let sb = seeded();
    sb.tether()
        .args(["resolve", "cfl-missing", "--keep", "local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflict not found: cfl-missing"));
}
