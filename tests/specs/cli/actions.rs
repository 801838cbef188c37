// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `tether actions`, `tether cancel` and `tether retry`.

mod common;
use common::*;

use tether_core::ActionStatus;

fn seeded() -> Sandbox {
    let sb = Sandbox::new();
    let store = sb.store();
    seed_action(&store, "act-pending", ActionStatus::Pending);
    seed_action(&store, "act-failed", ActionStatus::Failed);
    sb
}

#[test]
fn lists_all_actions() {
    let sb = seeded();
    sb.tether()
        .arg("actions")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "- [medium] (pending) act-pending: like user-1",
        ))
        .stdout(predicate::str::contains(
            "(failed) act-failed: like user-1 (retry 3/3) - server: 503",
        ));
}

#[test]
fn filters_by_status() {
    let sb = seeded();
    let actions = sb.json(&["actions", "--status", "failed"]);
    let actions = actions.as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["id"], "act-failed");
    assert_eq!(actions[0]["status"], "failed");
}

#[test]
fn rejects_unknown_status() {
    let sb = seeded();
    sb.tether()
        .args(["actions", "--status", "stuck"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid status: 'stuck'"));
}

#[test]
fn empty_queue() {
    let sb = Sandbox::new();
    sb.tether()
        .arg("actions")
        .assert()
        .success()
        .stdout("No actions\n");
}

#[test]
fn cancel_pending_action() {
    let sb = seeded();
    sb.tether()
        .args(["cancel", "act-pending"])
        .assert()
        .success()
        .stdout("Cancelled act-pending (like)\n");

    assert_eq!(
        sb.store().get_action("act-pending").unwrap().status,
        ActionStatus::Cancelled
    );
}

#[test]
fn cancel_failed_action_is_refused() {
    let sb = seeded();
    sb.tether()
        .args(["cancel", "act-failed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("act-failed is not pending"));
}

#[test]
fn cancel_unknown_action() {
    let sb = seeded();
    sb.tether()
        .args(["cancel", "act-missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("action not found: act-missing"));
}

#[test]
fn retry_failed_action() {
    let sb = seeded();
    sb.tether()
        .args(["retry", "act-failed"])
        .assert()
        .success()
        .stdout("Re-queued act-failed (like)\n");

    let action = sb.store().get_action("act-failed").unwrap();
    assert_eq!(action.status, ActionStatus::Pending);
    assert_eq!(action.retry_count, 0);
}

#[test]
fn retry_pending_action_is_refused() {
    let sb = seeded();
    sb.tether()
        .args(["retry", "act-pending"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot go from pending to pending"));
}
