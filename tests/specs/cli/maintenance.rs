// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `tether purge`, `tether config` and path resolution.

mod common;
use common::*;

use chrono::Duration;
use tether_core::ActionStatus;

#[test]
fn purge_removes_old_settled_actions() {
    let sb = Sandbox::new();
    {
        let store = sb.store();
        let mut old = like("act-old", "user-1", Duration::days(30));
        old.status = ActionStatus::Completed;
        store.insert_action(&old).unwrap();

        let mut recent = like("act-recent", "user-1", Duration::hours(1));
        recent.status = ActionStatus::Completed;
        store.insert_action(&recent).unwrap();

        store
            .insert_action(&like("act-live", "user-2", Duration::days(30)))
            .unwrap();
    }

    sb.tether()
        .arg("purge")
        .assert()
        .success()
        .stdout("Purged 1 action and 0 conflicts\n");

    let store = sb.store();
    assert!(store.get_action("act-old").is_err());
    assert!(store.get_action("act-recent").is_ok());
    assert!(store.get_action("act-live").is_ok());
}

#[test]
fn purge_with_nothing_to_do() {
    let sb = Sandbox::new();
    sb.tether()
        .arg("purge")
        .assert()
        .success()
        .stdout("Nothing to purge\n");
}

#[test]
fn config_prints_defaults_with_resolved_db() {
    let sb = Sandbox::new();
    sb.tether()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[queue]"))
        .stdout(predicate::str::contains("capacity = "))
        .stdout(predicate::str::contains("tether.db"));
}

#[test]
fn config_file_settings_are_applied() {
    let sb = Sandbox::new();
    let config = sb.path().join("tether.toml");
    std::fs::write(&config, "[queue]\ncapacity = 42\n").unwrap();

    sb.tether()
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity = 42"));
}

#[test]
fn missing_config_file_is_an_error() {
    let sb = Sandbox::new();
    sb.tether()
        .args(["--config", "nope.toml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found: nope.toml"));
}

#[test]
fn config_path_from_environment() {
    let sb = Sandbox::new();
    let config = sb.path().join("env.toml");
    std::fs::write(&config, "[queue]\ncapacity = 7\n").unwrap();

    sb.tether()
        .env("TETHER_CONFIG", &config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity = 7"));
}

#[test]
fn invalid_config_is_rejected() {
    let sb = Sandbox::new();
    let config = sb.path().join("bad.toml");
    std::fs::write(&config, "[queue]\ncapacity = 0\n").unwrap();

    sb.tether()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn logs_go_to_the_requested_file() {
    let sb = Sandbox::new();
    let log = sb.path().join("logs").join("tether.log");

    sb.tether()
        .env("RUST_LOG", "info")
        .arg("--log-file")
        .arg(&log)
        .arg("status")
        .assert()
        .success();

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Opened sync store"));
}

#[test]
fn version_flag() {
    let sb = Sandbox::new();
    sb.tether()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("tether "));
}
