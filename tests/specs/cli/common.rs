// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers shared by the `tether` CLI specs.
//!
//! - [`Sandbox`] - isolated temp dir holding the database and config
//! - seeding helpers that write rows through `tether_core::Store`

// Not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tether_core::{
    ActionKind, ActionPayload, ActionPriority, ActionStatus, ConflictKind, ConflictRecord,
    ConflictStatus, QueuedAction, Store,
};

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// An isolated directory with its own database and config home.
pub struct Sandbox {
    temp: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Sandbox {
            temp: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.temp.path().to_path_buf()
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp.path().join("data").join("tether.db")
    }

    /// Open the sandbox database directly, creating it if needed.
    pub fn store(&self) -> Store {
        Store::open(&self.db_path()).expect("failed to open store")
    }

    /// A `tether` command pointed at this sandbox's database.
    ///
    /// The config home is redirected into the sandbox so a developer's own
    /// config file never leaks in.
    pub fn tether(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("tether");
        cmd.current_dir(self.temp.path())
            .env("HOME", self.temp.path())
            .env("XDG_CONFIG_HOME", self.temp.path().join("config"))
            .env_remove("TETHER_DB")
            .env_remove("TETHER_CONFIG")
            .env_remove("TETHER_LOG_FILE")
            .env_remove("RUST_LOG")
            .arg("--db")
            .arg(self.db_path());
        cmd
    }

    /// Run `tether <args> -o json` and parse stdout.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .tether()
            .args(args)
            .args(["-o", "json"])
            .output()
            .expect("failed to run tether");
        assert!(
            output.status.success(),
            "tether {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is not json")
    }
}

/// A pending like created `age` ago.
pub fn like(id: &str, user_id: &str, age: Duration) -> QueuedAction {
    QueuedAction::new(
        id.to_string(),
        ActionPayload::Like {
            user_id: user_id.to_string(),
        },
        Some(user_id.to_string()),
        ActionPriority::Medium,
        3,
        Utc::now() - age,
    )
}

pub fn seed_action(store: &Store, id: &str, status: ActionStatus) -> QueuedAction {
    let mut action = like(id, "user-1", Duration::minutes(5));
    action.status = status;
    if status == ActionStatus::Failed {
        action.retry_count = action.max_retries;
        action.last_error = Some("server: 503".to_string());
    }
    store.insert_action(&action).unwrap();
    action
}

/// A pending profile conflict whose local edit is newer than the server's.
pub fn seed_profile_conflict(store: &Store, id: &str) -> ConflictRecord {
    let now = Utc::now();
    let record = ConflictRecord {
        id: id.to_string(),
        kind: ConflictKind::ProfileUpdate,
        entity_id: "user-1".to_string(),
        entity_type: "profile".to_string(),
        local_version: json!({"user_id": "user-1", "name": "Ana", "bio": "climber"}),
        server_version: json!({"user_id": "user-1", "name": "Anna", "bio": "hiker"}),
        local_timestamp: now - Duration::minutes(1),
        server_timestamp: now - Duration::hours(1),
        conflicted_fields: vec!["bio".to_string(), "name".to_string()],
        description: "profile_update on user-1: bio, name differ".to_string(),
        status: ConflictStatus::Pending,
        resolution: None,
        source_action: Some(ActionKind::UpdateProfile),
        created_at: now,
    };
    store.insert_conflict(&record).unwrap();
    record
}
