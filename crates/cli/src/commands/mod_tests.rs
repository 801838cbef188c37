// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_explicit_config_must_exist() {
    let dir = TempDir::new().unwrap();
    let paths = Paths {
        db: None,
        config: Some(dir.path().join("missing.toml")),
    };
    let err = load_config(&paths).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound(_)));
    assert!(err.to_string().contains("missing.toml"));
}

#[test]
fn test_config_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[queue]\ncapacity = 50\n").unwrap();

    let config = load_config(&Paths {
        db: None,
        config: Some(path),
    })
    .unwrap();
    assert_eq!(config.queue.capacity, 50);
}

#[test]
fn test_db_path_overrides_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[store]\npath = \"/var/lib/tether/tether.db\"\n").unwrap();

    let db = dir.path().join("override.db");
    let config = load_config(&Paths {
        db: Some(db.clone()),
        config: Some(path),
    })
    .unwrap();
    assert_eq!(config.store_path(), db);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[queue]\ncapacity = 0\n").unwrap();

    let err = load_config(&Paths {
        db: None,
        config: Some(path),
    })
    .unwrap_err();
    let Error::Engine(tether_engine::Error::Config(msg)) = err else {
        panic!("expected a config error, got {err:?}");
    };
    assert!(msg.contains("queue.capacity"));
}

#[test]
fn test_open_engine_creates_database() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "").unwrap();
    let db = dir.path().join("nested").join("tether.db");

    let engine = open_engine(&Paths {
        db: Some(db.clone()),
        config: Some(config),
    })
    .unwrap();
    assert!(db.exists());
    assert!(!engine.is_started());
}

#[test]
fn test_default_config_path_ends_with_tether_config() {
    if let Some(path) = default_config_path() {
        assert!(path.ends_with("tether/config.toml"));
    }
}
