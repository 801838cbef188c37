// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn empty_toml_yields_defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.queue.capacity, 1000);
    assert_eq!(config.queue.max_retries, 5);
    assert_eq!(config.scheduler.max_retries, 3);
    assert_eq!(config.connection.history_limit, 100);
    assert_eq!(config.background.run_budget(), Duration::from_secs(25));
    assert_eq!(config.background.background_interval(), Duration::from_secs(900));
}

#[test]
fn partial_sections_keep_other_defaults() {
    let config = Config::from_toml_str(
        r#"
        [queue]
        capacity = 10

        [connection]
        probe_interval_secs = 30
        "#,
    )
    .unwrap();
    assert_eq!(config.queue.capacity, 10);
    assert_eq!(config.queue.max_retries, 5);
    assert_eq!(config.connection.probe_interval(), Duration::from_secs(30));
    assert_eq!(config.connection.probe_timeout(), Duration::from_millis(5000));
}

#[test]
fn multiplier_overrides_fall_back_to_builtin_table() {
    let config = Config::from_toml_str(
        r#"
        [backoff.multipliers]
        upload_media = 4.0

        [scheduler.multipliers]
        profile = 1.0
        "#,
    )
    .unwrap();
    assert_eq!(config.backoff.multiplier(ActionKind::UploadMedia), 4.0);
    assert_eq!(config.backoff.multiplier(ActionKind::SendMessage), 2.0);
    assert_eq!(config.backoff.multiplier(ActionKind::StartTyping), 0.0);
    assert_eq!(config.scheduler.multiplier(SyncDomain::Profile), 1.0);
    assert_eq!(config.scheduler.multiplier(SyncDomain::Media), 3.0);
}

#[test]
fn strategy_overrides_and_preference() {
    let config = Config::from_toml_str(
        r#"
        [conflicts]
        merge_preference = "server"

        [conflicts.strategies]
        profile_update = "user-choice"
        "#,
    )
    .unwrap();
    assert_eq!(config.conflicts.merge_preference, MergePreference::Server);
    assert_eq!(
        config.conflicts.strategy_for(ConflictKind::ProfileUpdate),
        ResolutionStrategy::UserChoice
    );
    assert_eq!(
        config.conflicts.strategy_for(ConflictKind::SettingsUpdate),
        ResolutionStrategy::Merge
    );
}

#[parameterized(
    message_edit = { ConflictKind::MessageEdit, ResolutionStrategy::LastWriterWins },
    message_delete = { ConflictKind::MessageDelete, ResolutionStrategy::ServerWins },
    profile = { ConflictKind::ProfileUpdate, ResolutionStrategy::Merge },
    media = { ConflictKind::MediaUpload, ResolutionStrategy::ClientWins },
    like = { ConflictKind::LikeState, ResolutionStrategy::ClientWins },
    story = { ConflictKind::StoryUpdate, ResolutionStrategy::LastWriterWins },
)]
fn builtin_strategies(kind: ConflictKind, expected: ResolutionStrategy) {
    assert_eq!(default_strategy(kind), expected);
}

#[parameterized(
    zero_capacity = { "[queue]\ncapacity = 0", "queue.capacity" },
    cap_below_base = { "[backoff]\nbase_ms = 5000\ncap_ms = 100", "backoff.cap_ms" },
    negative_multiplier = { "[backoff.multipliers]\nlike = -1.0", "backoff.multipliers.like" },
    zero_probe_interval = { "[connection]\nprobe_interval_secs = 0", "probe_interval_secs" },
    zero_history = { "[connection]\nhistory_limit = 0", "history_limit" },
    zero_drain = { "[queue]\ndrain_interval_secs = 0", "drain_interval_secs" },
)]
fn invalid_values_are_rejected(toml: &str, mention: &str) {
    let err = Config::from_toml_str(toml).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains(mention), "{err}");
}

#[test]
fn unknown_strategy_is_a_config_error() {
    let err = Config::from_toml_str("[conflicts.strategies]\nprofile_update = \"coin-flip\"")
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn load_reads_file_and_names_it_in_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tether.toml");
    fs::write(&path, "[store]\npath = \"/tmp/x.db\"\n").unwrap();
    let config = Config::load(&path).unwrap();
    assert_eq!(config.store_path(), PathBuf::from("/tmp/x.db"));

    fs::write(&path, "[queue]\ncapacity = 0\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("tether.toml"));
}

#[test]
fn load_or_default_without_file() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn default_store_path_ends_in_db_file() {
    let config = Config::default();
    let path = config.store_path();
    assert!(path.ends_with("tether/tether.db") || path.ends_with(".tether/tether.db"));
}

#[test]
fn serialized_config_parses_back() {
    let mut config = Config::default();
    config.queue.capacity = 42;
    config
        .conflicts
        .strategies
        .insert(ConflictKind::LikeState, ResolutionStrategy::ServerWins);
    let text = config.to_toml_string().unwrap();
    let parsed = Config::from_toml_str(&text).unwrap();
    assert_eq!(parsed, config);
}
