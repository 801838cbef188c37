// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed persistence for the sync engine.
//!
//! One table per component: `offline_actions` (ActionQueue), `sync_queue`
//! (SyncScheduler), `conflicts` (ConflictResolver), `connection_state` and
//! `connection_events` (ConnectionMonitor), `background_run_stats`
//! (BackgroundOrchestrator). Table-specific operations live in the sibling
//! modules as `impl Store` blocks.
//!
//! The connection sits behind a `std::sync::Mutex`. Every method takes the
//! lock for the duration of one statement or transaction, so callers on an
//! async runtime never hold it across an await point.

mod actions;
mod conflicts;
mod connection;
mod stats;
mod sync_items;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};

/// SQL schema for the sync engine database.
pub const SCHEMA: &str = r#"
-- Queued mutations awaiting delivery
CREATE TABLE IF NOT EXISTS offline_actions (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,           -- JSON, tagged by kind
    target_id TEXT,
    priority INTEGER NOT NULL,       -- 0 high, 1 medium, 2 low
    status TEXT NOT NULL DEFAULT 'pending',
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL,
    next_retry_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_error TEXT
);

-- Read/refresh items owned by the scheduler
CREATE TABLE IF NOT EXISTS sync_queue (
    id TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    priority INTEGER NOT NULL,       -- 0 critical .. 4 deferred
    target_id TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    estimated_size INTEGER NOT NULL DEFAULT 0,
    estimated_time INTEGER NOT NULL DEFAULT 0,
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL,
    next_retry_at TEXT NOT NULL,
    dependencies TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_error TEXT
);

-- Detected local/server divergences
CREATE TABLE IF NOT EXISTS conflicts (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    local_version TEXT NOT NULL,
    server_version TEXT NOT NULL,
    local_timestamp TEXT NOT NULL,
    server_timestamp TEXT NOT NULL,
    conflicted_fields TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    resolution TEXT,                 -- JSON, set once on resolve
    source_action TEXT,
    created_at TEXT NOT NULL,
    resolved_at TEXT
);

-- Single-row connection snapshot
CREATE TABLE IF NOT EXISTS connection_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    is_online INTEGER NOT NULL,
    connection_type TEXT NOT NULL,
    quality TEXT NOT NULL,
    last_online_at TEXT,
    last_offline_at TEXT,
    offline_duration_ms INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Connection transition history
CREATE TABLE IF NOT EXISTS connection_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    connection_type TEXT NOT NULL,
    quality TEXT NOT NULL,
    latency_ms INTEGER,
    at TEXT NOT NULL
);

-- Single-row background run aggregates
CREATE TABLE IF NOT EXISTS background_run_stats (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    total_runs INTEGER NOT NULL DEFAULT 0,
    successful_runs INTEGER NOT NULL DEFAULT 0,
    failed_runs INTEGER NOT NULL DEFAULT 0,
    partial_runs INTEGER NOT NULL DEFAULT 0,
    items_synced INTEGER NOT NULL DEFAULT 0,
    conflicts_resolved INTEGER NOT NULL DEFAULT 0,
    average_run_time_ms REAL NOT NULL DEFAULT 0,
    last_run_at TEXT,
    recent_errors TEXT NOT NULL DEFAULT '[]'
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_actions_queue ON offline_actions(status, priority, created_at);
CREATE INDEX IF NOT EXISTS idx_sync_queue_order ON sync_queue(priority, created_at);
CREATE INDEX IF NOT EXISTS idx_sync_queue_target ON sync_queue(domain, target_id);
CREATE INDEX IF NOT EXISTS idx_conflicts_status ON conflicts(status, created_at);
"#;

/// Formats a timestamp for storage.
///
/// Fixed-width millisecond RFC3339 in UTC, so text order matches time order.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(Error::CorruptedData(message)),
    )
}

/// Parse a string value from the database, returning a rusqlite error on parse failure.
pub(crate) fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value
        .parse()
        .map_err(|_| conversion_error(format!("invalid value '{value}' in column '{column}'")))
}

/// Parse an RFC3339 timestamp from the database.
pub(crate) fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| conversion_error(format!("invalid timestamp '{value}' in column '{column}'")))
}

pub(crate) fn parse_timestamp_opt(
    value: Option<String>,
    column: &str,
) -> std::result::Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| parse_timestamp(&v, column)).transpose()
}

/// Parse a JSON column.
pub(crate) fn parse_json<T: DeserializeOwned>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    serde_json::from_str(value)
        .map_err(|e| conversion_error(format!("invalid JSON in column '{column}': {e}")))
}

/// Converts an unsigned counter for storage.
pub(crate) fn to_sql_int<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

/// Reads an unsigned counter back, clamping negative values to zero.
pub(crate) fn from_sql_int<T: TryFrom<i64> + Default>(value: i64) -> T {
    T::try_from(value.max(0)).unwrap_or_default()
}

/// Create every table and index that does not exist yet.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Shared handle to the engine database.
///
/// Cloning is cheap and every clone talks to the same connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open a database at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        run_migrations(&conn)?;
        tracing::debug!(path = %path.display(), "opened store");
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Store {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run raw SQL against the store, for maintenance scripts and fault
    /// injection in tests.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
