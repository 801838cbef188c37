// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{
    fmt_ts, from_sql_int, parse_db, parse_timestamp, parse_timestamp_opt, to_sql_int, Store,
};
use crate::connection::{ConnectionEvent, ConnectionState};
use crate::error::Result;

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ConnectionEvent> {
    let kind_str: String = row.get(0)?;
    let type_str: String = row.get(1)?;
    let quality_str: String = row.get(2)?;
    let latency: Option<i64> = row.get(3)?;
    let at_str: String = row.get(4)?;

    Ok(ConnectionEvent {
        kind: parse_db(&kind_str, "kind")?,
        connection_type: parse_db(&type_str, "connection_type")?,
        quality: parse_db(&quality_str, "quality")?,
        latency_ms: latency.map(from_sql_int),
        at: parse_timestamp(&at_str, "at")?,
    })
}

impl Store {
    /// Load the connection snapshot with up to `history_limit` events.
    ///
    /// Returns the default (offline, empty) state if nothing was persisted.
    pub fn load_connection_state(&self, history_limit: usize) -> Result<ConnectionState> {
        let snapshot = self
            .lock()?
            .query_row(
                "SELECT is_online, connection_type, quality, last_online_at, last_offline_at,
                        offline_duration_ms
                 FROM connection_state WHERE id = 1",
                [],
                |row| {
                    let type_str: String = row.get(1)?;
                    let quality_str: String = row.get(2)?;
                    Ok(ConnectionState {
                        is_online: row.get(0)?,
                        connection_type: parse_db(&type_str, "connection_type")?,
                        quality: parse_db(&quality_str, "quality")?,
                        last_online_at: parse_timestamp_opt(row.get(3)?, "last_online_at")?,
                        last_offline_at: parse_timestamp_opt(row.get(4)?, "last_offline_at")?,
                        offline_duration_ms: from_sql_int(row.get(5)?),
                        history: Default::default(),
                    })
                },
            )
            .optional()?;

        let mut state = snapshot.unwrap_or_default();
        state.history = self.connection_history(history_limit)?.into();
        Ok(state)
    }

    /// Upsert the connection snapshot (history is stored separately).
    pub fn save_connection_state(&self, state: &ConnectionState, now: DateTime<Utc>) -> Result<()> {
        self.lock()?.execute(
            "INSERT INTO connection_state (id, is_online, connection_type, quality,
             last_online_at, last_offline_at, offline_duration_ms, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 is_online = excluded.is_online,
                 connection_type = excluded.connection_type,
                 quality = excluded.quality,
                 last_online_at = excluded.last_online_at,
                 last_offline_at = excluded.last_offline_at,
                 offline_duration_ms = excluded.offline_duration_ms,
                 updated_at = excluded.updated_at",
            params![
                state.is_online,
                state.connection_type.as_str(),
                state.quality.as_str(),
                state.last_online_at.as_ref().map(fmt_ts),
                state.last_offline_at.as_ref().map(fmt_ts),
                to_sql_int(state.offline_duration_ms),
                fmt_ts(&now),
            ],
        )?;
        Ok(())
    }

    /// Append a history event, keeping only the newest `keep` rows.
    pub fn append_connection_event(&self, event: &ConnectionEvent, keep: usize) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO connection_events (kind, connection_type, quality, latency_ms, at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.kind.as_str(),
                event.connection_type.as_str(),
                event.quality.as_str(),
                event.latency_ms.map(to_sql_int),
                fmt_ts(&event.at),
            ],
        )?;
        tx.execute(
            "DELETE FROM connection_events WHERE id NOT IN
             (SELECT id FROM connection_events ORDER BY id DESC LIMIT ?1)",
            params![to_sql_int(keep)],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// The most recent connection events, newest first.
    pub fn connection_history(&self, limit: usize) -> Result<Vec<ConnectionEvent>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT kind, connection_type, quality, latency_ms, at
             FROM connection_events ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![to_sql_int(limit)], event_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
