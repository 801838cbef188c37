// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{fmt_ts, from_sql_int, parse_db, parse_json, parse_timestamp, Store};
use crate::conflict::{ConflictRecord, ConflictStatus, Resolution};
use crate::error::{Error, Result};

const CONFLICT_COLUMNS: &str = "id, kind, entity_id, entity_type, local_version, server_version,
     local_timestamp, server_timestamp, conflicted_fields, description, status, resolution,
     source_action, created_at";

fn conflict_from_row(row: &Row<'_>) -> rusqlite::Result<ConflictRecord> {
    let kind_str: String = row.get(1)?;
    let local_str: String = row.get(4)?;
    let server_str: String = row.get(5)?;
    let local_ts: String = row.get(6)?;
    let server_ts: String = row.get(7)?;
    let fields_str: String = row.get(8)?;
    let status_str: String = row.get(10)?;
    let resolution_str: Option<String> = row.get(11)?;
    let source_str: Option<String> = row.get(12)?;
    let created_str: String = row.get(13)?;

    Ok(ConflictRecord {
        id: row.get(0)?,
        kind: parse_db(&kind_str, "kind")?,
        entity_id: row.get(2)?,
        entity_type: row.get(3)?,
        local_version: parse_json(&local_str, "local_version")?,
        server_version: parse_json(&server_str, "server_version")?,
        local_timestamp: parse_timestamp(&local_ts, "local_timestamp")?,
        server_timestamp: parse_timestamp(&server_ts, "server_timestamp")?,
        conflicted_fields: parse_json(&fields_str, "conflicted_fields")?,
        description: row.get(9)?,
        status: parse_db(&status_str, "status")?,
        resolution: resolution_str
            .map(|s| parse_json(&s, "resolution"))
            .transpose()?,
        source_action: source_str
            .map(|s| parse_db(&s, "source_action"))
            .transpose()?,
        created_at: parse_timestamp(&created_str, "created_at")?,
    })
}

impl Store {
    /// Insert a newly detected conflict.
    pub fn insert_conflict(&self, record: &ConflictRecord) -> Result<()> {
        let resolution = record
            .resolution
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.lock()?.execute(
            "INSERT INTO conflicts (id, kind, entity_id, entity_type, local_version,
             server_version, local_timestamp, server_timestamp, conflicted_fields, description,
             status, resolution, source_action, created_at, resolved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                record.id,
                record.kind.as_str(),
                record.entity_id,
                record.entity_type,
                serde_json::to_string(&record.local_version)?,
                serde_json::to_string(&record.server_version)?,
                fmt_ts(&record.local_timestamp),
                fmt_ts(&record.server_timestamp),
                serde_json::to_string(&record.conflicted_fields)?,
                record.description,
                record.status.as_str(),
                resolution,
                record.source_action.map(|k| k.as_str()),
                fmt_ts(&record.created_at),
                record.resolution.as_ref().map(|r| fmt_ts(&r.resolved_at)),
            ],
        )?;
        Ok(())
    }

    /// Get a conflict by ID.
    pub fn get_conflict(&self, id: &str) -> Result<ConflictRecord> {
        let sql = format!("SELECT {CONFLICT_COLUMNS} FROM conflicts WHERE id = ?1");
        let record = self
            .lock()?
            .query_row(&sql, params![id], conflict_from_row)
            .optional()?;
        record.ok_or_else(|| Error::ConflictNotFound(id.to_string()))
    }

    /// Check if a conflict exists.
    pub fn conflict_exists(&self, id: &str) -> Result<bool> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM conflicts WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List conflicts oldest first, optionally filtered by status.
    pub fn list_conflicts(&self, status: Option<ConflictStatus>) -> Result<Vec<ConflictRecord>> {
        let conn = self.lock()?;
        let records = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {CONFLICT_COLUMNS} FROM conflicts WHERE status = ?1
                     ORDER BY created_at, rowid"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![status.as_str()], conflict_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let sql =
                    format!("SELECT {CONFLICT_COLUMNS} FROM conflicts ORDER BY created_at, rowid");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], conflict_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(records)
    }

    /// Store a resolution, moving a pending conflict to resolved.
    ///
    /// Returns false if the conflict was no longer pending.
    pub fn save_resolution(&self, id: &str, resolution: &Resolution) -> Result<bool> {
        let json = serde_json::to_string(resolution)?;
        let affected = self.lock()?.execute(
            "UPDATE conflicts SET status = 'resolved', resolution = ?1, resolved_at = ?2
             WHERE id = ?3 AND status = 'pending'",
            params![json, fmt_ts(&resolution.resolved_at), id],
        )?;
        Ok(affected > 0)
    }

    /// Set the status of a pending conflict. Returns false if it was not pending.
    pub fn set_conflict_status(&self, id: &str, status: ConflictStatus) -> Result<bool> {
        let affected = self.lock()?.execute(
            "UPDATE conflicts SET status = ?1 WHERE id = ?2 AND status = 'pending'",
            params![status.as_str(), id],
        )?;
        Ok(affected > 0)
    }

    /// Count conflicts with the given status.
    pub fn count_conflicts(&self, status: ConflictStatus) -> Result<usize> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM conflicts WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(from_sql_int(count))
    }

    /// Delete resolved and cancelled conflicts settled before `before`.
    pub fn purge_conflicts(&self, before: DateTime<Utc>) -> Result<usize> {
        let affected = self.lock()?.execute(
            "DELETE FROM conflicts
             WHERE status IN ('resolved', 'cancelled')
               AND COALESCE(resolved_at, created_at) < ?1",
            params![fmt_ts(&before)],
        )?;
        Ok(affected)
    }
}

#[cfg(test)]
#[path = "conflicts_tests.rs"]
mod tests;
