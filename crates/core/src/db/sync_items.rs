// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashSet;

use super::{fmt_ts, from_sql_int, parse_db, parse_json, parse_timestamp, to_sql_int, Store};
use crate::error::{Error, Result};
use crate::sync_item::{SyncDomain, SyncItem, SyncPriority};

const ITEM_COLUMNS: &str = "id, domain, priority, target_id, metadata, estimated_size,
     estimated_time, retry_count, max_retries, next_retry_at, dependencies, created_at,
     updated_at, last_error";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<SyncItem> {
    let domain_str: String = row.get(1)?;
    let priority: i64 = row.get(2)?;
    let metadata_str: String = row.get(4)?;
    let next_retry_str: String = row.get(9)?;
    let deps_str: String = row.get(10)?;
    let created_str: String = row.get(11)?;
    let updated_str: String = row.get(12)?;

    Ok(SyncItem {
        id: row.get(0)?,
        domain: parse_db(&domain_str, "domain")?,
        priority: SyncPriority::from_value(priority)
            .ok_or_else(|| super::conversion_error(format!("invalid sync priority {priority}")))?,
        target_id: row.get(3)?,
        metadata: parse_json(&metadata_str, "metadata")?,
        estimated_size: from_sql_int(row.get(5)?),
        estimated_time: from_sql_int(row.get(6)?),
        retry_count: from_sql_int(row.get(7)?),
        max_retries: from_sql_int(row.get(8)?),
        next_retry_at: parse_timestamp(&next_retry_str, "next_retry_at")?,
        dependencies: parse_json(&deps_str, "dependencies")?,
        created_at: parse_timestamp(&created_str, "created_at")?,
        updated_at: parse_timestamp(&updated_str, "updated_at")?,
        last_error: row.get(13)?,
    })
}

impl Store {
    /// Insert a new sync item.
    pub fn insert_sync_item(&self, item: &SyncItem) -> Result<()> {
        let metadata = serde_json::to_string(&item.metadata)?;
        let deps = serde_json::to_string(&item.dependencies)?;
        self.lock()?.execute(
            "INSERT INTO sync_queue (id, domain, priority, target_id, metadata, estimated_size,
             estimated_time, retry_count, max_retries, next_retry_at, dependencies, created_at,
             updated_at, last_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                item.id,
                item.domain.as_str(),
                item.priority.value(),
                item.target_id,
                metadata,
                to_sql_int(item.estimated_size),
                to_sql_int(item.estimated_time),
                to_sql_int(item.retry_count),
                to_sql_int(item.max_retries),
                fmt_ts(&item.next_retry_at),
                deps,
                fmt_ts(&item.created_at),
                fmt_ts(&item.updated_at),
                item.last_error,
            ],
        )?;
        Ok(())
    }

    /// Persist every mutable field of a sync item.
    pub fn update_sync_item(&self, item: &SyncItem) -> Result<()> {
        let metadata = serde_json::to_string(&item.metadata)?;
        let deps = serde_json::to_string(&item.dependencies)?;
        let affected = self.lock()?.execute(
            "UPDATE sync_queue SET priority = ?1, metadata = ?2, estimated_size = ?3,
             estimated_time = ?4, retry_count = ?5, max_retries = ?6, next_retry_at = ?7,
             dependencies = ?8, updated_at = ?9, last_error = ?10 WHERE id = ?11",
            params![
                item.priority.value(),
                metadata,
                to_sql_int(item.estimated_size),
                to_sql_int(item.estimated_time),
                to_sql_int(item.retry_count),
                to_sql_int(item.max_retries),
                fmt_ts(&item.next_retry_at),
                deps,
                fmt_ts(&item.updated_at),
                item.last_error,
                item.id,
            ],
        )?;
        if affected == 0 {
            return Err(Error::SyncItemNotFound(item.id.clone()));
        }
        Ok(())
    }

    /// Get a sync item by ID.
    pub fn get_sync_item(&self, id: &str) -> Result<SyncItem> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM sync_queue WHERE id = ?1");
        let item = self
            .lock()?
            .query_row(&sql, params![id], item_from_row)
            .optional()?;
        item.ok_or_else(|| Error::SyncItemNotFound(id.to_string()))
    }

    /// Find the queued item for a domain and target, if any.
    pub fn find_sync_item(
        &self,
        domain: SyncDomain,
        target_id: Option<&str>,
    ) -> Result<Option<SyncItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sync_queue WHERE domain = ?1 AND target_id IS ?2
             ORDER BY rowid LIMIT 1"
        );
        Ok(self
            .lock()?
            .query_row(&sql, params![domain.as_str(), target_id], item_from_row)
            .optional()?)
    }

    /// All queued items ordered by `(priority, created_at, insertion)`.
    pub fn list_sync_items(&self) -> Result<Vec<SyncItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sync_queue ORDER BY priority, created_at, rowid"
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], item_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Ids of every queued item.
    pub fn sync_item_ids(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM sync_queue")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<HashSet<String>, _>>()?)
    }

    /// Check if a sync item exists.
    pub fn sync_item_exists(&self, id: &str) -> Result<bool> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Remove a sync item. Returns false if it was not queued.
    pub fn delete_sync_item(&self, id: &str) -> Result<bool> {
        let affected = self
            .lock()?
            .execute("DELETE FROM sync_queue WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    pub fn count_sync_items(&self) -> Result<usize> {
        let count: i64 =
            self.lock()?
                .query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
        Ok(from_sql_int(count))
    }
}

#[cfg(test)]
#[path = "sync_items_tests.rs"]
mod tests;
