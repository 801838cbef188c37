// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{
    fmt_ts, from_sql_int, parse_db, parse_json, parse_timestamp, to_sql_int, Store,
};
use crate::action::{ActionPriority, ActionStatus, QueuedAction, QueueStats};
use crate::error::{Error, Result};

const ACTION_COLUMNS: &str = "id, kind, payload, target_id, priority, status, retry_count,
     max_retries, next_retry_at, created_at, updated_at, last_error";

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<QueuedAction> {
    let kind_str: String = row.get(1)?;
    let payload_str: String = row.get(2)?;
    let priority: i64 = row.get(4)?;
    let status_str: String = row.get(5)?;
    let next_retry_str: String = row.get(8)?;
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    Ok(QueuedAction {
        id: row.get(0)?,
        kind: parse_db(&kind_str, "kind")?,
        payload: parse_json(&payload_str, "payload")?,
        target_id: row.get(3)?,
        priority: ActionPriority::from_rank(priority)
            .ok_or_else(|| super::conversion_error(format!("invalid priority rank {priority}")))?,
        status: parse_db(&status_str, "status")?,
        retry_count: from_sql_int(row.get(6)?),
        max_retries: from_sql_int(row.get(7)?),
        next_retry_at: parse_timestamp(&next_retry_str, "next_retry_at")?,
        created_at: parse_timestamp(&created_str, "created_at")?,
        updated_at: parse_timestamp(&updated_str, "updated_at")?,
        last_error: row.get(11)?,
    })
}

impl Store {
    /// Insert a new action.
    pub fn insert_action(&self, action: &QueuedAction) -> Result<()> {
        let payload = serde_json::to_string(&action.payload)?;
        self.lock()?.execute(
            "INSERT INTO offline_actions (id, kind, payload, target_id, priority, status,
             retry_count, max_retries, next_retry_at, created_at, updated_at, last_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                action.id,
                action.kind.as_str(),
                payload,
                action.target_id,
                action.priority.rank(),
                action.status.as_str(),
                to_sql_int(action.retry_count),
                to_sql_int(action.max_retries),
                fmt_ts(&action.next_retry_at),
                fmt_ts(&action.created_at),
                fmt_ts(&action.updated_at),
                action.last_error,
            ],
        )?;
        Ok(())
    }

    /// Get an action by ID.
    pub fn get_action(&self, id: &str) -> Result<QueuedAction> {
        let sql = format!("SELECT {ACTION_COLUMNS} FROM offline_actions WHERE id = ?1");
        let action = self
            .lock()?
            .query_row(&sql, params![id], action_from_row)
            .optional()?;
        action.ok_or_else(|| Error::ActionNotFound(id.to_string()))
    }

    /// Check if an action exists.
    pub fn action_exists(&self, id: &str) -> Result<bool> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM offline_actions WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List actions in delivery order, optionally filtered by status.
    pub fn list_actions(&self, status: Option<ActionStatus>) -> Result<Vec<QueuedAction>> {
        let conn = self.lock()?;
        let actions = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {ACTION_COLUMNS} FROM offline_actions WHERE status = ?1
                     ORDER BY priority, created_at, rowid"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![status.as_str()], action_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!(
                    "SELECT {ACTION_COLUMNS} FROM offline_actions
                     ORDER BY priority, created_at, rowid"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], action_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(actions)
    }

    /// Pending actions whose backoff has elapsed, in delivery order.
    pub fn due_actions(&self, now: DateTime<Utc>) -> Result<Vec<QueuedAction>> {
        let sql = format!(
            "SELECT {ACTION_COLUMNS} FROM offline_actions
             WHERE status = 'pending' AND next_retry_at <= ?1
             ORDER BY priority, created_at, rowid"
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![fmt_ts(&now)], action_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// The pending action to drop when the queue is full: lowest priority, then oldest.
    pub fn eviction_candidate(&self) -> Result<Option<QueuedAction>> {
        let sql = format!(
            "SELECT {ACTION_COLUMNS} FROM offline_actions WHERE status = 'pending'
             ORDER BY priority DESC, created_at, rowid LIMIT 1"
        );
        Ok(self.lock()?.query_row(&sql, [], action_from_row).optional()?)
    }

    /// Persist the mutable fields of an action.
    pub fn update_action(&self, action: &QueuedAction) -> Result<()> {
        let affected = self.lock()?.execute(
            "UPDATE offline_actions SET status = ?1, retry_count = ?2, max_retries = ?3,
             next_retry_at = ?4, updated_at = ?5, last_error = ?6 WHERE id = ?7",
            params![
                action.status.as_str(),
                to_sql_int(action.retry_count),
                to_sql_int(action.max_retries),
                fmt_ts(&action.next_retry_at),
                fmt_ts(&action.updated_at),
                action.last_error,
                action.id,
            ],
        )?;
        if affected == 0 {
            return Err(Error::ActionNotFound(action.id.clone()));
        }
        Ok(())
    }

    /// Move an action to `to`, enforcing the status state machine.
    pub fn transition_action(
        &self,
        id: &str,
        to: ActionStatus,
        last_error: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<QueuedAction> {
        let mut action = self.get_action(id)?;
        if !action.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: action.status.to_string(),
                to: to.to_string(),
            });
        }
        action.status = to;
        action.updated_at = now;
        if let Some(err) = last_error {
            action.last_error = Some(err.to_string());
        }
        self.update_action(&action)?;
        Ok(action)
    }

    /// Count actions by status.
    pub fn action_counts(&self) -> Result<QueueStats> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM offline_actions GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((parse_db::<ActionStatus>(&status, "status")?, count))
        })?;

        let mut stats = QueueStats::default();
        for row in rows {
            let (status, count) = row?;
            stats.add(status, from_sql_int(count));
        }
        Ok(stats)
    }

    /// Return actions left `processing` by an interrupted drain to `pending`.
    pub fn recover_processing_actions(&self, now: DateTime<Utc>) -> Result<usize> {
        let affected = self.lock()?.execute(
            "UPDATE offline_actions SET status = 'pending', updated_at = ?1
             WHERE status = 'processing'",
            params![fmt_ts(&now)],
        )?;
        Ok(affected)
    }

    /// Delete completed and cancelled actions last touched before `before`.
    pub fn purge_actions(&self, before: DateTime<Utc>) -> Result<usize> {
        let affected = self.lock()?.execute(
            "DELETE FROM offline_actions
             WHERE status IN ('completed', 'cancelled') AND updated_at < ?1",
            params![fmt_ts(&before)],
        )?;
        Ok(affected)
    }
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
