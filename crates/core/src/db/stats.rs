// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use rusqlite::{params, OptionalExtension};

use super::{fmt_ts, from_sql_int, parse_json, parse_timestamp_opt, to_sql_int, Store};
use crate::error::Result;
use crate::stats::BackgroundRunStats;

impl Store {
    /// Load background run stats, or zeroed stats if none were saved.
    pub fn load_run_stats(&self) -> Result<BackgroundRunStats> {
        let stats = self
            .lock()?
            .query_row(
                "SELECT total_runs, successful_runs, failed_runs, partial_runs, items_synced,
                        conflicts_resolved, average_run_time_ms, last_run_at, recent_errors
                 FROM background_run_stats WHERE id = 1",
                [],
                |row| {
                    let errors: String = row.get(8)?;
                    Ok(BackgroundRunStats {
                        total_runs: from_sql_int(row.get(0)?),
                        successful_runs: from_sql_int(row.get(1)?),
                        failed_runs: from_sql_int(row.get(2)?),
                        partial_runs: from_sql_int(row.get(3)?),
                        items_synced: from_sql_int(row.get(4)?),
                        conflicts_resolved: from_sql_int(row.get(5)?),
                        average_run_time_ms: row.get(6)?,
                        last_run_at: parse_timestamp_opt(row.get(7)?, "last_run_at")?,
                        recent_errors: parse_json(&errors, "recent_errors")?,
                    })
                },
            )
            .optional()?;
        Ok(stats.unwrap_or_default())
    }

    /// Upsert background run stats.
    pub fn save_run_stats(&self, stats: &BackgroundRunStats) -> Result<()> {
        let errors = serde_json::to_string(&stats.recent_errors)?;
        self.lock()?.execute(
            "INSERT INTO background_run_stats (id, total_runs, successful_runs, failed_runs,
             partial_runs, items_synced, conflicts_resolved, average_run_time_ms, last_run_at,
             recent_errors)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                 total_runs = excluded.total_runs,
                 successful_runs = excluded.successful_runs,
                 failed_runs = excluded.failed_runs,
                 partial_runs = excluded.partial_runs,
                 items_synced = excluded.items_synced,
                 conflicts_resolved = excluded.conflicts_resolved,
                 average_run_time_ms = excluded.average_run_time_ms,
                 last_run_at = excluded.last_run_at,
                 recent_errors = excluded.recent_errors",
            params![
                to_sql_int(stats.total_runs),
                to_sql_int(stats.successful_runs),
                to_sql_int(stats.failed_runs),
                to_sql_int(stats.partial_runs),
                to_sql_int(stats.items_synced),
                to_sql_int(stats.conflicts_resolved),
                stats.average_run_time_ms,
                stats.last_run_at.as_ref().map(fmt_ts),
                errors,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
