// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate statistics for background sync runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of run errors retained.
pub const DEFAULT_RECENT_ERRORS: usize = 10;

/// How a background run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// The run hit its time budget with work left over.
    Partial,
    Failed(String),
}

/// A failed run, kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundRunStats {
    pub total_runs: u64,
    /// Includes partial runs.
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub partial_runs: u64,
    pub items_synced: u64,
    pub conflicts_resolved: u64,
    pub average_run_time_ms: f64,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Newest first.
    pub recent_errors: VecDeque<RunError>,
}

impl BackgroundRunStats {
    /// Folds one finished run into the totals.
    pub fn record(
        &mut self,
        outcome: &RunOutcome,
        duration_ms: u64,
        items_synced: u64,
        conflicts_resolved: u64,
        at: DateTime<Utc>,
        error_limit: usize,
    ) {
        self.total_runs += 1;
        match outcome {
            RunOutcome::Success => self.successful_runs += 1,
            RunOutcome::Partial => {
                self.successful_runs += 1;
                self.partial_runs += 1;
            }
            RunOutcome::Failed(message) => {
                self.failed_runs += 1;
                self.recent_errors.push_front(RunError {
                    at,
                    message: message.clone(),
                });
                self.recent_errors.truncate(error_limit);
            }
        }
        self.items_synced += items_synced;
        self.conflicts_resolved += conflicts_resolved;

        let n = self.total_runs as f64;
        self.average_run_time_ms += (duration_ms as f64 - self.average_run_time_ms) / n;
        self.last_run_at = Some(at);
    }

    /// Fraction of runs that did not fail, or `None` before the first run.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_runs > 0).then(|| self.successful_runs as f64 / self.total_runs as f64)
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
