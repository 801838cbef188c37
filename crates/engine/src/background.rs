// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! App lifecycle timers and bounded background runs.
//!
//! A background run:
//! 1. Drains the action queue, which records conflicts as it goes
//! 2. Runs a critical pass over messages, chats and notifications
//! 3. Auto-resolves pending conflicts with last-writer-wins
//!
//! The whole run shares one deadline. Foreground ticks drain and run a full
//! pass without touching the run statistics.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use tether_core::{BackgroundRunStats, Clock, RunOutcome, Store};

use crate::config::BackgroundConfig;
use crate::error::Result;
use crate::guard::BusyGuard;
use crate::queue::ActionQueue;
use crate::resolver::ConflictResolver;
use crate::scheduler::{PassFilter, SyncScheduler};

/// Whether the host app is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    #[default]
    Foreground,
    Background,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Foreground => "foreground",
            AppState::Background => "background",
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What one background run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub actions_delivered: usize,
    pub items_synced: usize,
    pub conflicts_detected: usize,
    pub conflicts_resolved: usize,
    /// Resolutions pushed back to the server as new actions.
    pub requeued: usize,
    pub duration: Duration,
}

#[derive(Default)]
struct RunCounts {
    actions_delivered: usize,
    items_synced: usize,
    conflicts_detected: usize,
    conflicts_resolved: usize,
    requeued: usize,
}

pub struct BackgroundOrchestrator {
    queue: Arc<ActionQueue>,
    resolver: Arc<ConflictResolver>,
    scheduler: Arc<SyncScheduler>,
    store: Store,
    clock: Arc<dyn Clock>,
    config: BackgroundConfig,
    running: AtomicBool,
    timer: Mutex<Option<CancellationToken>>,
    app_state: Mutex<AppState>,
    stats: Mutex<BackgroundRunStats>,
}

impl BackgroundOrchestrator {
    pub fn new(
        queue: Arc<ActionQueue>,
        resolver: Arc<ConflictResolver>,
        scheduler: Arc<SyncScheduler>,
        store: Store,
        clock: Arc<dyn Clock>,
        config: BackgroundConfig,
    ) -> Self {
        let stats = store.load_run_stats().unwrap_or_else(|e| {
            tracing::warn!("Failed to load background run stats, starting fresh: {}", e);
            BackgroundRunStats::default()
        });
        BackgroundOrchestrator {
            queue,
            resolver,
            scheduler,
            store,
            clock,
            config,
            running: AtomicBool::new(false),
            timer: Mutex::new(None),
            app_state: Mutex::new(AppState::Foreground),
            stats: Mutex::new(stats),
        }
    }

    pub fn app_state(&self) -> AppState {
        *lock(&self.app_state)
    }

    pub fn stats(&self) -> BackgroundRunStats {
        lock(&self.stats).clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Cancel whatever timer is armed and install a fresh token for `state`.
    fn rearm(&self, state: AppState) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.timer).replace(token.clone()) {
            previous.cancel();
        }
        *lock(&self.app_state) = state;
        token
    }

    /// Run shortly after entering the background, then periodically.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_app_backgrounded(self: &Arc<Self>) {
        tracing::info!("App backgrounded");
        let token = self.rearm(AppState::Background);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(this.config.background_delay()) => {}
            }
            this.run_logged().await;

            let period = this.config.background_interval();
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => this.run_logged().await,
                }
            }
            tracing::debug!("background timer stopped");
        });
    }

    /// Refresh now, then keep a foreground tick running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_app_foregrounded(self: &Arc<Self>) {
        tracing::info!("App foregrounded");
        let token = self.rearm(AppState::Foreground);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let period = this.config.foreground_interval();
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => this.foreground_pass().await,
                }
            }
            tracing::debug!("foreground timer stopped");
        });
    }

    /// Cancel any armed timer. An in-flight run finishes on its own.
    pub fn stop(&self) {
        if let Some(token) = lock(&self.timer).take() {
            token.cancel();
        }
    }

    async fn foreground_pass(&self) {
        if let Err(e) = self.queue.drain().await {
            tracing::warn!("Foreground drain failed: {}", e);
        }
        if let Err(e) = self.scheduler.run_pass(&PassFilter::all()).await {
            tracing::warn!("Foreground sync pass failed: {}", e);
        }
    }

    async fn run_logged(&self) {
        if let Err(e) = self.force_run().await {
            tracing::warn!("Background run failed: {}", e);
        }
    }

    /// Run one bounded background run now.
    ///
    /// Returns `None` if a run is already in progress. A failing step ends
    /// the run with [`RunOutcome::Failed`]; the summary is still returned.
    pub async fn force_run(&self) -> Result<Option<RunSummary>> {
        let Some(_guard) = BusyGuard::try_acquire(&self.running) else {
            tracing::debug!("background run already in progress, skipping");
            return Ok(None);
        };

        let started = Instant::now();
        let deadline = started + self.config.run_budget();
        let mut counts = RunCounts::default();
        let outcome = match self.execute_run(deadline, &mut counts).await {
            Ok(false) => RunOutcome::Success,
            Ok(true) => RunOutcome::Partial,
            Err(e) => RunOutcome::Failed(e.to_string()),
        };

        let summary = RunSummary {
            outcome,
            actions_delivered: counts.actions_delivered,
            items_synced: counts.items_synced,
            conflicts_detected: counts.conflicts_detected,
            conflicts_resolved: counts.conflicts_resolved,
            requeued: counts.requeued,
            duration: started.elapsed(),
        };
        self.record(&summary);
        Ok(Some(summary))
    }

    /// Returns true if the deadline cut the run short.
    async fn execute_run(&self, deadline: Instant, counts: &mut RunCounts) -> Result<bool> {
        let mut exhausted = false;

        if let Some(report) = self.queue.drain_until(Some(deadline)).await? {
            counts.actions_delivered = report.completed;
            counts.conflicts_detected = report.conflicts.len();
            exhausted |= report.budget_exhausted;
        }
        if Instant::now() >= deadline {
            return Ok(true);
        }

        if let Some(report) = self
            .scheduler
            .run_pass_until(&PassFilter::critical_background(), Some(deadline))
            .await?
        {
            counts.items_synced = report.synced;
            exhausted |= report.budget_exhausted;
        }
        if Instant::now() >= deadline {
            return Ok(true);
        }

        for record in self
            .resolver
            .auto_resolve_pending(self.config.auto_resolve_limit)?
        {
            counts.conflicts_resolved += 1;
            match self.queue.requeue_resolution(&record) {
                Ok(Some(_)) => counts.requeued += 1,
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    "Failed to re-queue resolution of conflict {}: {}",
                    record.id,
                    e
                ),
            }
        }
        Ok(exhausted)
    }

    fn record(&self, summary: &RunSummary) {
        let duration_ms = u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX);
        let items = (summary.actions_delivered + summary.items_synced) as u64;

        let mut stats = lock(&self.stats);
        stats.record(
            &summary.outcome,
            duration_ms,
            items,
            summary.conflicts_resolved as u64,
            self.clock.now(),
            self.config.recent_errors,
        );
        if let Err(e) = self.store.save_run_stats(&stats) {
            tracing::warn!("Failed to persist background run stats: {}", e);
        }
        drop(stats);

        match &summary.outcome {
            RunOutcome::Failed(message) => {
                tracing::warn!("Background run failed after {:?}: {}", summary.duration, message)
            }
            outcome => tracing::info!(
                "Background run {} in {:?}: {} actions, {} items, {} conflicts resolved",
                if *outcome == RunOutcome::Partial {
                    "hit its budget"
                } else {
                    "finished"
                },
                summary.duration,
                summary.actions_delivered,
                summary.items_synced,
                summary.conflicts_resolved
            ),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
