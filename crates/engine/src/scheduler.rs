// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read/refresh scheduling.
//!
//! A pass selects due sync items, gates them by the strategy for the current
//! connection quality and by their dependencies, orders them by effective
//! priority and runs them in bounded-concurrency batches until done or out
//! of budget.
//!
//! ```text
//! due ─► filter ─► eligible priority ─► media ─► boost ─► deps ─► sort ─► batches
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::time::Instant;

use tether_core::id::{generate_unique_id, nonce, SYNC_ITEM_PREFIX};
use tether_core::{
    BackoffPolicy, Clock, ConnectionQuality, Store, SyncDomain, SyncItem, SyncPriority,
};

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::events::{EngineEvent, EventBus};
use crate::guard::BusyGuard;
use crate::transport::{DeliveryError, SyncExecutor};

/// Limits applied to a pass at a given connection quality.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStrategy {
    pub quality: ConnectionQuality,
    pub batch_size: usize,
    pub concurrent: usize,
    pub allow_media: bool,
    /// Priorities eligible this pass. Empty means nothing runs.
    pub priorities: Vec<SyncPriority>,
    pub max_duration: Duration,
}

impl SyncStrategy {
    pub fn for_quality(quality: ConnectionQuality) -> Self {
        use SyncPriority::*;
        let (batch_size, concurrent, allow_media, priorities, secs) = match quality {
            ConnectionQuality::Excellent => (20, 5, true, SyncPriority::ALL.to_vec(), 60),
            ConnectionQuality::Good => (10, 3, true, vec![Critical, High, Medium], 45),
            ConnectionQuality::Poor => (5, 1, false, vec![Critical, High], 20),
            ConnectionQuality::Offline => (0, 0, false, Vec::new(), 0),
        };
        SyncStrategy {
            quality,
            batch_size,
            concurrent,
            allow_media,
            priorities,
            max_duration: Duration::from_secs(secs),
        }
    }

    pub fn allows(&self, priority: SyncPriority) -> bool {
        self.priorities.contains(&priority)
    }
}

/// Narrows a pass to some domains or priorities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassFilter {
    pub domains: Option<Vec<SyncDomain>>,
    pub priorities: Option<Vec<SyncPriority>>,
}

impl PassFilter {
    /// Every queued item.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn domain(domain: SyncDomain) -> Self {
        PassFilter {
            domains: Some(vec![domain]),
            priorities: None,
        }
    }

    /// Critical messaging items, for background runs.
    pub fn critical_background() -> Self {
        PassFilter {
            domains: Some(vec![
                SyncDomain::Messages,
                SyncDomain::Chats,
                SyncDomain::Notifications,
            ]),
            priorities: Some(vec![SyncPriority::Critical]),
        }
    }

    pub fn matches(&self, item: &SyncItem) -> bool {
        self.domains
            .as_ref()
            .map_or(true, |domains| domains.contains(&item.domain))
            && self
                .priorities
                .as_ref()
                .map_or(true, |priorities| priorities.contains(&item.priority))
    }
}

/// Parameters for [`SyncScheduler::schedule`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    pub domain: SyncDomain,
    pub priority: SyncPriority,
    pub target_id: Option<String>,
    pub metadata: Map<String, Value>,
    pub dependencies: BTreeSet<String>,
    pub estimated_size: u64,
    pub estimated_time: u64,
}

impl SyncRequest {
    pub fn new(domain: SyncDomain, priority: SyncPriority) -> Self {
        SyncRequest {
            domain,
            priority,
            target_id: None,
            metadata: Map::new(),
            dependencies: BTreeSet::new(),
            estimated_size: 0,
            estimated_time: 0,
        }
    }

    pub fn target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn depends_on(mut self, item_id: impl Into<String>) -> Self {
        self.dependencies.insert(item_id.into());
        self
    }

    pub fn estimated(mut self, size: u64, time_ms: u64) -> Self {
        self.estimated_size = size;
        self.estimated_time = time_ms;
        self
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub synced: usize,
    /// Failed and rescheduled.
    pub failed: usize,
    /// Removed after a terminal failure or exhausted retries.
    pub dropped: usize,
    /// Due and matching the filter, but not attempted.
    pub skipped: usize,
    /// Outcomes that could not be stored; those items stay queued as they were.
    pub errors: usize,
    pub duration: Duration,
    pub quality: ConnectionQuality,
    pub budget_exhausted: bool,
}

/// Rolling totals across passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulerStats {
    pub passes: u64,
    pub items_synced: u64,
    pub items_failed: u64,
    pub items_dropped: u64,
    pub average_pass_ms: f64,
    pub average_item_ms: f64,
    pub last_pass_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    items_timed: u64,
}

impl SchedulerStats {
    fn record(&mut self, report: &PassReport, item_times: &[Duration], at: DateTime<Utc>) {
        self.passes += 1;
        self.items_synced += report.synced as u64;
        self.items_failed += report.failed as u64;
        self.items_dropped += report.dropped as u64;
        self.average_pass_ms +=
            (report.duration.as_secs_f64() * 1000.0 - self.average_pass_ms) / self.passes as f64;
        for time in item_times {
            self.items_timed += 1;
            self.average_item_ms +=
                (time.as_secs_f64() * 1000.0 - self.average_item_ms) / self.items_timed as f64;
        }
        self.last_pass_at = Some(at);
    }
}

pub struct SyncScheduler {
    store: Store,
    clock: Arc<dyn Clock>,
    executor: Arc<dyn SyncExecutor>,
    config: SchedulerConfig,
    backoff: BackoffPolicy,
    quality: watch::Receiver<ConnectionQuality>,
    activity: Mutex<HashMap<String, DateTime<Utc>>>,
    stats: Mutex<SchedulerStats>,
    events: Arc<EventBus<EngineEvent>>,
    running: AtomicBool,
}

impl SyncScheduler {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        executor: Arc<dyn SyncExecutor>,
        config: SchedulerConfig,
        backoff: BackoffPolicy,
        quality: watch::Receiver<ConnectionQuality>,
        events: Arc<EventBus<EngineEvent>>,
    ) -> Self {
        SyncScheduler {
            store,
            clock,
            executor,
            config,
            backoff,
            quality,
            activity: Mutex::new(HashMap::new()),
            stats: Mutex::new(SchedulerStats::default()),
            events,
            running: AtomicBool::new(false),
        }
    }

    /// Queue a refresh, or fold it into the queued item for the same
    /// domain and target.
    pub fn schedule(&self, request: SyncRequest) -> Result<String> {
        let now = self.clock.now();

        if let Some(mut existing) = self
            .store
            .find_sync_item(request.domain, request.target_id.as_deref())?
        {
            self.check_dependencies(&existing.id, &request.dependencies)?;
            existing.priority = existing.priority.min(request.priority);
            existing.dependencies.extend(request.dependencies);
            existing.metadata.extend(request.metadata);
            if request.estimated_size > 0 {
                existing.estimated_size = request.estimated_size;
            }
            if request.estimated_time > 0 {
                existing.estimated_time = request.estimated_time;
            }
            existing.updated_at = now;
            self.store.update_sync_item(&existing)?;
            tracing::debug!(id = %existing.id, domain = %existing.domain, "sync item merged");
            return Ok(existing.id);
        }

        let seed = format!(
            "{}{}{}",
            request.domain,
            request.target_id.as_deref().unwrap_or_default(),
            nonce()
        );
        let id = generate_unique_id(SYNC_ITEM_PREFIX, &seed, &now, |id| {
            self.store.sync_item_exists(id)
        })?;
        self.check_dependencies(&id, &request.dependencies)?;

        let mut item = SyncItem::new(
            id.clone(),
            request.domain,
            request.priority,
            request.target_id,
            self.config.max_retries,
            now,
        );
        item.metadata = request.metadata;
        item.dependencies = request.dependencies;
        item.estimated_size = request.estimated_size;
        item.estimated_time = request.estimated_time;
        self.store.insert_sync_item(&item)?;
        tracing::debug!(id = %id, domain = %item.domain, priority = %item.priority, "sync item scheduled");
        Ok(id)
    }

    /// Reject dependencies that would make `id` (transitively) depend on itself.
    fn check_dependencies(&self, id: &str, dependencies: &BTreeSet<String>) -> Result<()> {
        if dependencies.contains(id) {
            return Err(tether_core::Error::SelfDependency(id.to_string()).into());
        }
        if dependencies.is_empty() {
            return Ok(());
        }

        let graph: HashMap<String, BTreeSet<String>> = self
            .store
            .list_sync_items()?
            .into_iter()
            .map(|item| (item.id, item.dependencies))
            .collect();

        let mut stack: Vec<&str> = dependencies.iter().map(String::as_str).collect();
        let mut visited = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == id {
                return Err(tether_core::Error::CycleDetected(id.to_string()).into());
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(next) = graph.get(node) {
                stack.extend(next.iter().map(String::as_str));
            }
        }
        Ok(())
    }

    /// Note user interaction with a target, boosting its items for a while.
    pub fn record_activity(&self, target_id: &str) {
        let now = self.clock.now();
        let window = chrono::Duration::from_std(self.config.boost_window())
            .unwrap_or(chrono::Duration::zero());
        let mut activity = lock(&self.activity);
        activity.retain(|_, at| now - *at <= window);
        activity.insert(target_id.to_string(), now);
    }

    fn effective_priority(
        &self,
        item: &SyncItem,
        now: DateTime<Utc>,
        activity: &HashMap<String, DateTime<Utc>>,
    ) -> SyncPriority {
        let window = chrono::Duration::from_std(self.config.boost_window())
            .unwrap_or(chrono::Duration::zero());
        let recent = item
            .target_id
            .as_ref()
            .and_then(|target| activity.get(target))
            .is_some_and(|at| now - *at <= window);
        if recent {
            item.priority.boosted(self.config.boost_steps)
        } else {
            item.priority
        }
    }

    /// Strategy for the current connection quality.
    pub fn strategy(&self) -> SyncStrategy {
        SyncStrategy::for_quality(*self.quality.borrow())
    }

    /// Run one pass. Returns `None` if a pass is already running.
    pub async fn run_pass(&self, filter: &PassFilter) -> Result<Option<PassReport>> {
        self.run_pass_until(filter, None).await
    }

    /// Like [`run_pass`](Self::run_pass), with an extra deadline on top of
    /// the strategy's own budget.
    pub async fn run_pass_until(
        &self,
        filter: &PassFilter,
        deadline: Option<Instant>,
    ) -> Result<Option<PassReport>> {
        let Some(_guard) = BusyGuard::try_acquire(&self.running) else {
            tracing::debug!("sync pass already in progress, skipping");
            return Ok(None);
        };

        match self.execute_pass(filter, deadline).await {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                tracing::warn!("Sync pass failed: {}", e);
                self.events.publish(EngineEvent::SyncFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute_pass(
        &self,
        filter: &PassFilter,
        deadline: Option<Instant>,
    ) -> Result<PassReport> {
        let started = Instant::now();
        let strategy = self.strategy();
        let mut report = PassReport {
            quality: strategy.quality,
            ..PassReport::default()
        };

        let now = self.clock.now();
        let items = self.store.list_sync_items()?;
        let queued: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();
        let activity = lock(&self.activity).clone();

        let mut selected: Vec<(SyncPriority, &SyncItem)> = Vec::new();
        for item in items.iter().filter(|item| filter.matches(item) && item.is_due(now)) {
            let blocked = !strategy.allows(item.priority)
                || (item.domain.is_media() && !strategy.allow_media)
                || item.dependencies.iter().any(|dep| queued.contains(dep.as_str()));
            if blocked {
                report.skipped += 1;
            } else {
                selected.push((self.effective_priority(item, now, &activity), item));
            }
        }
        selected.sort_by_key(|(priority, item)| (*priority, item.created_at));

        if selected.is_empty() {
            report.duration = started.elapsed();
            tracing::debug!(
                quality = %strategy.quality,
                skipped = report.skipped,
                "nothing to sync"
            );
            return Ok(report);
        }

        let budget_end = started + strategy.max_duration;
        let deadline = deadline.map_or(budget_end, |d| d.min(budget_end));

        self.events.publish(EngineEvent::SyncStarted {
            quality: strategy.quality,
        });
        tracing::info!(
            "Sync pass over {} items ({} connection, batches of {}, {} concurrent)",
            selected.len(),
            strategy.quality,
            strategy.batch_size,
            strategy.concurrent
        );

        let mut item_times = Vec::new();
        let mut remaining = selected.len();
        for batch in selected.chunks(strategy.batch_size.max(1)) {
            if Instant::now() >= deadline {
                report.budget_exhausted = true;
                report.skipped += remaining;
                break;
            }
            remaining -= batch.len();

            let pending: Vec<_> = batch
                .iter()
                .map(|&(_, item)| async move {
                    let began = Instant::now();
                    let outcome = tokio::time::timeout_at(deadline, self.executor.sync(item))
                        .await
                        .ok();
                    (item, outcome, began.elapsed())
                })
                .collect();
            let outcomes: Vec<_> = stream::iter(pending)
            .buffer_unordered(strategy.concurrent.max(1))
            .collect()
            .await;

            for (item, outcome, elapsed) in outcomes {
                match outcome {
                    Some(result) => {
                        item_times.push(elapsed);
                        if let Err(e) = self.settle(item.clone(), result, &mut report) {
                            report.errors += 1;
                            tracing::warn!(
                                "Failed to record the outcome of sync item {}: {}",
                                item.id,
                                e
                            );
                        }
                    }
                    None => {
                        tracing::debug!(id = %item.id, "sync item cut off by the pass budget");
                        report.budget_exhausted = true;
                        report.skipped += 1;
                    }
                }
            }
        }

        report.duration = started.elapsed();
        lock(&self.stats).record(&report, &item_times, self.clock.now());
        tracing::info!(
            "Sync pass done in {:?}: {} synced, {} retrying, {} dropped, {} skipped",
            report.duration,
            report.synced,
            report.failed,
            report.dropped,
            report.skipped
        );
        self.events
            .publish(EngineEvent::SyncCompleted(report.clone()));
        Ok(report)
    }

    fn settle(
        &self,
        mut item: SyncItem,
        outcome: std::result::Result<(), DeliveryError>,
        report: &mut PassReport,
    ) -> Result<()> {
        let err = match outcome {
            Ok(()) => {
                self.store.delete_sync_item(&item.id)?;
                report.synced += 1;
                tracing::debug!(id = %item.id, domain = %item.domain, "sync item done");
                return Ok(());
            }
            Err(err) => err,
        };

        if err.is_retryable() && item.retry_count < item.max_retries {
            item.retry_count += 1;
        }
        if !err.is_retryable() || item.retry_count >= item.max_retries {
            self.store.delete_sync_item(&item.id)?;
            report.dropped += 1;
            tracing::warn!(
                "Dropped sync item {} ({}) after {} retries: {}",
                item.id,
                item.domain,
                item.retry_count,
                err
            );
            return Ok(());
        }

        let now = self.clock.now();
        let delay = self
            .backoff
            .delay(item.retry_count, self.config.multiplier(item.domain));
        item.next_retry_at =
            now + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        item.last_error = Some(err.message);
        item.updated_at = now;
        self.store.update_sync_item(&item)?;
        report.failed += 1;
        Ok(())
    }

    /// Remove a queued item. Returns false if it was not queued.
    pub fn cancel(&self, id: &str) -> Result<bool> {
        Ok(self.store.delete_sync_item(id)?)
    }

    pub fn get(&self, id: &str) -> Result<SyncItem> {
        Ok(self.store.get_sync_item(id)?)
    }

    /// Every queued item in `(priority, created_at)` order.
    pub fn pending(&self) -> Result<Vec<SyncItem>> {
        Ok(self.store.list_sync_items()?)
    }

    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.store.count_sync_items()?)
    }

    pub fn stats(&self) -> SchedulerStats {
        lock(&self.stats).clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(std::sync::atomic::Ordering::Acquire)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
