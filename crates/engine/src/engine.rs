// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The [`SyncEngine`] facade.
//!
//! Owns one instance of each component over a shared store, clock and event
//! bus, and wires them together:
//! - a restored connection drains the queue immediately
//! - the queue records delivery conflicts through the resolver
//! - resolutions the server lacks are queued again as new actions

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use tether_core::{
    ActionPayload, ActionPriority, ActionStatus, BackgroundRunStats, Clock, ConflictRecord,
    ConnectionEvent, ConnectionQuality, ConnectionState, ConnectionType, QueueStats,
    QueuedAction, ResolutionStrategy, Store, SyncDomain, SyncItem, SystemClock, UserChoice,
};

use crate::background::{AppState, BackgroundOrchestrator, RunSummary};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{ConnectionNotice, EngineEvent, EventBus, Subscription};
use crate::monitor::ConnectionMonitor;
use crate::queue::{ActionQueue, DrainReport};
use crate::resolver::{ConflictResolver, ResolutionResult};
use crate::scheduler::{PassFilter, PassReport, SchedulerStats, SyncRequest, SyncScheduler};
use crate::transport::{ActionExecutor, Disconnected, Prober, Reachability, SyncExecutor};

/// What the embedding application plugs into the engine.
#[derive(Clone)]
pub struct Collaborators {
    pub action_executor: Arc<dyn ActionExecutor>,
    pub sync_executor: Arc<dyn SyncExecutor>,
    pub prober: Arc<dyn Prober>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// No network, wall-clock time.
    pub fn disconnected() -> Self {
        Collaborators {
            action_executor: Arc::new(Disconnected),
            sync_executor: Arc::new(Disconnected),
            prober: Arc::new(Disconnected),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Point-in-time summary for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub online: bool,
    pub connection_type: ConnectionType,
    pub quality: ConnectionQuality,
    pub app_state: String,
    pub started: bool,
    pub queue: QueueStats,
    pub pending_sync_items: usize,
    pub pending_conflicts: usize,
    /// Latest of the last sync pass and the last background run.
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Rows removed by [`SyncEngine::purge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub actions: usize,
    pub conflicts: usize,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

pub struct SyncEngine {
    store: Store,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus<EngineEvent>>,
    monitor: Arc<ConnectionMonitor>,
    queue: Arc<ActionQueue>,
    resolver: Arc<ConflictResolver>,
    scheduler: Arc<SyncScheduler>,
    background: Arc<BackgroundOrchestrator>,
    drain_requested: Arc<Notify>,
    drain_interval: std::time::Duration,
    running: Mutex<Option<Running>>,
}

impl SyncEngine {
    /// Open the configured store and build every component.
    ///
    /// Failing to open or migrate the store is fatal.
    pub fn open(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let path = config.store_path();
        let store = Store::open(&path)?;
        tracing::info!("Opened sync store at {}", path.display());
        Self::with_store(config, store, collaborators)
    }

    /// Build the engine over an already open store.
    pub fn with_store(config: Config, store: Store, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let Collaborators {
            action_executor,
            sync_executor,
            prober,
            clock,
        } = collaborators;
        let events = Arc::new(EventBus::default());

        let monitor = Arc::new(ConnectionMonitor::new(
            store.clone(),
            clock.clone(),
            prober,
            config.connection.clone(),
        ));
        let resolver = Arc::new(ConflictResolver::new(
            store.clone(),
            clock.clone(),
            config.conflicts.clone(),
            events.clone(),
        ));
        let queue = Arc::new(ActionQueue::new(
            store.clone(),
            clock.clone(),
            action_executor,
            resolver.clone(),
            config.queue.clone(),
            config.backoff.clone(),
            events.clone(),
        ));
        let scheduler = Arc::new(SyncScheduler::new(
            store.clone(),
            clock.clone(),
            sync_executor,
            config.scheduler.clone(),
            config.backoff.policy(),
            monitor.quality_watch(),
            events.clone(),
        ));
        let background = Arc::new(BackgroundOrchestrator::new(
            queue.clone(),
            resolver.clone(),
            scheduler.clone(),
            store.clone(),
            clock.clone(),
            config.background.clone(),
        ));

        Ok(SyncEngine {
            store,
            clock,
            events,
            monitor,
            queue,
            resolver,
            scheduler,
            background,
            drain_requested: Arc::new(Notify::new()),
            drain_interval: config.queue.drain_interval(),
            running: Mutex::new(None),
        })
    }

    /// Recover interrupted actions and start the connection monitor, the
    /// reconnect listener and the periodic drain.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, reachability: mpsc::Receiver<Reachability>) -> Result<()> {
        let mut running = lock(&self.running);
        if running.is_some() {
            return Err(Error::AlreadyStarted);
        }

        if let Err(e) = self.queue.recover() {
            tracing::warn!("Failed to recover interrupted actions: {}", e);
        }

        let cancel = CancellationToken::new();
        // Subscribe before the monitor runs so no transition is missed.
        let notices = self.monitor.subscribe();

        let monitor_task = {
            let monitor = Arc::clone(&self.monitor);
            let cancel = cancel.clone();
            tokio::spawn(async move { monitor.run(reachability, cancel).await })
        };
        let listener_task = tokio::spawn(listen_for_reconnects(
            notices,
            Arc::clone(&self.events),
            Arc::clone(&self.queue),
            cancel.clone(),
        ));
        let drain_task = tokio::spawn(drain_loop(
            Arc::clone(&self.queue),
            Arc::clone(&self.monitor),
            Arc::clone(&self.drain_requested),
            self.drain_interval,
            cancel.clone(),
        ));

        *running = Some(Running {
            cancel,
            tasks: vec![monitor_task, listener_task, drain_task],
        });
        tracing::info!("Sync engine started");
        Ok(())
    }

    /// Stop every task and timer. In-flight deliveries finish first.
    pub async fn stop(&self) -> Result<()> {
        let Some(running) = lock(&self.running).take() else {
            return Err(Error::NotStarted);
        };
        running.cancel.cancel();
        self.background.stop();
        for task in running.tasks {
            if let Err(e) = task.await {
                tracing::warn!("Engine task ended abnormally: {}", e);
            }
        }
        tracing::info!("Sync engine stopped");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        lock(&self.running).is_some()
    }

    /// Queue a mutation and nudge the drain loop.
    pub fn enqueue_action(
        &self,
        payload: ActionPayload,
        target_id: Option<String>,
        priority: ActionPriority,
    ) -> Result<String> {
        let id = self.queue.enqueue(payload, target_id, priority)?;
        self.drain_requested.notify_one();
        Ok(id)
    }

    pub fn cancel_action(&self, id: &str) -> Result<bool> {
        self.queue.cancel(id)
    }

    pub fn retry_action(&self, id: &str) -> Result<QueuedAction> {
        let action = self.queue.retry(id)?;
        self.drain_requested.notify_one();
        Ok(action)
    }

    pub fn action(&self, id: &str) -> Result<QueuedAction> {
        self.queue.get(id)
    }

    pub fn actions(&self, status: Option<ActionStatus>) -> Result<Vec<QueuedAction>> {
        self.queue.list(status)
    }

    /// Drain now instead of waiting for the next tick.
    ///
    /// Returns `None` if a drain is already running.
    pub async fn drain(&self) -> Result<Option<DrainReport>> {
        self.queue.drain().await
    }

    pub fn schedule_sync(&self, request: SyncRequest) -> Result<String> {
        self.scheduler.schedule(request)
    }

    pub fn cancel_sync(&self, id: &str) -> Result<bool> {
        self.scheduler.cancel(id)
    }

    pub fn sync_items(&self) -> Result<Vec<SyncItem>> {
        self.scheduler.pending()
    }

    /// Run a pass now, over one domain or everything.
    ///
    /// Returns `None` if a pass is already running.
    pub async fn force_sync(&self, domain: Option<SyncDomain>) -> Result<Option<PassReport>> {
        let filter = domain.map_or_else(PassFilter::all, PassFilter::domain);
        self.scheduler.run_pass(&filter).await
    }

    pub fn record_activity(&self, target_id: &str) {
        self.scheduler.record_activity(target_id);
    }

    /// Pending conflicts, oldest first.
    pub fn conflicts(&self) -> Result<Vec<ConflictRecord>> {
        self.resolver.pending()
    }

    pub fn all_conflicts(&self) -> Result<Vec<ConflictRecord>> {
        self.resolver.list(None)
    }

    pub fn conflict(&self, id: &str) -> Result<ConflictRecord> {
        self.resolver.get(id)
    }

    /// Settle a conflict and queue the outcome if the server lacks it.
    pub fn resolve_conflict(
        &self,
        id: &str,
        strategy: Option<ResolutionStrategy>,
        choice: Option<UserChoice>,
    ) -> Result<ResolutionResult> {
        let result = self.resolver.resolve(id, strategy, choice)?;
        if let ResolutionResult::Resolved(record) = &result {
            if self.queue.requeue_resolution(record)?.is_some() {
                self.drain_requested.notify_one();
            }
        }
        Ok(result)
    }

    pub fn cancel_conflict(&self, id: &str) -> Result<bool> {
        self.resolver.cancel(id)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.monitor.state()
    }

    /// Newest first.
    pub fn connection_history(&self) -> Vec<ConnectionEvent> {
        self.monitor.history()
    }

    /// Probe now and return the resulting connection state.
    pub async fn refresh_connection(&self) -> ConnectionState {
        self.monitor.force_refresh().await
    }

    pub fn status(&self) -> Result<EngineStatus> {
        let connection = self.monitor.state();
        let last_pass = self.scheduler.stats().last_pass_at;
        let last_run = self.background.stats().last_run_at;
        Ok(EngineStatus {
            online: connection.is_online,
            connection_type: connection.connection_type,
            quality: connection.quality,
            app_state: self.background.app_state().to_string(),
            started: self.is_started(),
            queue: self.queue.stats()?,
            pending_sync_items: self.scheduler.pending_count()?,
            pending_conflicts: self.resolver.pending()?.len(),
            last_sync_at: last_pass.max(last_run),
        })
    }

    pub fn subscribe(&self) -> Subscription<EngineEvent> {
        self.events.subscribe()
    }

    /// Must be called from within a tokio runtime.
    pub fn on_app_backgrounded(&self) {
        self.background.on_app_backgrounded();
    }

    /// Must be called from within a tokio runtime.
    pub fn on_app_foregrounded(&self) {
        self.background.on_app_foregrounded();
    }

    pub fn app_state(&self) -> AppState {
        self.background.app_state()
    }

    pub async fn force_background_run(&self) -> Result<Option<RunSummary>> {
        self.background.force_run().await
    }

    pub fn background_stats(&self) -> BackgroundRunStats {
        self.background.stats()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Delete settled actions and conflicts past their retention windows.
    pub fn purge(&self) -> Result<PurgeReport> {
        let report = PurgeReport {
            actions: self.queue.purge(self.queue.retention())?,
            conflicts: self.resolver.purge(self.resolver.retention())?,
        };
        tracing::debug!(
            actions = report.actions,
            conflicts = report.conflicts,
            at = %self.clock.now(),
            "purge finished"
        );
        Ok(report)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

/// Drain once, logging instead of propagating a failed drain.
async fn drain_logged(queue: &ActionQueue) {
    if let Err(e) = queue.drain().await {
        tracing::warn!("Drain failed: {}", e);
    }
}

/// Translate connection notices into engine events, draining on restore.
async fn listen_for_reconnects(
    mut notices: Subscription<ConnectionNotice>,
    events: Arc<EventBus<EngineEvent>>,
    queue: Arc<ActionQueue>,
    cancel: CancellationToken,
) {
    loop {
        let notice = tokio::select! {
            _ = cancel.cancelled() => break,
            notice = notices.recv() => notice,
        };
        match notice {
            Some(ConnectionNotice::ConnectionLost) => events.publish(EngineEvent::Offline),
            Some(ConnectionNotice::ConnectionRestored { offline_for }) => {
                events.publish(EngineEvent::Online { offline_for });
                drain_logged(&queue).await;
            }
            Some(_) => {}
            None => break,
        }
    }
    tracing::debug!("reconnect listener stopped");
}

/// Drain on request and on a fixed interval while online.
async fn drain_loop(
    queue: Arc<ActionQueue>,
    monitor: Arc<ConnectionMonitor>,
    requested: Arc<Notify>,
    period: std::time::Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = requested.notified() => {}
            _ = ticker.tick() => {}
        }
        if monitor.is_online() {
            drain_logged(&queue).await;
        }
    }
    tracing::debug!("drain loop stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
