// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue of outgoing mutations.
//!
//! Actions are persisted on enqueue and delivered by [`ActionQueue::drain`]
//! in `(priority, created_at)` order. Retryable failures are rescheduled
//! with exponential backoff. A conflict is recorded through the resolver
//! before the action is cancelled; one that yields no record fails the
//! action terminally instead.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use tether_core::id::{generate_unique_id, nonce, ACTION_PREFIX};
use tether_core::merge;
use tether_core::{
    ActionKind, ActionPayload, ActionPriority, ActionStatus, Clock, ConflictRecord,
    EntitySnapshot, QueueStats, QueuedAction, Store,
};

use crate::config::{BackoffConfig, QueueConfig};
use crate::error::Result;
use crate::events::{EngineEvent, EventBus};
use crate::guard::BusyGuard;
use crate::resolver::ConflictResolver;
use crate::transport::{ActionExecutor, DeliveryError, FailureKind, ServerConflict};

/// `last_error` of an action cancelled to make room.
pub const EVICTED: &str = "evicted: queue full";

/// `last_error` of an action whose delivery hit a recorded conflict.
pub const CONFLICT: &str = "conflict";

/// `last_error` of an action rejected with a conflict that has no fields
/// to resolve (its kind has no schema, or no schema field diverges).
pub const UNRESOLVABLE_CONFLICT: &str = "conflict: nothing to resolve";

/// A delivery rejected because the server holds a diverging version.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryConflict {
    pub action_id: String,
    pub kind: ActionKind,
    pub entity_id: String,
    pub local: EntitySnapshot,
    pub server: EntitySnapshot,
}

/// Outcome of one drain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    pub attempted: usize,
    pub completed: usize,
    /// Failed but rescheduled.
    pub retried: usize,
    /// Failed terminally.
    pub failed: usize,
    /// Conflicts recorded for cancelled actions.
    pub conflicts: Vec<ConflictRecord>,
    /// Outcomes that could not be stored; those actions went back to pending.
    pub errors: usize,
    pub duration: Duration,
    /// The deadline passed before every due action was attempted.
    pub budget_exhausted: bool,
}

pub struct ActionQueue {
    store: Store,
    clock: Arc<dyn Clock>,
    executor: Arc<dyn ActionExecutor>,
    resolver: Arc<ConflictResolver>,
    config: QueueConfig,
    backoff: BackoffConfig,
    events: Arc<EventBus<EngineEvent>>,
    draining: AtomicBool,
}

impl ActionQueue {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        executor: Arc<dyn ActionExecutor>,
        resolver: Arc<ConflictResolver>,
        config: QueueConfig,
        backoff: BackoffConfig,
        events: Arc<EventBus<EngineEvent>>,
    ) -> Self {
        ActionQueue {
            store,
            clock,
            executor,
            resolver,
            config,
            backoff,
            events,
            draining: AtomicBool::new(false),
        }
    }

    /// Persist a new pending action and return its id.
    ///
    /// A full queue evicts its least urgent, oldest pending action first.
    pub fn enqueue(
        &self,
        payload: ActionPayload,
        target_id: Option<String>,
        priority: ActionPriority,
    ) -> Result<String> {
        self.make_room()?;

        let now = self.clock.now();
        let kind = payload.kind();
        let seed = format!("{}{}{}", kind, payload.entity_id(), nonce());
        let id = generate_unique_id(ACTION_PREFIX, &seed, &now, |id| {
            self.store.action_exists(id)
        })?;
        let max_retries = if kind.is_ephemeral() {
            0
        } else {
            self.config.max_retries
        };

        let action = QueuedAction::new(id.clone(), payload, target_id, priority, max_retries, now);
        self.store.insert_action(&action)?;
        tracing::debug!(id = %id, kind = %kind, priority = %priority, "action queued");
        self.events.publish(EngineEvent::ActionQueued {
            id: id.clone(),
            kind,
        });
        Ok(id)
    }

    fn make_room(&self) -> Result<()> {
        loop {
            let live = self.store.action_counts()?.live();
            if live < self.config.capacity {
                return Ok(());
            }
            let Some(victim) = self.store.eviction_candidate()? else {
                return Err(tether_core::Error::QueueFull {
                    capacity: self.config.capacity,
                }
                .into());
            };
            self.store.transition_action(
                &victim.id,
                ActionStatus::Cancelled,
                Some(EVICTED),
                self.clock.now(),
            )?;
            tracing::warn!(
                "Evicted action {} ({}, {}) to make room in a full queue",
                victim.id,
                victim.kind,
                victim.priority
            );
        }
    }

    /// Deliver every due action. Returns `None` if a drain is already running.
    pub async fn drain(&self) -> Result<Option<DrainReport>> {
        self.drain_until(None).await
    }

    /// Like [`drain`](Self::drain), but stops starting new deliveries once
    /// `deadline` has passed. In-flight deliveries are not interrupted.
    pub async fn drain_until(&self, deadline: Option<Instant>) -> Result<Option<DrainReport>> {
        let Some(_guard) = BusyGuard::try_acquire(&self.draining) else {
            tracing::debug!("drain already in progress, skipping");
            return Ok(None);
        };

        let started = Instant::now();
        let mut report = DrainReport::default();

        for due in self.store.due_actions(self.clock.now())? {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                report.budget_exhausted = true;
                break;
            }

            // Cancelled since the due list was read.
            let action = match self.store.transition_action(
                &due.id,
                ActionStatus::Processing,
                None,
                self.clock.now(),
            ) {
                Ok(action) => action,
                Err(tether_core::Error::InvalidTransition { .. })
                | Err(tether_core::Error::ActionNotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };

            report.attempted += 1;
            let id = action.id.clone();
            let outcome = self.executor.execute(&action).await;
            if let Err(e) = self.settle(action, outcome, &mut report) {
                report.errors += 1;
                tracing::warn!("Failed to record the outcome of action {}: {}", id, e);
                self.release(&id, &e.to_string());
            }
        }

        report.duration = started.elapsed();
        if report.attempted > 0 {
            tracing::info!(
                "Drained {} actions: {} completed, {} retrying, {} failed, {} conflicts, {} unrecorded",
                report.attempted,
                report.completed,
                report.retried,
                report.failed,
                report.conflicts.len(),
                report.errors
            );
        }
        Ok(Some(report))
    }

    fn settle(
        &self,
        mut action: QueuedAction,
        outcome: std::result::Result<(), DeliveryError>,
        report: &mut DrainReport,
    ) -> Result<()> {
        let now = self.clock.now();
        let err = match outcome {
            Ok(()) => {
                self.store
                    .transition_action(&action.id, ActionStatus::Completed, None, now)?;
                report.completed += 1;
                tracing::debug!(id = %action.id, kind = %action.kind, "action delivered");
                self.events.publish(EngineEvent::ActionCompleted {
                    id: action.id,
                    kind: action.kind,
                });
                return Ok(());
            }
            Err(err) => err,
        };

        if let FailureKind::Conflict(server) = &err.kind {
            let message = match self.record_conflict(&action, server) {
                Ok(Some(record)) => {
                    self.store.transition_action(
                        &action.id,
                        ActionStatus::Cancelled,
                        Some(CONFLICT),
                        now,
                    )?;
                    tracing::info!(
                        "Action {} ({}) conflicts with the server copy of {}, recorded as {}",
                        action.id,
                        action.kind,
                        record.entity_id,
                        record.id
                    );
                    report.conflicts.push(record);
                    return Ok(());
                }
                Ok(None) => UNRESOLVABLE_CONFLICT.to_string(),
                Err(e) => format!("conflict not recorded: {e}"),
            };
            return self.fail(action, message, now, report);
        }

        let retryable = err.is_retryable() && !action.retries_exhausted();
        if retryable {
            action.retry_count += 1;
        }
        if !retryable || action.retries_exhausted() {
            return self.fail(action, err.message, now, report);
        }

        let delay = self
            .backoff
            .policy()
            .delay(action.retry_count, self.backoff.multiplier(action.kind));
        action.status = ActionStatus::Pending;
        action.last_error = Some(err.message.clone());
        action.updated_at = now;
        action.next_retry_at =
            now + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        self.store.update_action(&action)?;
        report.retried += 1;
        tracing::debug!(
            id = %action.id,
            attempt = action.retry_count,
            delay_ms = delay.as_millis() as u64,
            "action rescheduled"
        );

        self.events.publish(EngineEvent::ActionFailed {
            id: action.id,
            kind: action.kind,
            error: err.message,
            terminal: false,
        });
        Ok(())
    }

    /// Mark an in-flight action failed for good.
    fn fail(
        &self,
        mut action: QueuedAction,
        message: String,
        now: chrono::DateTime<chrono::Utc>,
        report: &mut DrainReport,
    ) -> Result<()> {
        action.status = ActionStatus::Failed;
        action.last_error = Some(message.clone());
        action.updated_at = now;
        self.store.update_action(&action)?;
        report.failed += 1;
        tracing::warn!(
            "Action {} ({}) failed after {} retries: {}",
            action.id,
            action.kind,
            action.retry_count,
            message
        );
        self.events.publish(EngineEvent::ActionFailed {
            id: action.id,
            kind: action.kind,
            error: message,
            terminal: true,
        });
        Ok(())
    }

    /// Store the conflict a rejected delivery surfaced.
    fn record_conflict(
        &self,
        action: &QueuedAction,
        server: &ServerConflict,
    ) -> Result<Option<ConflictRecord>> {
        let local = merge::local_snapshot(&action.payload)?;
        self.resolver.detect_delivery(&DeliveryConflict {
            action_id: action.id.clone(),
            kind: action.kind,
            entity_id: action.payload.entity_id().to_string(),
            local: EntitySnapshot::new(local, action.created_at),
            server: EntitySnapshot::new(server.server_version.clone(), server.server_timestamp),
        })
    }

    /// Return an in-flight action to `pending` after its outcome was lost.
    fn release(&self, id: &str, error: &str) {
        if let Err(e) =
            self.store
                .transition_action(id, ActionStatus::Pending, Some(error), self.clock.now())
        {
            tracing::error!("Action {} is stuck in processing: {}", id, e);
        }
    }

    /// Cancel a pending action. Returns false if it is not pending.
    pub fn cancel(&self, id: &str) -> Result<bool> {
        let action = self.store.get_action(id)?;
        if action.status != ActionStatus::Pending {
            return Ok(false);
        }
        self.store
            .transition_action(id, ActionStatus::Cancelled, None, self.clock.now())?;
        tracing::debug!(id = %id, "action cancelled");
        Ok(true)
    }

    /// Give a terminally failed action a fresh set of retries.
    pub fn retry(&self, id: &str) -> Result<QueuedAction> {
        let now = self.clock.now();
        let current = self.store.get_action(id)?;
        if current.status != ActionStatus::Failed {
            return Err(tether_core::Error::InvalidTransition {
                from: current.status.to_string(),
                to: ActionStatus::Pending.to_string(),
            }
            .into());
        }
        let mut action = self
            .store
            .transition_action(id, ActionStatus::Pending, None, now)?;
        action.retry_count = 0;
        action.next_retry_at = now;
        self.store.update_action(&action)?;
        Ok(action)
    }

    /// Resubmit the value a conflict settled on, if the server lacks it.
    ///
    /// Returns the id of the new action, or `None` when nothing needs
    /// pushing (the server's value won, or the conflict had no source action).
    pub fn requeue_resolution(&self, record: &ConflictRecord) -> Result<Option<String>> {
        let (Some(resolution), Some(source)) = (&record.resolution, record.source_action) else {
            return Ok(None);
        };
        if !resolution.requires_resubmit() {
            return Ok(None);
        }
        let payload = merge::resubmit_payload(source, &record.local_version, &resolution.value)?;
        let id = self.enqueue(payload, Some(record.entity_id.clone()), ActionPriority::High)?;
        tracing::info!(
            "Re-queued resolved value of conflict {} as action {}",
            record.id,
            id
        );
        Ok(Some(id))
    }

    pub fn get(&self, id: &str) -> Result<QueuedAction> {
        Ok(self.store.get_action(id)?)
    }

    pub fn list(&self, status: Option<ActionStatus>) -> Result<Vec<QueuedAction>> {
        Ok(self.store.list_actions(status)?)
    }

    pub fn stats(&self) -> Result<QueueStats> {
        Ok(self.store.action_counts()?)
    }

    /// Delete completed and cancelled actions older than `retention`.
    pub fn purge(&self, retention: Duration) -> Result<usize> {
        let before = self.clock.now()
            - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());
        let purged = self.store.purge_actions(before)?;
        if purged > 0 {
            tracing::info!("Purged {} settled actions", purged);
        }
        Ok(purged)
    }

    /// Return actions stranded in `processing` by a crash to `pending`.
    pub fn recover(&self) -> Result<usize> {
        let recovered = self.store.recover_processing_actions(self.clock.now())?;
        if recovered > 0 {
            tracing::info!("Recovered {} interrupted actions", recovered);
        }
        Ok(recovered)
    }

    pub fn retention(&self) -> Duration {
        self.config.retention()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(std::sync::atomic::Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
