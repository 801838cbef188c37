// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict detection and resolution.
//!
//! The resolver owns conflict records. Detection compares a kind's schema
//! fields and stores a pending record when they diverge; resolution applies
//! a strategy once and stores the outcome. The pure rules live in
//! [`tether_core::merge`].

use std::sync::Arc;
use std::time::Duration;

use tether_core::id::{generate_unique_id, nonce, CONFLICT_PREFIX};
use tether_core::merge;
use tether_core::{
    ActionKind, Clock, ConflictKind, ConflictRecord, ConflictStatus, EntitySnapshot, Resolution,
    ResolutionStrategy, ResolvedBy, Store, UserChoice,
};

use crate::config::ConflictsConfig;
use crate::error::Result;
use crate::events::{EngineEvent, EventBus};
use crate::queue::DeliveryConflict;

/// Outcome of [`ConflictResolver::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionResult {
    /// Resolved by this call.
    Resolved(ConflictRecord),
    /// Resolved earlier; nothing changed.
    AlreadyResolved(Resolution),
    /// The strategy is user-choice and no choice was supplied.
    NeedsInput(ConflictRecord),
}

pub struct ConflictResolver {
    store: Store,
    clock: Arc<dyn Clock>,
    config: ConflictsConfig,
    events: Arc<EventBus<EngineEvent>>,
}

impl ConflictResolver {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        config: ConflictsConfig,
        events: Arc<EventBus<EngineEvent>>,
    ) -> Self {
        ConflictResolver {
            store,
            clock,
            config,
            events,
        }
    }

    /// Compare two snapshots of an entity and record a conflict if they
    /// diverge on any of the kind's fields.
    pub fn detect(
        &self,
        kind: ConflictKind,
        entity_id: &str,
        local: EntitySnapshot,
        server: EntitySnapshot,
        source_action: Option<ActionKind>,
    ) -> Result<Option<ConflictRecord>> {
        let fields = merge::diverging_fields(kind, &local.value, &server.value);
        if fields.is_empty() {
            tracing::debug!(kind = %kind, entity_id, "snapshots agree, no conflict");
            return Ok(None);
        }

        let now = self.clock.now();
        let seed = format!("{}{}{}", kind, entity_id, nonce());
        let id = generate_unique_id(CONFLICT_PREFIX, &seed, &now, |id| {
            self.store.conflict_exists(id)
        })?;

        let record = ConflictRecord {
            id,
            kind,
            entity_id: entity_id.to_string(),
            entity_type: kind.entity_type().to_string(),
            local_version: local.value,
            server_version: server.value,
            local_timestamp: local.timestamp,
            server_timestamp: server.timestamp,
            description: merge::describe(kind, entity_id, &fields),
            conflicted_fields: fields,
            status: ConflictStatus::Pending,
            resolution: None,
            source_action,
            created_at: now,
        };
        self.store.insert_conflict(&record)?;

        tracing::info!("Conflict {}: {}", record.id, record.description);
        self.events.publish(EngineEvent::ConflictDetected {
            id: record.id.clone(),
            kind,
            entity_id: record.entity_id.clone(),
        });
        Ok(Some(record))
    }

    /// Record the conflict a rejected delivery surfaced.
    ///
    /// Actions that cannot conflict (messages sent, reports) yield `None`,
    /// as do snapshots that agree on every schema field.
    pub fn detect_delivery(&self, conflict: &DeliveryConflict) -> Result<Option<ConflictRecord>> {
        let Some(kind) = ConflictKind::for_action(conflict.kind) else {
            tracing::debug!(
                action = %conflict.action_id,
                kind = %conflict.kind,
                "server rejected an action kind with no conflict schema"
            );
            return Ok(None);
        };
        self.detect(
            kind,
            &conflict.entity_id,
            conflict.local.clone(),
            conflict.server.clone(),
            Some(conflict.kind),
        )
    }

    /// Settle a conflict.
    ///
    /// `strategy` defaults to the kind's configured strategy. A `choice`
    /// takes precedence over any strategy and marks the resolution as the
    /// user's.
    pub fn resolve(
        &self,
        id: &str,
        strategy: Option<ResolutionStrategy>,
        choice: Option<UserChoice>,
    ) -> Result<ResolutionResult> {
        self.resolve_as(id, strategy, choice, ResolvedBy::System)
    }

    fn resolve_as(
        &self,
        id: &str,
        strategy: Option<ResolutionStrategy>,
        choice: Option<UserChoice>,
        actor: ResolvedBy,
    ) -> Result<ResolutionResult> {
        let mut record = self.store.get_conflict(id)?;
        match record.status {
            ConflictStatus::Pending => {}
            ConflictStatus::Resolved => return already_resolved(record),
            ConflictStatus::Cancelled | ConflictStatus::Failed => {
                return Err(tether_core::Error::InvalidConflictState {
                    id: record.id,
                    status: record.status.to_string(),
                }
                .into());
            }
        }

        let strategy = strategy.unwrap_or_else(|| self.config.strategy_for(record.kind));
        let Some(decision) = merge::decide(
            &record,
            strategy,
            choice.as_ref(),
            self.config.merge_preference,
        ) else {
            tracing::debug!(id = %record.id, "conflict awaits a user choice");
            return Ok(ResolutionResult::NeedsInput(record));
        };

        let resolution = Resolution {
            strategy,
            value: decision.value,
            winner: decision.winner,
            resolved_by: if choice.is_some() {
                ResolvedBy::User
            } else {
                actor
            },
            reason: decision.reason,
            resolved_at: self.clock.now(),
        };

        if !self.store.save_resolution(id, &resolution)? {
            // Settled by someone else between the read and the write.
            return already_resolved(self.store.get_conflict(id)?);
        }

        tracing::info!(
            "Resolved conflict {} with {} ({:?} wins): {}",
            record.id,
            strategy,
            resolution.winner,
            resolution.reason
        );
        self.events.publish(EngineEvent::ConflictResolved {
            id: record.id.clone(),
            winner: resolution.winner,
        });

        record.status = ConflictStatus::Resolved;
        record.resolution = Some(resolution);
        Ok(ResolutionResult::Resolved(record))
    }

    /// Best-effort last-writer-wins over pending conflicts, oldest first.
    ///
    /// Kinds configured for user choice are left alone. Returns the records
    /// resolved by this call.
    pub fn auto_resolve_pending(&self, limit: usize) -> Result<Vec<ConflictRecord>> {
        let mut resolved = Vec::new();
        for record in self.pending()?.into_iter().take(limit) {
            if self.config.strategy_for(record.kind) == ResolutionStrategy::UserChoice {
                tracing::debug!(id = %record.id, "skipping user-choice conflict");
                continue;
            }
            match self.resolve_as(
                &record.id,
                Some(ResolutionStrategy::LastWriterWins),
                None,
                ResolvedBy::Background,
            ) {
                Ok(ResolutionResult::Resolved(record)) => resolved.push(record),
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to auto-resolve conflict {}: {}", record.id, e),
            }
        }
        Ok(resolved)
    }

    /// Drop a pending conflict. Returns false if it was not pending.
    pub fn cancel(&self, id: &str) -> Result<bool> {
        self.store.get_conflict(id)?;
        Ok(self
            .store
            .set_conflict_status(id, ConflictStatus::Cancelled)?)
    }

    pub fn get(&self, id: &str) -> Result<ConflictRecord> {
        Ok(self.store.get_conflict(id)?)
    }

    /// Pending conflicts, oldest first.
    pub fn pending(&self) -> Result<Vec<ConflictRecord>> {
        self.list(Some(ConflictStatus::Pending))
    }

    pub fn list(&self, status: Option<ConflictStatus>) -> Result<Vec<ConflictRecord>> {
        Ok(self.store.list_conflicts(status)?)
    }

    /// Delete resolved and cancelled conflicts older than `retention`.
    pub fn purge(&self, retention: Duration) -> Result<usize> {
        let before = self.clock.now()
            - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());
        Ok(self.store.purge_conflicts(before)?)
    }

    pub fn retention(&self) -> Duration {
        self.config.retention()
    }
}

fn already_resolved(record: ConflictRecord) -> Result<ResolutionResult> {
    match record.resolution {
        Some(resolution) if record.status == ConflictStatus::Resolved => {
            Ok(ResolutionResult::AlreadyResolved(resolution))
        }
        _ => Err(tether_core::Error::InvalidConflictState {
            id: record.id,
            status: record.status.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
