// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tether-core operations.

use thiserror::Error;

/// All possible errors that can occur in tether-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("sync item not found: {0}")]
    SyncItemNotFound(String),

    #[error("conflict not found: {0}")]
    ConflictNotFound(String),

    #[error("invalid action status transition: cannot go from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("conflict {id} is {status} and cannot be resolved")]
    InvalidConflictState { id: String, status: String },

    #[error(
        "would create a dependency cycle\n  hint: sync item {0} already depends on this chain"
    )]
    CycleDetected(String),

    #[error("sync item cannot depend on itself: {0}")]
    SelfDependency(String),

    #[error("offline queue is full ({capacity} live actions) and nothing can be evicted")]
    QueueFull { capacity: usize },

    #[error("invalid action kind: '{0}'")]
    InvalidActionKind(String),

    #[error("invalid priority: '{0}'\n  hint: valid priorities are: high, medium, low")]
    InvalidPriority(String),

    #[error("invalid status: '{0}'\n  hint: valid statuses are: pending, processing, completed, failed, cancelled")]
    InvalidStatus(String),

    #[error("invalid sync domain: '{0}'")]
    InvalidDomain(String),

    #[error("invalid sync priority: '{0}'\n  hint: valid priorities are: critical, high, medium, low, deferred")]
    InvalidSyncPriority(String),

    #[error("invalid conflict kind: '{0}'")]
    InvalidConflictKind(String),

    #[error("invalid resolution strategy: '{0}'\n  hint: valid strategies are: last-writer-wins, server-wins, client-wins, merge, user-choice")]
    InvalidStrategy(String),

    #[error("invalid connection value: '{0}'")]
    InvalidConnectionValue(String),

    #[error("resolved value does not fit {kind}: {reason}")]
    InvalidPayload { kind: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("store lock poisoned by a panicked writer")]
    LockPoisoned,
}

/// A specialized Result type for tether-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
