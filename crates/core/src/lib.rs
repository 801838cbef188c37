// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-core: data model and storage for the tether sync engine
//!
//! This crate provides the record types (queued actions, sync items,
//! conflicts, connection state, run stats), the pure retry and merge rules,
//! and the SQLite store shared by the engine and the `tether` CLI.

pub mod action;
pub mod backoff;
pub mod clock;
pub mod conflict;
pub mod connection;
pub mod db;
pub mod error;
pub mod id;
pub mod merge;
pub mod stats;
pub mod sync_item;

pub use action::{
    ActionKind, ActionPayload, ActionPriority, ActionStatus, QueueStats, QueuedAction,
};
pub use backoff::BackoffPolicy;
pub use clock::{Clock, ManualClock, SystemClock};
pub use conflict::{
    ConflictKind, ConflictRecord, ConflictStatus, EntitySnapshot, MergePreference, Resolution,
    ResolutionStrategy, ResolvedBy, ResolvedSide, UserChoice,
};
pub use connection::{
    ConnectionEvent, ConnectionEventKind, ConnectionQuality, ConnectionState, ConnectionType,
};
pub use db::Store;
pub use error::{Error, Result};
pub use stats::{BackgroundRunStats, RunOutcome};
pub use sync_item::{SyncDomain, SyncItem, SyncPriority};
