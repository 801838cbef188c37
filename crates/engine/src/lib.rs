// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-engine: offline-first synchronization runtime
//!
//! Components share one [`tether_core::Store`], one clock and one event bus:
//!
//! ```text
//!                    ┌──────────────────┐
//!  reachability ───► │ ConnectionMonitor│ ── quality ──┐
//!                    └────────┬─────────┘              ▼
//!                       restored              ┌──────────────┐
//!                             ▼               │ SyncScheduler│ ◄── schedule_sync
//!  enqueue_action ──► ┌─────────────┐         └──────▲───────┘
//!                     │ ActionQueue │ ─ conflicts ─┐ │
//!                     └──────▲──────┘              ▼ │
//!                            │            ┌──────────────────┐
//!                            └─ requeue ─ │ ConflictResolver │
//!                                         └──────────────────┘
//!                 BackgroundOrchestrator drives all three on app lifecycle
//! ```
//!
//! [`SyncEngine`] is the facade the application talks to.

pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub(crate) mod guard;
pub mod monitor;
pub mod queue;
pub mod resolver;
pub mod scheduler;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use background::{AppState, BackgroundOrchestrator, RunSummary};
pub use config::Config;
pub use engine::{Collaborators, EngineStatus, PurgeReport, SyncEngine};
pub use error::{Error, Result};
pub use events::{ConnectionNotice, EngineEvent, EventBus, Subscription};
pub use monitor::ConnectionMonitor;
pub use queue::{ActionQueue, DeliveryConflict, DrainReport};
pub use resolver::{ConflictResolver, ResolutionResult};
pub use scheduler::{PassFilter, PassReport, SchedulerStats, SyncRequest, SyncScheduler, SyncStrategy};
pub use transport::{
    ActionExecutor, BoxFuture, DeliveryError, Disconnected, FailureKind, ProbeError, Prober,
    Reachability, ServerConflict, SyncExecutor,
};
