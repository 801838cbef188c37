// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator traits for delivery, refresh and probing.
//!
//! The engine never talks to the network itself. The embedding application
//! supplies:
//! - an [`ActionExecutor`] that pushes one queued mutation to the server
//! - a [`SyncExecutor`] that refreshes one sync item
//! - a [`Prober`] that measures round-trip latency
//!
//! Reachability changes arrive as [`Reachability`] values over a channel.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use tether_core::{ConnectionType, QueuedAction, SyncItem};

/// Boxed future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The server's authoritative record, returned when a mutation collides.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConflict {
    pub server_version: Value,
    pub server_timestamp: DateTime<Utc>,
}

/// Failure taxonomy for delivery and refresh calls.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// Connection reset, timeout, DNS failure.
    TransientNetwork,
    /// 5xx.
    Server,
    /// 4xx. Never retried.
    Client,
    /// The server holds a diverging version of the entity.
    Conflict(ServerConflict),
}

/// A failed delivery or refresh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct DeliveryError {
    pub kind: FailureKind,
    pub message: String,
}

impl DeliveryError {
    pub fn network(message: impl Into<String>) -> Self {
        DeliveryError {
            kind: FailureKind::TransientNetwork,
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        DeliveryError {
            kind: FailureKind::Server,
            message: message.into(),
        }
    }

    pub fn client(message: impl Into<String>) -> Self {
        DeliveryError {
            kind: FailureKind::Client,
            message: message.into(),
        }
    }

    pub fn conflict(server_version: Value, server_timestamp: DateTime<Utc>) -> Self {
        DeliveryError {
            kind: FailureKind::Conflict(ServerConflict {
                server_version,
                server_timestamp,
            }),
            message: "conflict".to_string(),
        }
    }

    /// Transient network and server failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::TransientNetwork | FailureKind::Server)
    }
}

/// Delivers queued mutations.
///
/// Implementations dispatch on the typed payload (`action.payload`), one
/// call per action kind.
pub trait ActionExecutor: Send + Sync {
    fn execute<'a>(&'a self, action: &'a QueuedAction) -> BoxFuture<'a, Result<(), DeliveryError>>;
}

/// Runs read/refresh work for one sync item.
pub trait SyncExecutor: Send + Sync {
    fn sync<'a>(&'a self, item: &'a SyncItem) -> BoxFuture<'a, Result<(), DeliveryError>>;
}

/// Why a latency probe failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("probe failed: {0}")]
pub struct ProbeError(pub String);

/// Measures round-trip latency to a lightweight endpoint.
pub trait Prober: Send + Sync {
    fn probe<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Duration, ProbeError>>;
}

/// A transport-level reachability change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reachability {
    pub online: bool,
    pub connection_type: ConnectionType,
}

impl Reachability {
    pub fn online(connection_type: ConnectionType) -> Self {
        Reachability {
            online: true,
            connection_type,
        }
    }

    pub fn offline() -> Self {
        Reachability {
            online: false,
            connection_type: ConnectionType::None,
        }
    }
}

/// A transport with no network behind it.
///
/// Every delivery fails as a transient network error and every probe fails,
/// so nothing is lost. Used to inspect and maintain a store offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

impl ActionExecutor for Disconnected {
    fn execute<'a>(&'a self, _action: &'a QueuedAction) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async { Err(DeliveryError::network("no transport attached")) })
    }
}

impl SyncExecutor for Disconnected {
    fn sync<'a>(&'a self, _item: &'a SyncItem) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async { Err(DeliveryError::network("no transport attached")) })
    }
}

impl Prober for Disconnected {
    fn probe<'a>(
        &'a self,
        _url: &'a str,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<Duration, ProbeError>> {
        Box::pin(async { Err(ProbeError("no transport attached".into())) })
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
