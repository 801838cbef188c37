// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed publish/subscribe.
//!
//! A [`Subscription`] is the unsubscribe handle: dropping it (or calling
//! [`Subscription::unsubscribe`]) detaches the listener.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

use tether_core::{ActionKind, ConflictKind, ConnectionQuality, ConnectionType, ResolvedSide};

use crate::scheduler::PassReport;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcast bus for one event type.
#[derive(Debug)]
pub struct EventBus<T: Clone> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T: Clone> EventBus<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// Deliver to every current subscriber. No subscribers is not an error.
    pub fn publish(&self, event: T) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live listener registration.
#[derive(Debug)]
pub struct Subscription<T: Clone> {
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Next event, or `None` once the bus is gone.
    ///
    /// A listener that falls behind skips the events it missed.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "event subscriber lagged, skipping missed events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Detach from the bus.
    pub fn unsubscribe(self) {}
}

/// Events raised by the engine for the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Offline,
    Online {
        offline_for: Duration,
    },
    SyncStarted {
        quality: ConnectionQuality,
    },
    SyncCompleted(PassReport),
    SyncFailed {
        error: String,
    },
    ConflictDetected {
        id: String,
        kind: ConflictKind,
        entity_id: String,
    },
    ConflictResolved {
        id: String,
        winner: ResolvedSide,
    },
    ActionQueued {
        id: String,
        kind: ActionKind,
    },
    ActionCompleted {
        id: String,
        kind: ActionKind,
    },
    ActionFailed {
        id: String,
        kind: ActionKind,
        error: String,
        /// False while the action will still be retried.
        terminal: bool,
    },
}

/// Connection transitions published by the monitor.
///
/// `StateChanged` is always published first; the narrower notice follows.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionNotice {
    StateChanged {
        is_online: bool,
        connection_type: ConnectionType,
        quality: ConnectionQuality,
    },
    ConnectionLost,
    ConnectionRestored {
        offline_for: Duration,
    },
    QualityChanged {
        from: ConnectionQuality,
        to: ConnectionQuality,
    },
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
