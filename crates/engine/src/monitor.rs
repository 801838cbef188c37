// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state tracking.
//!
//! Two signals drive the state machine:
//! - reachability changes from the platform (online/offline plus transport)
//! - a periodic latency probe while online
//!
//! Only reachability can take the connection offline. A failed probe
//! downgrades quality to poor.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use tether_core::connection::Transition;
use tether_core::{Clock, ConnectionEvent, ConnectionQuality, ConnectionState, Store};

use crate::config::ConnectionConfig;
use crate::events::{ConnectionNotice, EventBus, Subscription};
use crate::transport::{ProbeError, Prober, Reachability};

pub struct ConnectionMonitor {
    store: Store,
    clock: Arc<dyn Clock>,
    prober: Arc<dyn Prober>,
    config: ConnectionConfig,
    state: Mutex<ConnectionState>,
    notices: EventBus<ConnectionNotice>,
    quality: watch::Sender<ConnectionQuality>,
}

impl ConnectionMonitor {
    /// Restore the last persisted snapshot, or start offline.
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        prober: Arc<dyn Prober>,
        config: ConnectionConfig,
    ) -> Self {
        let state = store
            .load_connection_state(config.history_limit)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to load connection state, starting offline: {}", e);
                ConnectionState::default()
            });
        let (quality, _) = watch::channel(state.quality);
        ConnectionMonitor {
            store,
            clock,
            prober,
            config,
            state: Mutex::new(state),
            notices: EventBus::default(),
            quality,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().clone()
    }

    pub fn quality(&self) -> ConnectionQuality {
        self.lock().quality
    }

    pub fn is_online(&self) -> bool {
        self.lock().is_online
    }

    /// Newest first.
    pub fn history(&self) -> Vec<ConnectionEvent> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn subscribe(&self) -> Subscription<ConnectionNotice> {
        self.notices.subscribe()
    }

    /// Follows the current quality without subscribing to every notice.
    pub fn quality_watch(&self) -> watch::Receiver<ConnectionQuality> {
        self.quality.subscribe()
    }

    /// Apply a platform reachability change.
    ///
    /// Coming online assumes the transport's baseline quality until the
    /// next probe. Returns true if the state changed.
    pub fn on_reachability(&self, reachability: Reachability) -> bool {
        let now = self.clock.now();
        let mut state = self.lock();
        let quality = if !reachability.online {
            ConnectionQuality::Offline
        } else if state.is_online && state.connection_type == reachability.connection_type {
            // Same link; keep what the probe measured.
            state.quality
        } else {
            ConnectionQuality::baseline(reachability.connection_type)
        };
        let transition = state.apply(
            reachability.online,
            reachability.connection_type,
            quality,
            None,
            now,
            self.config.history_limit,
        );
        let committed = transition.map(|t| (t, state.clone()));
        drop(state);

        match committed {
            Some((transition, snapshot)) => {
                self.commit(transition, &snapshot);
                true
            }
            None => false,
        }
    }

    /// Apply a probe outcome. Ignored while offline.
    pub fn record_probe(&self, result: Result<Duration, ProbeError>) -> bool {
        let now = self.clock.now();
        let mut state = self.lock();
        if !state.is_online {
            return false;
        }
        let (quality, latency_ms) = match result {
            Ok(latency) => (
                ConnectionQuality::from_latency(latency),
                Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX)),
            ),
            Err(e) => {
                tracing::debug!("{}", e);
                (ConnectionQuality::Poor, None)
            }
        };
        let connection_type = state.connection_type;
        let transition = state.apply(
            true,
            connection_type,
            quality,
            latency_ms,
            now,
            self.config.history_limit,
        );
        let committed = transition.map(|t| (t, state.clone()));
        drop(state);

        match committed {
            Some((transition, snapshot)) => {
                self.commit(transition, &snapshot);
                true
            }
            None => false,
        }
    }

    /// Probe now (if online) and return the resulting state.
    pub async fn force_refresh(&self) -> ConnectionState {
        if self.is_online() {
            self.probe_once().await;
        }
        self.state()
    }

    async fn probe_once(&self) {
        let timeout = self.config.probe_timeout();
        let result = match tokio::time::timeout(
            timeout,
            self.prober.probe(&self.config.probe_url, timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProbeError(format!("no response within {:?}", timeout))),
        };
        self.record_probe(result);
    }

    /// Persist, publish and log one transition.
    fn commit(&self, transition: Transition, snapshot: &ConnectionState) {
        if let Err(e) = self
            .store
            .save_connection_state(snapshot, transition.event.at)
        {
            tracing::warn!("Failed to persist connection state: {}", e);
        }
        if let Err(e) = self
            .store
            .append_connection_event(&transition.event, self.config.history_limit)
        {
            tracing::warn!("Failed to persist connection event: {}", e);
        }
        self.quality.send_replace(snapshot.quality);

        self.notices.publish(ConnectionNotice::StateChanged {
            is_online: snapshot.is_online,
            connection_type: snapshot.connection_type,
            quality: snapshot.quality,
        });
        if transition.lost {
            tracing::info!("Connection lost");
            self.notices.publish(ConnectionNotice::ConnectionLost);
        } else if let Some(offline_for) = transition.restored_after {
            tracing::info!(
                "Connection restored over {} ({}) after {:?}",
                snapshot.connection_type,
                snapshot.quality,
                offline_for
            );
            self.notices
                .publish(ConnectionNotice::ConnectionRestored { offline_for });
        } else if transition.quality_changed {
            tracing::info!(
                "Connection quality {} -> {}",
                transition.previous_quality,
                snapshot.quality
            );
            self.notices.publish(ConnectionNotice::QualityChanged {
                from: transition.previous_quality,
                to: snapshot.quality,
            });
        }
    }

    /// Follow reachability changes and probe periodically until cancelled.
    pub async fn run(
        &self,
        mut reachability: mpsc::Receiver<Reachability>,
        cancel: CancellationToken,
    ) {
        let period = self.config.probe_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reachability_open = true;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                signal = reachability.recv(), if reachability_open => match signal {
                    Some(signal) => {
                        self.on_reachability(signal);
                    }
                    None => {
                        tracing::debug!("reachability source closed");
                        reachability_open = false;
                    }
                },
                _ = ticker.tick() => {
                    if self.is_online() {
                        self.probe_once().await;
                    }
                }
            }
        }
        tracing::debug!("connection monitor stopped");
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
