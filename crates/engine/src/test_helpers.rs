// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted collaborators shared by engine tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tether_core::{ActionPayload, ManualClock, QueuedAction, Store, SyncDomain, SyncItem};

use crate::transport::{ActionExecutor, BoxFuture, DeliveryError, ProbeError, Prober, SyncExecutor};

/// Action executor that replays scripted outcomes, then succeeds.
#[derive(Clone, Default)]
pub struct MockActionExecutor {
    script: Arc<Mutex<VecDeque<Result<(), DeliveryError>>>>,
    /// Outcome for every call once the script runs out.
    fallback: Arc<Mutex<Option<DeliveryError>>>,
    calls: Arc<Mutex<Vec<QueuedAction>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: Result<(), DeliveryError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn fail_always(&self, err: DeliveryError) {
        *self.fallback.lock().unwrap() = Some(err);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<QueuedAction> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|a| a.id).collect()
    }
}

impl ActionExecutor for MockActionExecutor {
    fn execute<'a>(&'a self, action: &'a QueuedAction) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(action.clone());
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let scripted = self.script.lock().unwrap().pop_front();
            match scripted {
                Some(outcome) => outcome,
                None => match self.fallback.lock().unwrap().clone() {
                    Some(err) => Err(err),
                    None => Ok(()),
                },
            }
        })
    }
}

/// Sync executor with per-item outcomes and concurrency tracking.
#[derive(Clone, Default)]
pub struct MockSyncExecutor {
    outcomes: Arc<Mutex<HashMap<String, VecDeque<Result<(), DeliveryError>>>>>,
    calls: Arc<Mutex<Vec<SyncItem>>>,
    delays: Arc<Mutex<HashMap<SyncDomain, Duration>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockSyncExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item_id: &str, outcome: Result<(), DeliveryError>) {
        self.outcomes
            .lock()
            .unwrap()
            .entry(item_id.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn set_delay(&self, domain: SyncDomain, delay: Duration) {
        self.delays.lock().unwrap().insert(domain, delay);
    }

    pub fn calls(&self) -> Vec<SyncItem> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|i| i.id).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl SyncExecutor for MockSyncExecutor {
    fn sync<'a>(&'a self, item: &'a SyncItem) -> BoxFuture<'a, Result<(), DeliveryError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(item.clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = self.delays.lock().unwrap().get(&item.domain).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            } else {
                tokio::task::yield_now().await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .get_mut(&item.id)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Ok(()))
        })
    }
}

/// Prober that replays scripted round trips, then reports 100ms.
#[derive(Clone, Default)]
pub struct MockProber {
    script: Arc<Mutex<VecDeque<Result<Duration, ProbeError>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: Result<Duration, ProbeError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Prober for MockProber {
    fn probe<'a>(
        &'a self,
        _url: &'a str,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<Duration, ProbeError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Duration::from_millis(100)))
        })
    }
}

pub fn store() -> Store {
    Store::open_in_memory().unwrap()
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::default())
}

pub fn send_message(chat_id: &str, content: &str) -> ActionPayload {
    ActionPayload::SendMessage {
        chat_id: chat_id.to_string(),
        client_message_id: format!("local-{content}"),
        content: content.to_string(),
        media_ref: None,
        reply_to: None,
    }
}

pub fn update_bio(user_id: &str, bio: &str) -> ActionPayload {
    ActionPayload::UpdateProfile {
        user_id: user_id.to_string(),
        name: None,
        bio: Some(bio.to_string()),
        age: Some(30),
        city: None,
        occupation: None,
        interests: None,
    }
}

pub fn server_profile(bio: &str) -> serde_json::Value {
    json!({"user_id": "u1", "bio": bio, "age": 30})
}
