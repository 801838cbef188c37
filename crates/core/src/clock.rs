// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wall clock abstraction.
//!
//! Every timestamp the engine persists (`created_at`, `next_retry_at`,
//! conflict timestamps, connection transitions) is read from a [`Clock`] so
//! tests can drive time explicitly. Timers and pass budgets use the tokio
//! runtime's monotonic clock instead.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// Trait for getting the current wall clock time.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> i64;

    /// Returns the current time as a UTC timestamp.
    fn now(&self) -> DateTime<Utc> {
        from_millis(self.now_ms())
    }
}

/// Converts milliseconds since Unix epoch into a UTC timestamp.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// System clock implementation backed by `chrono::Utc::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// A clock that only moves when told to.
///
/// Cloning shares the underlying time, so a test can hand one copy to the
/// engine and advance another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    time_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock frozen at the given milliseconds since epoch.
    pub fn new(initial_ms: i64) -> Self {
        ManualClock {
            time_ms: Arc::new(AtomicI64::new(initial_ms)),
        }
    }

    /// Sets the current time.
    pub fn set(&self, ms: i64) {
        self.time_ms.store(ms, Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.time_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2026-01-01T00:00:00Z
        Self::new(1_767_225_600_000)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
