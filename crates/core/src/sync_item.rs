// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read/refresh tasks owned by the sync scheduler.
//!
//! Unlike queued actions these never mutate server state; they pull fresh
//! data for a domain (optionally scoped to a target) and are safe to drop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Data domains that can be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDomain {
    Messages,
    Chats,
    Profile,
    Settings,
    Media,
    Likes,
    Matches,
    Stories,
    Location,
    Notifications,
}

impl SyncDomain {
    /// Every domain, in declaration order.
    pub const ALL: [SyncDomain; 10] = [
        SyncDomain::Messages,
        SyncDomain::Chats,
        SyncDomain::Profile,
        SyncDomain::Settings,
        SyncDomain::Media,
        SyncDomain::Likes,
        SyncDomain::Matches,
        SyncDomain::Stories,
        SyncDomain::Location,
        SyncDomain::Notifications,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDomain::Messages => "messages",
            SyncDomain::Chats => "chats",
            SyncDomain::Profile => "profile",
            SyncDomain::Settings => "settings",
            SyncDomain::Media => "media",
            SyncDomain::Likes => "likes",
            SyncDomain::Matches => "matches",
            SyncDomain::Stories => "stories",
            SyncDomain::Location => "location",
            SyncDomain::Notifications => "notifications",
        }
    }

    /// Returns true if refreshing this domain downloads media blobs.
    pub fn is_media(&self) -> bool {
        matches!(self, SyncDomain::Media | SyncDomain::Stories)
    }
}

impl fmt::Display for SyncDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncDomain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_lowercase();
        SyncDomain::ALL
            .into_iter()
            .find(|domain| domain.as_str() == normalized)
            .ok_or_else(|| Error::InvalidDomain(s.to_string()))
    }
}

/// Urgency of a sync item. Lower numeric value is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPriority {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
    Deferred = 4,
}

impl SyncPriority {
    /// Every priority, most urgent first.
    pub const ALL: [SyncPriority; 5] = [
        SyncPriority::Critical,
        SyncPriority::High,
        SyncPriority::Medium,
        SyncPriority::Low,
        SyncPriority::Deferred,
    ];

    /// Numeric value stored in the database.
    pub fn value(&self) -> i64 {
        *self as i64
    }

    /// Inverse of [`SyncPriority::value`].
    pub fn from_value(value: i64) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| SyncPriority::ALL.get(i).copied())
    }

    /// Raises urgency by `steps`, saturating at critical.
    pub fn boosted(&self, steps: u32) -> Self {
        let steps = i64::from(steps);
        SyncPriority::from_value((self.value() - steps).max(0)).unwrap_or(SyncPriority::Critical)
    }

    /// Returns the string representation used in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPriority::Critical => "critical",
            SyncPriority::High => "high",
            SyncPriority::Medium => "medium",
            SyncPriority::Low => "low",
            SyncPriority::Deferred => "deferred",
        }
    }
}

impl fmt::Display for SyncPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncPriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_lowercase();
        SyncPriority::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| Error::InvalidSyncPriority(s.to_string()))
    }
}

/// A scheduled refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
    pub id: String,
    pub domain: SyncDomain,
    pub priority: SyncPriority,
    pub target_id: Option<String>,
    pub metadata: Map<String, Value>,
    /// Expected transfer size in bytes.
    pub estimated_size: u64,
    /// Expected duration in milliseconds.
    pub estimated_time: u64,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: DateTime<Utc>,
    /// Ids of items that must leave the queue before this one may run.
    pub dependencies: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl SyncItem {
    /// Creates a new item, due immediately.
    pub fn new(
        id: String,
        domain: SyncDomain,
        priority: SyncPriority,
        target_id: Option<String>,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        SyncItem {
            id,
            domain,
            priority,
            target_id,
            metadata: Map::new(),
            estimated_size: 0,
            estimated_time: 0,
            retry_count: 0,
            max_retries,
            next_retry_at: now,
            dependencies: BTreeSet::new(),
            created_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    /// Returns true if the item's backoff has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_retry_at <= now
    }
}

#[cfg(test)]
#[path = "sync_item_tests.rs"]
mod tests;
