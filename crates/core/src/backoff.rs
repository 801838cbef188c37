// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry delays for actions and sync items.
//!
//! `delay = min(cap, base * multiplier^attempt + jitter)`, where `attempt`
//! is the retry count after the failure was recorded and jitter is uniform
//! in `[0, max_jitter]`. The first retry therefore waits `base * multiplier`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::action::ActionKind;
use crate::sync_item::SyncDomain;

/// Exponential backoff with jitter and a cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay unit scaled by the multiplier (milliseconds).
    pub base_ms: u64,
    /// Upper bound on any delay (milliseconds).
    pub cap_ms: u64,
    /// Largest random jitter added to a delay (milliseconds).
    pub max_jitter_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base_ms: 1_000,
            cap_ms: 300_000,
            max_jitter_ms: 1_000,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based), with explicit jitter.
    pub fn delay_with(&self, attempt: u32, multiplier: f64, jitter_ms: u64) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let growth = multiplier.max(0.0).powi(exponent);
        let scaled = self.base_ms as f64 * growth;
        let jitter = jitter_ms.min(self.max_jitter_ms) as f64;
        let ms = (scaled + jitter).min(self.cap_ms as f64);
        Duration::from_millis(ms as u64)
    }

    /// Delay before retry number `attempt`, with random jitter.
    pub fn delay(&self, attempt: u32, multiplier: f64) -> Duration {
        let jitter = if self.max_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.max_jitter_ms)
        };
        self.delay_with(attempt, multiplier, jitter)
    }
}

/// Growth factor for retries of an action kind. Zero means never retried.
pub fn default_action_multiplier(kind: ActionKind) -> f64 {
    match kind {
        ActionKind::StartTyping | ActionKind::StopTyping => 0.0,
        ActionKind::MarkRead | ActionKind::UpdateLocation => 1.5,
        ActionKind::Like | ActionKind::Dislike | ActionKind::SuperLike | ActionKind::UndoLike => {
            1.5
        }
        ActionKind::UploadMedia | ActionKind::CreateStory => 3.0,
        ActionKind::SendMessage
        | ActionKind::EditMessage
        | ActionKind::DeleteMessage
        | ActionKind::UpdateProfile
        | ActionKind::UpdateSettings
        | ActionKind::BlockUser
        | ActionKind::UnblockUser
        | ActionKind::ReportUser
        | ActionKind::DeleteMedia
        | ActionKind::DeleteStory => 2.0,
    }
}

/// Growth factor for retries of a sync domain.
pub fn default_domain_multiplier(domain: SyncDomain) -> f64 {
    match domain {
        SyncDomain::Messages | SyncDomain::Chats | SyncDomain::Notifications => 1.5,
        SyncDomain::Media | SyncDomain::Stories => 3.0,
        SyncDomain::Profile
        | SyncDomain::Settings
        | SyncDomain::Likes
        | SyncDomain::Matches
        | SyncDomain::Location => 2.0,
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
