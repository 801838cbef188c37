// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued mutations: the user-initiated writes waiting for delivery.
//!
//! Each [`ActionKind`] has exactly one payload shape in [`ActionPayload`];
//! the kind of a queued action is always derived from its payload so the
//! two can never disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The closed set of mutations the client can queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendMessage,
    EditMessage,
    DeleteMessage,
    MarkRead,
    Like,
    Dislike,
    SuperLike,
    UndoLike,
    UpdateProfile,
    UpdateSettings,
    BlockUser,
    UnblockUser,
    ReportUser,
    UpdateLocation,
    StartTyping,
    StopTyping,
    UploadMedia,
    DeleteMedia,
    CreateStory,
    DeleteStory,
}

impl ActionKind {
    /// Every kind, in declaration order.
    pub const ALL: [ActionKind; 20] = [
        ActionKind::SendMessage,
        ActionKind::EditMessage,
        ActionKind::DeleteMessage,
        ActionKind::MarkRead,
        ActionKind::Like,
        ActionKind::Dislike,
        ActionKind::SuperLike,
        ActionKind::UndoLike,
        ActionKind::UpdateProfile,
        ActionKind::UpdateSettings,
        ActionKind::BlockUser,
        ActionKind::UnblockUser,
        ActionKind::ReportUser,
        ActionKind::UpdateLocation,
        ActionKind::StartTyping,
        ActionKind::StopTyping,
        ActionKind::UploadMedia,
        ActionKind::DeleteMedia,
        ActionKind::CreateStory,
        ActionKind::DeleteStory,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SendMessage => "send_message",
            ActionKind::EditMessage => "edit_message",
            ActionKind::DeleteMessage => "delete_message",
            ActionKind::MarkRead => "mark_read",
            ActionKind::Like => "like",
            ActionKind::Dislike => "dislike",
            ActionKind::SuperLike => "super_like",
            ActionKind::UndoLike => "undo_like",
            ActionKind::UpdateProfile => "update_profile",
            ActionKind::UpdateSettings => "update_settings",
            ActionKind::BlockUser => "block_user",
            ActionKind::UnblockUser => "unblock_user",
            ActionKind::ReportUser => "report_user",
            ActionKind::UpdateLocation => "update_location",
            ActionKind::StartTyping => "start_typing",
            ActionKind::StopTyping => "stop_typing",
            ActionKind::UploadMedia => "upload_media",
            ActionKind::DeleteMedia => "delete_media",
            ActionKind::CreateStory => "create_story",
            ActionKind::DeleteStory => "delete_story",
        }
    }

    /// Typing indicators are ephemeral and never retried.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, ActionKind::StartTyping | ActionKind::StopTyping)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_lowercase().replace('-', "_");
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::InvalidActionKind(s.to_string()))
    }
}

/// Delivery priority of a queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    High,
    Medium,
    Low,
}

impl ActionPriority {
    /// Numeric rank; lower is delivered first.
    pub fn rank(&self) -> i64 {
        match self {
            ActionPriority::High => 0,
            ActionPriority::Medium => 1,
            ActionPriority::Low => 2,
        }
    }

    /// Inverse of [`ActionPriority::rank`].
    pub fn from_rank(rank: i64) -> Option<Self> {
        match rank {
            0 => Some(ActionPriority::High),
            1 => Some(ActionPriority::Medium),
            2 => Some(ActionPriority::Low),
            _ => None,
        }
    }

    /// Returns the string representation used in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPriority::High => "high",
            ActionPriority::Medium => "medium",
            ActionPriority::Low => "low",
        }
    }
}

impl fmt::Display for ActionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionPriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "high" => Ok(ActionPriority::High),
            "medium" => Ok(ActionPriority::Medium),
            "low" => Ok(ActionPriority::Low),
            _ => Err(Error::InvalidPriority(s.to_string())),
        }
    }
}

/// Lifecycle status of a queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Waiting for delivery (possibly backing off).
    Pending,
    /// Handed to the executor; at most one attempt in flight.
    Processing,
    /// Delivered. Eligible for purge after the retention window.
    Completed,
    /// Terminal failure; kept for inspection until retried manually.
    Failed,
    /// Withdrawn by the user, evicted, or superseded by a conflict.
    Cancelled,
}

impl ActionStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Processing => "processing",
            ActionStatus::Completed => "completed",
            ActionStatus::Failed => "failed",
            ActionStatus::Cancelled => "cancelled",
        }
    }

    /// Check if a transition from this status to target is valid.
    pub fn can_transition_to(&self, target: ActionStatus) -> bool {
        use ActionStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Pending)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Failed, Pending)
        )
    }

    /// Returns true if the action will never be attempted again on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Completed | ActionStatus::Failed | ActionStatus::Cancelled
        )
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ActionStatus::Pending),
            "processing" => Ok(ActionStatus::Processing),
            "completed" => Ok(ActionStatus::Completed),
            "failed" => Ok(ActionStatus::Failed),
            "cancelled" => Ok(ActionStatus::Cancelled),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Kind-specific payload of a queued action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    SendMessage {
        chat_id: String,
        /// Client-generated id used by the server to deduplicate retries.
        client_message_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_ref: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply_to: Option<String>,
    },
    EditMessage {
        message_id: String,
        content: String,
        edited_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_ref: Option<String>,
    },
    DeleteMessage {
        message_id: String,
        #[serde(default)]
        for_everyone: bool,
    },
    MarkRead {
        chat_id: String,
        up_to_message_id: String,
    },
    Like {
        user_id: String,
    },
    Dislike {
        user_id: String,
    },
    SuperLike {
        user_id: String,
    },
    UndoLike {
        user_id: String,
    },
    UpdateProfile {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bio: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        age: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        city: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        occupation: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interests: Option<Vec<String>>,
    },
    UpdateSettings {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notifications: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        privacy: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        discovery: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        theme: Option<String>,
    },
    BlockUser {
        user_id: String,
    },
    UnblockUser {
        user_id: String,
    },
    ReportUser {
        user_id: String,
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    UpdateLocation {
        user_id: String,
        latitude: f64,
        longitude: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        city: Option<String>,
    },
    StartTyping {
        chat_id: String,
    },
    StopTyping {
        chat_id: String,
    },
    UploadMedia {
        /// Local reference to the file awaiting upload.
        media_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<u32>,
    },
    DeleteMedia {
        media_id: String,
    },
    CreateStory {
        media_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_at: Option<DateTime<Utc>>,
    },
    DeleteStory {
        story_id: String,
    },
}

impl ActionPayload {
    /// The kind this payload belongs to.
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::SendMessage { .. } => ActionKind::SendMessage,
            ActionPayload::EditMessage { .. } => ActionKind::EditMessage,
            ActionPayload::DeleteMessage { .. } => ActionKind::DeleteMessage,
            ActionPayload::MarkRead { .. } => ActionKind::MarkRead,
            ActionPayload::Like { .. } => ActionKind::Like,
            ActionPayload::Dislike { .. } => ActionKind::Dislike,
            ActionPayload::SuperLike { .. } => ActionKind::SuperLike,
            ActionPayload::UndoLike { .. } => ActionKind::UndoLike,
            ActionPayload::UpdateProfile { .. } => ActionKind::UpdateProfile,
            ActionPayload::UpdateSettings { .. } => ActionKind::UpdateSettings,
            ActionPayload::BlockUser { .. } => ActionKind::BlockUser,
            ActionPayload::UnblockUser { .. } => ActionKind::UnblockUser,
            ActionPayload::ReportUser { .. } => ActionKind::ReportUser,
            ActionPayload::UpdateLocation { .. } => ActionKind::UpdateLocation,
            ActionPayload::StartTyping { .. } => ActionKind::StartTyping,
            ActionPayload::StopTyping { .. } => ActionKind::StopTyping,
            ActionPayload::UploadMedia { .. } => ActionKind::UploadMedia,
            ActionPayload::DeleteMedia { .. } => ActionKind::DeleteMedia,
            ActionPayload::CreateStory { .. } => ActionKind::CreateStory,
            ActionPayload::DeleteStory { .. } => ActionKind::DeleteStory,
        }
    }

    /// The entity this mutation touches, used as the default correlation id.
    pub fn entity_id(&self) -> &str {
        match self {
            ActionPayload::SendMessage { chat_id, .. }
            | ActionPayload::MarkRead { chat_id, .. }
            | ActionPayload::StartTyping { chat_id }
            | ActionPayload::StopTyping { chat_id } => chat_id,
            ActionPayload::EditMessage { message_id, .. }
            | ActionPayload::DeleteMessage { message_id, .. } => message_id,
            ActionPayload::Like { user_id }
            | ActionPayload::Dislike { user_id }
            | ActionPayload::SuperLike { user_id }
            | ActionPayload::UndoLike { user_id }
            | ActionPayload::UpdateProfile { user_id, .. }
            | ActionPayload::UpdateSettings { user_id, .. }
            | ActionPayload::BlockUser { user_id }
            | ActionPayload::UnblockUser { user_id }
            | ActionPayload::ReportUser { user_id, .. }
            | ActionPayload::UpdateLocation { user_id, .. } => user_id,
            ActionPayload::UploadMedia { media_ref, .. }
            | ActionPayload::CreateStory { media_ref, .. } => media_ref,
            ActionPayload::DeleteMedia { media_id } => media_id,
            ActionPayload::DeleteStory { story_id } => story_id,
        }
    }

    /// The payload as a JSON object without the `kind` tag.
    ///
    /// This is the "local version" handed to conflict detection.
    pub fn snapshot(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("kind");
        }
        Ok(value)
    }

    /// Rebuilds a payload of the given kind from a resolved JSON object.
    pub fn from_snapshot(kind: ActionKind, value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::InvalidPayload {
                kind: kind.to_string(),
                reason: "expected a JSON object".to_string(),
            });
        };
        let mut tagged = map.clone();
        tagged.insert("kind".to_string(), Value::String(kind.as_str().to_string()));
        let payload: ActionPayload =
            serde_json::from_value(Value::Object(tagged)).map_err(|e| Error::InvalidPayload {
                kind: kind.to_string(),
                reason: e.to_string(),
            })?;
        Ok(payload)
    }
}

/// A pending mutation and its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub id: String,
    pub kind: ActionKind,
    pub payload: ActionPayload,
    /// Correlation id (chat, user, message) for UI grouping.
    pub target_id: Option<String>,
    pub priority: ActionPriority,
    pub status: ActionStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl QueuedAction {
    /// Creates a new pending action, due immediately.
    pub fn new(
        id: String,
        payload: ActionPayload,
        target_id: Option<String>,
        priority: ActionPriority,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        QueuedAction {
            id,
            kind: payload.kind(),
            payload,
            target_id,
            priority,
            status: ActionStatus::Pending,
            retry_count: 0,
            max_retries,
            next_retry_at: now,
            created_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    /// Returns true if the action is pending and its backoff has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ActionStatus::Pending && self.next_retry_at <= now
    }

    /// Returns true if another retryable failure would exhaust retries.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Action counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl QueueStats {
    /// Actions still owed to the server.
    pub fn live(&self) -> usize {
        self.pending + self.processing
    }

    pub fn total(&self) -> usize {
        self.live() + self.completed + self.failed + self.cancelled
    }

    pub(crate) fn add(&mut self, status: ActionStatus, count: usize) {
        match status {
            ActionStatus::Pending => self.pending += count,
            ActionStatus::Processing => self.processing += count,
            ActionStatus::Completed => self.completed += count,
            ActionStatus::Failed => self.failed += count,
            ActionStatus::Cancelled => self.cancelled += count,
        }
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
