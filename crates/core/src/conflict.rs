// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict records: divergences between local and server state.
//!
//! A record moves `pending → resolved` exactly once. Resolving an already
//! resolved record returns the stored resolution unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::action::ActionKind;
use crate::error::{Error, Result};

/// Which kind of entity state diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    MessageEdit,
    MessageDelete,
    ProfileUpdate,
    SettingsUpdate,
    LocationUpdate,
    MediaUpload,
    StoryUpdate,
    LikeState,
    BlockState,
}

impl ConflictKind {
    /// Every kind, in declaration order.
    pub const ALL: [ConflictKind; 9] = [
        ConflictKind::MessageEdit,
        ConflictKind::MessageDelete,
        ConflictKind::ProfileUpdate,
        ConflictKind::SettingsUpdate,
        ConflictKind::LocationUpdate,
        ConflictKind::MediaUpload,
        ConflictKind::StoryUpdate,
        ConflictKind::LikeState,
        ConflictKind::BlockState,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::MessageEdit => "message_edit",
            ConflictKind::MessageDelete => "message_delete",
            ConflictKind::ProfileUpdate => "profile_update",
            ConflictKind::SettingsUpdate => "settings_update",
            ConflictKind::LocationUpdate => "location_update",
            ConflictKind::MediaUpload => "media_upload",
            ConflictKind::StoryUpdate => "story_update",
            ConflictKind::LikeState => "like_state",
            ConflictKind::BlockState => "block_state",
        }
    }

    /// The fields compared for divergence and eligible for merge.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            ConflictKind::MessageEdit => &["content", "edited_at", "media_ref"],
            ConflictKind::MessageDelete => &["deleted", "deleted_at"],
            ConflictKind::ProfileUpdate => {
                &["name", "bio", "age", "city", "occupation", "interests"]
            }
            ConflictKind::SettingsUpdate => {
                &["notifications", "privacy", "discovery", "language", "theme"]
            }
            ConflictKind::LocationUpdate => &["latitude", "longitude", "city"],
            ConflictKind::MediaUpload => &["media_ref", "caption", "position"],
            ConflictKind::StoryUpdate => &["media_ref", "caption", "expires_at"],
            ConflictKind::LikeState => &["state"],
            ConflictKind::BlockState => &["blocked"],
        }
    }

    /// The entity type label stored alongside the record.
    pub fn entity_type(&self) -> &'static str {
        match self {
            ConflictKind::MessageEdit | ConflictKind::MessageDelete => "message",
            ConflictKind::ProfileUpdate => "profile",
            ConflictKind::SettingsUpdate => "settings",
            ConflictKind::LocationUpdate => "location",
            ConflictKind::MediaUpload => "media",
            ConflictKind::StoryUpdate => "story",
            ConflictKind::LikeState => "like",
            ConflictKind::BlockState => "block",
        }
    }

    /// Maps a mutation to the conflict kind it can produce, if any.
    pub fn for_action(kind: ActionKind) -> Option<Self> {
        match kind {
            ActionKind::EditMessage => Some(ConflictKind::MessageEdit),
            ActionKind::DeleteMessage => Some(ConflictKind::MessageDelete),
            ActionKind::UpdateProfile => Some(ConflictKind::ProfileUpdate),
            ActionKind::UpdateSettings => Some(ConflictKind::SettingsUpdate),
            ActionKind::UpdateLocation => Some(ConflictKind::LocationUpdate),
            ActionKind::UploadMedia => Some(ConflictKind::MediaUpload),
            ActionKind::CreateStory | ActionKind::DeleteStory => Some(ConflictKind::StoryUpdate),
            ActionKind::Like
            | ActionKind::Dislike
            | ActionKind::SuperLike
            | ActionKind::UndoLike => Some(ConflictKind::LikeState),
            ActionKind::BlockUser | ActionKind::UnblockUser => Some(ConflictKind::BlockState),
            ActionKind::SendMessage
            | ActionKind::MarkRead
            | ActionKind::ReportUser
            | ActionKind::StartTyping
            | ActionKind::StopTyping
            | ActionKind::DeleteMedia => None,
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConflictKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_lowercase().replace('-', "_");
        ConflictKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::InvalidConflictKind(s.to_string()))
    }
}

/// Lifecycle status of a conflict record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Pending,
    Resolved,
    Failed,
    Cancelled,
}

impl ConflictStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStatus::Pending => "pending",
            ConflictStatus::Resolved => "resolved",
            ConflictStatus::Failed => "failed",
            ConflictStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ConflictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConflictStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ConflictStatus::Pending),
            "resolved" => Ok(ConflictStatus::Resolved),
            "failed" => Ok(ConflictStatus::Failed),
            "cancelled" => Ok(ConflictStatus::Cancelled),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// How a conflict is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Later timestamp wins; ties favor the server.
    LastWriterWins,
    ServerWins,
    ClientWins,
    /// Field-by-field merge over the kind's schema.
    Merge,
    /// Wait for an explicit decision from the user.
    UserChoice,
}

impl ResolutionStrategy {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::LastWriterWins => "last-writer-wins",
            ResolutionStrategy::ServerWins => "server-wins",
            ResolutionStrategy::ClientWins => "client-wins",
            ResolutionStrategy::Merge => "merge",
            ResolutionStrategy::UserChoice => "user-choice",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "last-writer-wins" | "lww" => Ok(ResolutionStrategy::LastWriterWins),
            "server-wins" | "server" => Ok(ResolutionStrategy::ServerWins),
            "client-wins" | "client" => Ok(ResolutionStrategy::ClientWins),
            "merge" => Ok(ResolutionStrategy::Merge),
            "user-choice" | "manual" => Ok(ResolutionStrategy::UserChoice),
            _ => Err(Error::InvalidStrategy(s.to_string())),
        }
    }
}

/// Which side's value wins conflicting scalar fields during a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePreference {
    #[default]
    Local,
    Server,
}

/// An explicit decision for a user-choice conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "choice", content = "value", rename_all = "snake_case")]
pub enum UserChoice {
    KeepLocal,
    KeepServer,
    Custom(Value),
}

/// Where the resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedSide {
    Local,
    Server,
    Merged,
    Custom,
}

/// Who settled the conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    /// A configured default strategy, applied on request.
    System,
    /// An explicit user decision.
    User,
    /// The background orchestrator's best-effort pass.
    Background,
}

/// The stored outcome of a resolved conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub strategy: ResolutionStrategy,
    pub value: Value,
    pub winner: ResolvedSide,
    pub resolved_by: ResolvedBy,
    pub reason: String,
    pub resolved_at: DateTime<Utc>,
}

impl Resolution {
    /// Returns true if the resolved value must be pushed back to the server.
    pub fn requires_resubmit(&self) -> bool {
        self.winner != ResolvedSide::Server
    }
}

/// One side of a conflict: a JSON snapshot and when it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub value: Value,
    pub timestamp: DateTime<Utc>,
}

impl EntitySnapshot {
    pub fn new(value: Value, timestamp: DateTime<Utc>) -> Self {
        EntitySnapshot { value, timestamp }
    }
}

/// A detected divergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub id: String,
    pub kind: ConflictKind,
    pub entity_id: String,
    pub entity_type: String,
    pub local_version: Value,
    pub server_version: Value,
    pub local_timestamp: DateTime<Utc>,
    pub server_timestamp: DateTime<Utc>,
    pub conflicted_fields: Vec<String>,
    pub description: String,
    pub status: ConflictStatus,
    pub resolution: Option<Resolution>,
    /// The mutation that surfaced the conflict, if any.
    pub source_action: Option<ActionKind>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
