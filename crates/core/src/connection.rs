// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state and its transition rules.
//!
//! Quality is `offline` exactly when the transport reports no reachability.
//! While reachable it starts from a baseline picked by transport type and is
//! refined by latency probes; a failed probe degrades to `poor`, never to
//! `offline`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default number of transition events retained in [`ConnectionState::history`].
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Transport type reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Wifi,
    Cellular,
    Ethernet,
    Other,
    #[default]
    None,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Wifi => "wifi",
            ConnectionType::Cellular => "cellular",
            ConnectionType::Ethernet => "ethernet",
            ConnectionType::Other => "other",
            ConnectionType::None => "none",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "wifi" => Ok(ConnectionType::Wifi),
            "cellular" => Ok(ConnectionType::Cellular),
            "ethernet" => Ok(ConnectionType::Ethernet),
            "other" => Ok(ConnectionType::Other),
            "none" => Ok(ConnectionType::None),
            _ => Err(Error::InvalidConnectionValue(s.to_string())),
        }
    }
}

/// Coarse connection quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Poor,
    #[default]
    Offline,
}

impl ConnectionQuality {
    /// Quality assumed right after reachability returns, before any probe.
    pub fn baseline(connection_type: ConnectionType) -> Self {
        match connection_type {
            ConnectionType::Wifi | ConnectionType::Ethernet => ConnectionQuality::Excellent,
            ConnectionType::Cellular | ConnectionType::Other => ConnectionQuality::Good,
            ConnectionType::None => ConnectionQuality::Offline,
        }
    }

    /// Buckets a probe round trip.
    pub fn from_latency(latency: Duration) -> Self {
        if latency < Duration::from_secs(1) {
            ConnectionQuality::Excellent
        } else if latency < Duration::from_secs(3) {
            ConnectionQuality::Good
        } else {
            ConnectionQuality::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionQuality::Excellent => "excellent",
            ConnectionQuality::Good => "good",
            ConnectionQuality::Poor => "poor",
            ConnectionQuality::Offline => "offline",
        }
    }
}

impl fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectionQuality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "excellent" => Ok(ConnectionQuality::Excellent),
            "good" => Ok(ConnectionQuality::Good),
            "poor" => Ok(ConnectionQuality::Poor),
            "offline" => Ok(ConnectionQuality::Offline),
            _ => Err(Error::InvalidConnectionValue(s.to_string())),
        }
    }
}

/// What kind of transition a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEventKind {
    Online,
    Offline,
    QualityChanged,
    TypeChanged,
}

impl ConnectionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionEventKind::Online => "online",
            ConnectionEventKind::Offline => "offline",
            ConnectionEventKind::QualityChanged => "quality_changed",
            ConnectionEventKind::TypeChanged => "type_changed",
        }
    }
}

impl fmt::Display for ConnectionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectionEventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "online" => Ok(ConnectionEventKind::Online),
            "offline" => Ok(ConnectionEventKind::Offline),
            "quality_changed" => Ok(ConnectionEventKind::QualityChanged),
            "type_changed" => Ok(ConnectionEventKind::TypeChanged),
            _ => Err(Error::InvalidConnectionValue(s.to_string())),
        }
    }
}

/// One entry of the connection history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub kind: ConnectionEventKind,
    pub connection_type: ConnectionType,
    pub quality: ConnectionQuality,
    /// Probe round trip that caused the transition, if any.
    pub latency_ms: Option<u64>,
    pub at: DateTime<Utc>,
}

/// The result of applying a signal that actually changed something.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub event: ConnectionEvent,
    pub previous_quality: ConnectionQuality,
    /// Reachability went from online to offline.
    pub lost: bool,
    /// Reachability came back; holds how long it was gone.
    pub restored_after: Option<Duration>,
    /// Quality moved while staying online.
    pub quality_changed: bool,
}

/// Process-wide connection snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub is_online: bool,
    pub connection_type: ConnectionType,
    pub quality: ConnectionQuality,
    pub last_online_at: Option<DateTime<Utc>>,
    pub last_offline_at: Option<DateTime<Utc>>,
    /// Length of the most recent offline period, in milliseconds.
    pub offline_duration_ms: u64,
    /// Newest first.
    pub history: VecDeque<ConnectionEvent>,
}

impl ConnectionState {
    /// Applies a reachability or probe signal.
    ///
    /// Returns `None` when the signal changes nothing. Otherwise the new
    /// event is pushed to the front of the history, which is truncated to
    /// `history_limit`.
    pub fn apply(
        &mut self,
        online: bool,
        connection_type: ConnectionType,
        quality: ConnectionQuality,
        latency_ms: Option<u64>,
        now: DateTime<Utc>,
        history_limit: usize,
    ) -> Option<Transition> {
        let quality = if online {
            match quality {
                ConnectionQuality::Offline => ConnectionQuality::Poor,
                q => q,
            }
        } else {
            ConnectionQuality::Offline
        };
        let connection_type = if online {
            connection_type
        } else {
            ConnectionType::None
        };

        if self.is_online == online
            && self.connection_type == connection_type
            && self.quality == quality
        {
            return None;
        }

        let was_online = self.is_online;
        let previous_quality = self.quality;
        let mut lost = false;
        let mut restored_after = None;

        let kind = if was_online && !online {
            lost = true;
            self.last_offline_at = Some(now);
            ConnectionEventKind::Offline
        } else if !was_online && online {
            let gone = self
                .last_offline_at
                .map(|at| (now - at).to_std().unwrap_or_default())
                .unwrap_or_default();
            self.offline_duration_ms = u64::try_from(gone.as_millis()).unwrap_or(u64::MAX);
            self.last_online_at = Some(now);
            restored_after = Some(gone);
            ConnectionEventKind::Online
        } else if previous_quality != quality {
            ConnectionEventKind::QualityChanged
        } else {
            ConnectionEventKind::TypeChanged
        };

        self.is_online = online;
        self.connection_type = connection_type;
        self.quality = quality;

        let event = ConnectionEvent {
            kind,
            connection_type,
            quality,
            latency_ms,
            at: now,
        };
        self.history.push_front(event.clone());
        self.history.truncate(history_limit);

        Some(Transition {
            event,
            previous_quality,
            lost,
            restored_after,
            quality_changed: was_online && online && previous_quality != quality,
        })
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
