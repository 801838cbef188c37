// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file)
//! yields a working configuration:
//!
//! ```toml
//! [store]
//! path = "/var/lib/app/tether.db"
//!
//! [queue]
//! capacity = 1000
//!
//! [backoff.multipliers]
//! upload_media = 3.0
//!
//! [conflicts]
//! merge_preference = "server"
//!
//! [conflicts.strategies]
//! profile_update = "user-choice"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tether_core::backoff::{default_action_multiplier, default_domain_multiplier};
use tether_core::{
    ActionKind, BackoffPolicy, ConflictKind, MergePreference, ResolutionStrategy, SyncDomain,
};

use crate::error::{Error, Result};

const DATA_DIR_NAME: &str = "tether";
const DB_FILE_NAME: &str = "tether.db";

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub backoff: BackoffConfig,
    pub scheduler: SchedulerConfig,
    pub connection: ConnectionConfig,
    pub background: BackgroundConfig,
    pub conflicts: ConflictsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. Defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// ActionQueue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum live (pending + processing) actions.
    pub capacity: usize,
    /// Retries allowed for non-ephemeral actions.
    pub max_retries: u32,
    /// How long completed and cancelled records are kept.
    pub retention_hours: u64,
    /// Periodic drain while online (seconds).
    pub drain_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            capacity: default_capacity(),
            max_retries: default_action_max_retries(),
            retention_hours: default_retention_hours(),
            drain_interval_secs: default_drain_interval_secs(),
        }
    }
}

fn default_capacity() -> usize {
    1000
}

fn default_action_max_retries() -> u32 {
    5
}

fn default_retention_hours() -> u64 {
    24 * 7
}

fn default_drain_interval_secs() -> u64 {
    30
}

impl QueueConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs)
    }
}

/// Retry delay settings shared by actions and sync items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub base_ms: u64,
    pub cap_ms: u64,
    pub max_jitter_ms: u64,
    /// Per-kind overrides of the growth factor.
    pub multipliers: HashMap<ActionKind, f64>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        BackoffConfig {
            base_ms: policy.base_ms,
            cap_ms: policy.cap_ms,
            max_jitter_ms: policy.max_jitter_ms,
            multipliers: HashMap::new(),
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base_ms: self.base_ms,
            cap_ms: self.cap_ms,
            max_jitter_ms: self.max_jitter_ms,
        }
    }

    pub fn multiplier(&self, kind: ActionKind) -> f64 {
        self.multipliers
            .get(&kind)
            .copied()
            .unwrap_or_else(|| default_action_multiplier(kind))
    }
}

/// SyncScheduler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub max_retries: u32,
    /// A target touched within this window gets a priority boost.
    pub boost_window_secs: u64,
    /// How many priority steps the boost is worth.
    pub boost_steps: u32,
    /// Per-domain overrides of the backoff growth factor.
    pub multipliers: HashMap<SyncDomain, f64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_retries: 3,
            boost_window_secs: 300,
            boost_steps: 1,
            multipliers: HashMap::new(),
        }
    }
}

impl SchedulerConfig {
    pub fn boost_window(&self) -> Duration {
        Duration::from_secs(self.boost_window_secs)
    }

    pub fn multiplier(&self, domain: SyncDomain) -> f64 {
        self.multipliers
            .get(&domain)
            .copied()
            .unwrap_or_else(|| default_domain_multiplier(domain))
    }
}

/// ConnectionMonitor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Lightweight endpoint hit by the latency probe.
    pub probe_url: String,
    pub probe_interval_secs: u64,
    pub probe_timeout_ms: u64,
    /// Connection events retained in memory and on disk.
    pub history_limit: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            probe_url: "https://localhost/health".to_string(),
            probe_interval_secs: 10,
            probe_timeout_ms: 5000,
            history_limit: tether_core::connection::DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl ConnectionConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// BackgroundOrchestrator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Wall-clock cap on one background run.
    pub run_budget_secs: u64,
    /// Delay between entering the background and the first run.
    pub background_delay_secs: u64,
    pub background_interval_secs: u64,
    pub foreground_interval_secs: u64,
    pub recent_errors: usize,
    /// Pending conflicts auto-resolved per run.
    pub auto_resolve_limit: usize,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        BackgroundConfig {
            run_budget_secs: 25,
            background_delay_secs: 2,
            background_interval_secs: 15 * 60,
            foreground_interval_secs: 60,
            recent_errors: tether_core::stats::DEFAULT_RECENT_ERRORS,
            auto_resolve_limit: 50,
        }
    }
}

impl BackgroundConfig {
    pub fn run_budget(&self) -> Duration {
        Duration::from_secs(self.run_budget_secs)
    }

    pub fn background_delay(&self) -> Duration {
        Duration::from_secs(self.background_delay_secs)
    }

    pub fn background_interval(&self) -> Duration {
        Duration::from_secs(self.background_interval_secs)
    }

    pub fn foreground_interval(&self) -> Duration {
        Duration::from_secs(self.foreground_interval_secs)
    }
}

/// ConflictResolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictsConfig {
    /// Which side wins conflicting leaves during a merge.
    pub merge_preference: MergePreference,
    /// Per-kind overrides of the default strategy.
    pub strategies: HashMap<ConflictKind, ResolutionStrategy>,
    /// How long resolved and cancelled conflicts are kept.
    pub retention_hours: u64,
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        ConflictsConfig {
            merge_preference: MergePreference::default(),
            strategies: HashMap::new(),
            retention_hours: default_retention_hours(),
        }
    }
}

impl ConflictsConfig {
    pub fn strategy_for(&self, kind: ConflictKind) -> ResolutionStrategy {
        self.strategies
            .get(&kind)
            .copied()
            .unwrap_or_else(|| default_strategy(kind))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }
}

/// Built-in strategy for each conflict kind.
pub fn default_strategy(kind: ConflictKind) -> ResolutionStrategy {
    match kind {
        ConflictKind::MessageEdit | ConflictKind::LocationUpdate | ConflictKind::StoryUpdate => {
            ResolutionStrategy::LastWriterWins
        }
        ConflictKind::MessageDelete => ResolutionStrategy::ServerWins,
        ConflictKind::ProfileUpdate | ConflictKind::SettingsUpdate => ResolutionStrategy::Merge,
        ConflictKind::MediaUpload | ConflictKind::LikeState | ConflictKind::BlockState => {
            ResolutionStrategy::ClientWins
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration from a file if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            return Err(Error::Config(
                "queue.capacity must be greater than zero".to_string(),
            ));
        }
        if self.backoff.cap_ms < self.backoff.base_ms {
            return Err(Error::Config(format!(
                "backoff.cap_ms ({}) is below backoff.base_ms ({})",
                self.backoff.cap_ms, self.backoff.base_ms
            )));
        }
        if let Some((kind, m)) = self.backoff.multipliers.iter().find(|(_, m)| **m < 0.0) {
            return Err(Error::Config(format!(
                "backoff.multipliers.{kind} must not be negative (got {m})"
            )));
        }
        if let Some((domain, m)) = self.scheduler.multipliers.iter().find(|(_, m)| **m < 0.0) {
            return Err(Error::Config(format!(
                "scheduler.multipliers.{domain} must not be negative (got {m})"
            )));
        }
        if self.connection.probe_interval_secs == 0 {
            return Err(Error::Config(
                "connection.probe_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.connection.history_limit == 0 {
            return Err(Error::Config(
                "connection.history_limit must be greater than zero".to_string(),
            ));
        }
        if self.background.background_interval_secs == 0
            || self.background.foreground_interval_secs == 0
        {
            return Err(Error::Config(
                "background intervals must be greater than zero".to_string(),
            ));
        }
        if self.queue.drain_interval_secs == 0 {
            return Err(Error::Config(
                "queue.drain_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved database path.
    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(default_store_path)
    }
}

/// `<data dir>/tether/tether.db`, or `./.tether/tether.db` without a data dir.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".tether"))
        .join(DB_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
