// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod actions;
pub mod conflicts;
pub mod history;
pub mod items;
pub mod maintenance;
pub mod stats;
pub mod status;

use std::path::PathBuf;

use serde::Serialize;
use tether_engine::{Collaborators, Config, SyncEngine};

use crate::error::{Error, Result};

const CONFIG_DIR_NAME: &str = "tether";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Where to find the config file and database, after flag and
/// environment fallbacks have been applied.
#[derive(Debug, Clone, Default)]
pub struct Paths {
    pub db: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// `<config dir>/tether/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the effective configuration.
///
/// An explicit config file must exist. The default one is optional. A
/// database path in `paths` overrides `store.path`.
pub fn load_config(paths: &Paths) -> Result<Config> {
    let mut config = match &paths.config {
        Some(path) => {
            if !path.exists() {
                return Err(Error::ConfigNotFound(path.display().to_string()));
            }
            Config::load(path)?
        }
        None => match default_config_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };
    if let Some(db) = &paths.db {
        config.store.path = Some(db.clone());
    }
    Ok(config)
}

/// Open the engine without a network.
///
/// Only synchronous engine operations are used from here; nothing is
/// delivered until the embedding application drains the queue.
pub fn open_engine(paths: &Paths) -> Result<SyncEngine> {
    let config = load_config(paths)?;
    Ok(SyncEngine::open(config, Collaborators::disconnected())?)
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Print rendered output, skipping the trailing newline of empty output.
pub(crate) fn emit(output: &str) {
    if !output.is_empty() {
        println!("{}", output);
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
