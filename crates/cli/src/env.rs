// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule. Command-line flags take precedence over all of these.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `TETHER_DB` if set.
pub fn db_path() -> Option<PathBuf> {
    non_empty(vars::TETHER_DB)
}

/// Returns the value of `TETHER_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    non_empty(vars::TETHER_CONFIG)
}

/// Returns the value of `TETHER_LOG_FILE` if set.
pub fn log_file() -> Option<PathBuf> {
    non_empty(vars::TETHER_LOG_FILE)
}

fn non_empty(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
