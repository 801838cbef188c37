// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by the `tether` CLI.
///
/// Messages carry a hint where the fix is not obvious.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] tether_engine::Error),

    #[error(transparent)]
    Core(#[from] tether_core::Error),

    #[error("action {id} is not pending\n  hint: only pending actions can be cancelled")]
    NotCancellable { id: String },

    #[error("conflict {id} needs a decision\n  hint: pass --keep local or --keep server")]
    NeedsChoice { id: String },

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
