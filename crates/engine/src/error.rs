// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the sync engine.

use thiserror::Error;

/// Errors raised by engine components.
///
/// Delivery failures are not errors at this level: they are recorded on the
/// action or sync item and retried. See [`crate::transport::DeliveryError`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tether_core::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine is already started")]
    AlreadyStarted,

    #[error("engine is not started")]
    NotStarted,
}

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
