// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Short, prefixed record identifiers.
//!
//! Format: `{prefix}-{hash}` where hash is the first 8 hex chars of
//! SHA256(seed + timestamp). Callers mix a random nonce into the seed so two
//! records created in the same millisecond do not collide.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Prefix for queued action ids.
pub const ACTION_PREFIX: &str = "act";
/// Prefix for sync item ids.
pub const SYNC_ITEM_PREFIX: &str = "syn";
/// Prefix for conflict record ids.
pub const CONFLICT_PREFIX: &str = "cfl";

/// Generate an id from prefix, seed, and timestamp.
pub fn generate_id(prefix: &str, seed: &str, created_at: &DateTime<Utc>) -> String {
    let input = format!(
        "{}{}",
        seed,
        created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..4]);
    format!("{}-{}", prefix, short_hash)
}

/// Generate a unique id, handling collisions by appending an incrementing suffix.
///
/// A failing `exists` lookup aborts generation with its error.
pub fn generate_unique_id<F, E>(
    prefix: &str,
    seed: &str,
    created_at: &DateTime<Utc>,
    exists: F,
) -> Result<String, E>
where
    F: Fn(&str) -> Result<bool, E>,
{
    let base_id = generate_id(prefix, seed, created_at);

    if !exists(&base_id)? {
        return Ok(base_id);
    }

    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id)? {
            return Ok(id);
        }
        suffix += 1;
    }
}

/// Random seed material for [`generate_id`].
pub fn nonce() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
