// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Field-level divergence detection and conflict resolution rules.
//!
//! Rules:
//! - Only the kind's schema fields are compared, and only those the local
//!   snapshot carries (a partial update leaves other fields untouched)
//! - last-writer-wins: later timestamp wins, ties favor the server
//! - merge: schema fields merge recursively, conflicting leaves take the
//!   preferred side; fields outside the schema are unioned and keep the
//!   server's value when both sides carry them
//! - user-choice: undecided until a choice is supplied
//!
//! Everything here is pure; the resolver in the engine owns storage.

use serde_json::{Map, Value};

use crate::action::{ActionKind, ActionPayload};
use crate::conflict::{
    ConflictKind, ConflictRecord, MergePreference, ResolutionStrategy, ResolvedSide, UserChoice,
};
use crate::error::{Error, Result};

/// The outcome of applying a strategy to a conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub value: Value,
    pub winner: ResolvedSide,
    pub reason: String,
}

/// Returns the schema fields on which `local` and `server` disagree.
pub fn diverging_fields(kind: ConflictKind, local: &Value, server: &Value) -> Vec<String> {
    kind.fields()
        .iter()
        .filter(|field| match local.get(**field) {
            Some(local_value) => server.get(**field).unwrap_or(&Value::Null) != local_value,
            None => false,
        })
        .map(|field| (*field).to_string())
        .collect()
}

/// Human-readable summary of a divergence.
pub fn describe(kind: ConflictKind, entity_id: &str, fields: &[String]) -> String {
    format!(
        "{} {} changed locally and on the server: {}",
        kind.entity_type(),
        entity_id,
        fields.join(", ")
    )
}

/// Merges two snapshots of a `kind` entity.
pub fn merge(kind: ConflictKind, local: &Value, server: &Value, preference: MergePreference) -> Value {
    let (Value::Object(local_map), Value::Object(server_map)) = (local, server) else {
        return pick(local, server, preference).clone();
    };

    let schema = kind.fields();
    let mut merged = Map::new();
    for (key, server_value) in server_map {
        let value = match local_map.get(key) {
            Some(local_value) if schema.contains(&key.as_str()) => {
                merge_value(local_value, server_value, preference)
            }
            _ => server_value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    for (key, local_value) in local_map {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), local_value.clone());
        }
    }
    Value::Object(merged)
}

fn merge_value(local: &Value, server: &Value, preference: MergePreference) -> Value {
    if local == server {
        return server.clone();
    }
    match (local, server) {
        (Value::Object(local_map), Value::Object(server_map)) => {
            let mut merged = Map::new();
            for (key, server_value) in server_map {
                let value = match local_map.get(key) {
                    Some(local_value) => merge_value(local_value, server_value, preference),
                    None => server_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            for (key, local_value) in local_map {
                if !merged.contains_key(key) {
                    merged.insert(key.clone(), local_value.clone());
                }
            }
            Value::Object(merged)
        }
        _ => pick(local, server, preference).clone(),
    }
}

fn pick<'a>(local: &'a Value, server: &'a Value, preference: MergePreference) -> &'a Value {
    match preference {
        MergePreference::Local => local,
        MergePreference::Server => server,
    }
}

/// Applies `strategy` (or an explicit `choice`, which takes precedence).
///
/// Returns `None` when the strategy is user-choice and no choice was given.
pub fn decide(
    record: &ConflictRecord,
    strategy: ResolutionStrategy,
    choice: Option<&UserChoice>,
    preference: MergePreference,
) -> Option<Decision> {
    let local = || Decision {
        value: record.local_version.clone(),
        winner: ResolvedSide::Local,
        reason: String::new(),
    };
    let server = || Decision {
        value: record.server_version.clone(),
        winner: ResolvedSide::Server,
        reason: String::new(),
    };

    if let Some(choice) = choice {
        let decision = match choice {
            UserChoice::KeepLocal => local(),
            UserChoice::KeepServer => server(),
            UserChoice::Custom(value) => Decision {
                value: value.clone(),
                winner: ResolvedSide::Custom,
                reason: String::new(),
            },
        };
        return Some(with_reason(decision, "chosen by user"));
    }

    let decision = match strategy {
        ResolutionStrategy::LastWriterWins => {
            if record.local_timestamp > record.server_timestamp {
                with_reason(local(), "local change is newer")
            } else {
                with_reason(server(), "server change is newer or simultaneous")
            }
        }
        ResolutionStrategy::ServerWins => with_reason(server(), "server is authoritative"),
        ResolutionStrategy::ClientWins => with_reason(local(), "local change is authoritative"),
        ResolutionStrategy::Merge => {
            let value = merge(
                record.kind,
                &record.local_version,
                &record.server_version,
                preference,
            );
            let winner = if value == record.server_version {
                ResolvedSide::Server
            } else {
                ResolvedSide::Merged
            };
            Decision {
                value,
                winner,
                reason: format!("merged fields: {}", record.conflicted_fields.join(", ")),
            }
        }
        ResolutionStrategy::UserChoice => return None,
    };
    Some(decision)
}

fn with_reason(mut decision: Decision, reason: &str) -> Decision {
    decision.reason = reason.to_string();
    decision
}

/// The local side of a delivery conflict.
///
/// Starts from the payload snapshot and adds the state fields that like and
/// block actions only imply through their kind.
pub fn local_snapshot(payload: &ActionPayload) -> Result<Value> {
    let mut value = payload.snapshot()?;
    let derived = match payload.kind() {
        ActionKind::Like => Some(("state", Value::from("like"))),
        ActionKind::Dislike => Some(("state", Value::from("dislike"))),
        ActionKind::SuperLike => Some(("state", Value::from("super_like"))),
        ActionKind::UndoLike => Some(("state", Value::from("none"))),
        ActionKind::BlockUser => Some(("blocked", Value::Bool(true))),
        ActionKind::UnblockUser => Some(("blocked", Value::Bool(false))),
        ActionKind::DeleteMessage => Some(("deleted", Value::Bool(true))),
        _ => None,
    };
    if let (Some((field, state)), Value::Object(map)) = (derived, &mut value) {
        map.insert(field.to_string(), state);
    }
    Ok(value)
}

/// Rebuilds an action that pushes a resolved value back to the server.
///
/// The resolved value is laid over the local snapshot so identifiers the
/// server copy lacks survive. Like and block states select the action kind.
pub fn resubmit_payload(source: ActionKind, local: &Value, resolved: &Value) -> Result<ActionPayload> {
    let mut combined = match local {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    match resolved {
        Value::Object(map) => {
            for (key, value) in map {
                combined.insert(key.clone(), value.clone());
            }
        }
        other => {
            return Err(Error::InvalidPayload {
                kind: source.to_string(),
                reason: format!("resolved value is not an object: {other}"),
            })
        }
    }

    let kind = match ConflictKind::for_action(source) {
        Some(ConflictKind::LikeState) => match combined.get("state").and_then(Value::as_str) {
            Some("like") => ActionKind::Like,
            Some("dislike") => ActionKind::Dislike,
            Some("super_like") => ActionKind::SuperLike,
            Some("none") => ActionKind::UndoLike,
            _ => source,
        },
        Some(ConflictKind::BlockState) => match combined.get("blocked").and_then(Value::as_bool) {
            Some(true) => ActionKind::BlockUser,
            Some(false) => ActionKind::UnblockUser,
            None => source,
        },
        _ => source,
    };

    ActionPayload::from_snapshot(kind, &Value::Object(combined))
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
