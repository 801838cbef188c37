// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::str::FromStr;

use tether_core::{ResolutionStrategy, UserChoice};
use tether_engine::{ResolutionResult, SyncEngine};

use crate::cli::{Keep, OutputFormat};
use crate::display::{format_conflict_details, format_conflict_line};
use crate::error::{Error, Result};

use super::{emit, open_engine, to_json, Paths};

pub fn list(paths: &Paths, all: bool, format: OutputFormat) -> Result<()> {
    let engine = open_engine(paths)?;
    emit(&render_list(&engine, all, format)?);
    Ok(())
}

pub(crate) fn render_list(engine: &SyncEngine, all: bool, format: OutputFormat) -> Result<String> {
    let conflicts = if all {
        engine.all_conflicts()?
    } else {
        engine.conflicts()?
    };
    match format {
        OutputFormat::Json => to_json(&conflicts),
        OutputFormat::Text if conflicts.is_empty() => Ok("No conflicts".to_string()),
        OutputFormat::Text => Ok(conflicts
            .iter()
            .map(format_conflict_line)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

pub fn resolve(
    paths: &Paths,
    id: &str,
    strategy: Option<String>,
    keep: Option<Keep>,
    format: OutputFormat,
) -> Result<()> {
    let engine = open_engine(paths)?;
    emit(&resolve_impl(&engine, id, strategy.as_deref(), keep, format)?);
    Ok(())
}

/// Settle a conflict with an explicit side, a named strategy, or the
/// configured default for its kind.
pub(crate) fn resolve_impl(
    engine: &SyncEngine,
    id: &str,
    strategy: Option<&str>,
    keep: Option<Keep>,
    format: OutputFormat,
) -> Result<String> {
    let (strategy, choice) = match keep {
        Some(Keep::Local) => (
            Some(ResolutionStrategy::UserChoice),
            Some(UserChoice::KeepLocal),
        ),
        Some(Keep::Server) => (
            Some(ResolutionStrategy::UserChoice),
            Some(UserChoice::KeepServer),
        ),
        None => (strategy.map(ResolutionStrategy::from_str).transpose()?, None),
    };

    match engine.resolve_conflict(id, strategy, choice)? {
        ResolutionResult::Resolved(record) => match format {
            OutputFormat::Json => to_json(&record),
            OutputFormat::Text => Ok(format_conflict_details(&record)),
        },
        ResolutionResult::AlreadyResolved(_) => {
            let record = engine.conflict(id)?;
            match format {
                OutputFormat::Json => to_json(&record),
                OutputFormat::Text => Ok(format!(
                    "Conflict {} was already resolved\n\n{}",
                    record.id,
                    format_conflict_details(&record)
                )),
            }
        }
        ResolutionResult::NeedsInput(record) => Err(Error::NeedsChoice { id: record.id }),
    }
}

#[cfg(test)]
#[path = "conflicts_tests.rs"]
mod tests;
