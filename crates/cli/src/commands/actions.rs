// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::str::FromStr;

use tether_core::ActionStatus;
use tether_engine::SyncEngine;

use crate::cli::OutputFormat;
use crate::display::format_action_line;
use crate::error::{Error, Result};

use super::{emit, open_engine, to_json, Paths};

pub fn list(paths: &Paths, status: Option<String>, format: OutputFormat) -> Result<()> {
    let engine = open_engine(paths)?;
    emit(&render_list(&engine, status.as_deref(), format)?);
    Ok(())
}

pub(crate) fn render_list(
    engine: &SyncEngine,
    status: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let status = status.map(ActionStatus::from_str).transpose()?;
    let actions = engine.actions(status)?;
    match format {
        OutputFormat::Json => to_json(&actions),
        OutputFormat::Text if actions.is_empty() => Ok("No actions".to_string()),
        OutputFormat::Text => Ok(actions
            .iter()
            .map(format_action_line)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

pub fn cancel(paths: &Paths, id: &str) -> Result<()> {
    let engine = open_engine(paths)?;
    emit(&cancel_impl(&engine, id)?);
    Ok(())
}

pub(crate) fn cancel_impl(engine: &SyncEngine, id: &str) -> Result<String> {
    // Surfaces "action not found" before the status check.
    let action = engine.action(id)?;
    if !engine.cancel_action(id)? {
        return Err(Error::NotCancellable { id: action.id });
    }
    Ok(format!("Cancelled {} ({})", action.id, action.kind))
}

pub fn retry(paths: &Paths, id: &str) -> Result<()> {
    let engine = open_engine(paths)?;
    emit(&retry_impl(&engine, id)?);
    Ok(())
}

pub(crate) fn retry_impl(engine: &SyncEngine, id: &str) -> Result<String> {
    let action = engine.retry_action(id)?;
    tracing::info!("Re-queued failed action {}", action.id);
    Ok(format!("Re-queued {} ({})", action.id, action.kind))
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
