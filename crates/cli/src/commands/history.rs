// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tether_engine::SyncEngine;

use crate::cli::OutputFormat;
use crate::display::format_event_line;
use crate::error::Result;

use super::{emit, open_engine, to_json, Paths};

pub fn run(paths: &Paths, limit: usize, format: OutputFormat) -> Result<()> {
    let engine = open_engine(paths)?;
    emit(&render(&engine, limit, format)?);
    Ok(())
}

pub(crate) fn render(engine: &SyncEngine, limit: usize, format: OutputFormat) -> Result<String> {
    let events: Vec<_> = engine.connection_history().into_iter().take(limit).collect();
    match format {
        OutputFormat::Json => to_json(&events),
        OutputFormat::Text if events.is_empty() => Ok("No connection changes recorded".to_string()),
        OutputFormat::Text => Ok(events
            .iter()
            .map(format_event_line)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
