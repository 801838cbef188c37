// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tether_engine::SyncEngine;

use crate::cli::OutputFormat;
use crate::display::format_item_line;
use crate::error::Result;

use super::{emit, open_engine, to_json, Paths};

pub fn run(paths: &Paths, format: OutputFormat) -> Result<()> {
    let engine = open_engine(paths)?;
    emit(&render(&engine, format)?);
    Ok(())
}

pub(crate) fn render(engine: &SyncEngine, format: OutputFormat) -> Result<String> {
    let items = engine.sync_items()?;
    match format {
        OutputFormat::Json => to_json(&items),
        OutputFormat::Text if items.is_empty() => Ok("No sync items".to_string()),
        OutputFormat::Text => Ok(items
            .iter()
            .map(format_item_line)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

#[cfg(test)]
#[path = "items_tests.rs"]
mod tests;
