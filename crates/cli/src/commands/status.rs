// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tether_engine::SyncEngine;

use crate::cli::OutputFormat;
use crate::display::format_status;
use crate::error::Result;

use super::{emit, open_engine, to_json, Paths};

pub fn run(paths: &Paths, format: OutputFormat) -> Result<()> {
    let engine = open_engine(paths)?;
    emit(&render(&engine, format)?);
    Ok(())
}

pub(crate) fn render(engine: &SyncEngine, format: OutputFormat) -> Result<String> {
    let status = engine.status()?;
    match format {
        OutputFormat::Text => Ok(format_status(&status)),
        OutputFormat::Json => to_json(&status),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
