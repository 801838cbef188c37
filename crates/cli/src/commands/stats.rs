// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tether_engine::SyncEngine;

use crate::cli::OutputFormat;
use crate::display::format_run_stats;
use crate::error::Result;

use super::{emit, open_engine, to_json, Paths};

pub fn run(paths: &Paths, format: OutputFormat) -> Result<()> {
    let engine = open_engine(paths)?;
    emit(&render(&engine, format)?);
    Ok(())
}

pub(crate) fn render(engine: &SyncEngine, format: OutputFormat) -> Result<String> {
    let stats = engine.background_stats();
    match format {
        OutputFormat::Text => Ok(format_run_stats(&stats)),
        OutputFormat::Json => to_json(&stats),
    }
}
