// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tether_engine::PurgeReport;

use crate::error::Result;

use super::{emit, load_config, open_engine, Paths};

pub fn purge(paths: &Paths) -> Result<()> {
    let engine = open_engine(paths)?;
    let report = engine.purge()?;
    emit(&format_purge(&report));
    Ok(())
}

pub(crate) fn format_purge(report: &PurgeReport) -> String {
    if report.actions == 0 && report.conflicts == 0 {
        return "Nothing to purge".to_string();
    }
    format!(
        "Purged {} {} and {} {}",
        report.actions,
        plural(report.actions, "action", "actions"),
        report.conflicts,
        plural(report.conflicts, "conflict", "conflicts")
    )
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Print the effective configuration, defaults included.
pub fn show_config(paths: &Paths) -> Result<()> {
    let mut config = load_config(paths)?;
    config.store.path = Some(config.store_path());
    emit(config.to_toml_string()?.trim_end());
    Ok(())
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
