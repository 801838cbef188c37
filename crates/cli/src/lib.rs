// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether_cli - operator tooling for a tether sync store.
//!
//! The `tether` binary opens the engine's SQLite database without a network
//! and lets an operator inspect the offline queue, sync items, conflicts and
//! connection history, settle conflicts by hand, re-queue failed actions and
//! purge settled rows.
//!
//! Paths resolve in order: command-line flag, environment variable
//! (`TETHER_DB`, `TETHER_CONFIG`), then the config file and platform
//! defaults.

mod cli;
mod commands;
mod display;
pub mod env;
pub mod error;
mod logging;

#[cfg(test)]
mod test_helpers;

pub use cli::{Cli, Command, Keep, OutputFormat};
pub use commands::{default_config_path, Paths};
pub use error::{Error, Result};
pub use logging::setup_logging;

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let paths = Paths {
        db: cli.db.or_else(env::db_path),
        config: cli.config.or_else(env::config_path),
    };

    match cli.command {
        Command::Status { output } => commands::status::run(&paths, output),
        Command::Actions { status, output } => commands::actions::list(&paths, status, output),
        Command::Cancel { id } => commands::actions::cancel(&paths, &id),
        Command::Retry { id } => commands::actions::retry(&paths, &id),
        Command::Items { output } => commands::items::run(&paths, output),
        Command::Conflicts { all, output } => commands::conflicts::list(&paths, all, output),
        Command::Resolve {
            id,
            strategy,
            keep,
            output,
        } => commands::conflicts::resolve(&paths, &id, strategy, keep, output),
        Command::History { limit, output } => commands::history::run(&paths, limit, output),
        Command::Stats { output } => commands::stats::run(&paths, output),
        Command::Purge => commands::maintenance::purge(&paths),
        Command::Config => commands::maintenance::show_config(&paths),
    }
}
