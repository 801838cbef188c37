// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Side kept when settling a conflict by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Keep {
    Local,
    Server,
}

#[derive(Parser)]
#[command(name = "tether")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and maintain a tether offline sync store")]
#[command(
    long_about = "Inspect and maintain a tether offline sync store.\n\n\
    Works directly on the SQLite database, without a network. Actions re-queued here \
    are delivered the next time the application drains its queue."
)]
pub struct Cli {
    /// Database file (overrides the config file and TETHER_DB)
    #[arg(long, global = true, value_name = "path")]
    pub db: Option<PathBuf>,

    /// Config file (defaults to TETHER_CONFIG, then the platform config dir)
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, value_name = "path")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show connection, queue and conflict counts
    Status {
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// List queued actions
    Actions {
        /// Only actions in this status (pending, processing, completed, failed, cancelled)
        #[arg(long, short)]
        status: Option<String>,

        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Cancel a pending action
    #[command(arg_required_else_help = true)]
    Cancel {
        /// Action ID
        id: String,
    },

    /// Give a failed action a fresh set of retries
    #[command(arg_required_else_help = true)]
    Retry {
        /// Action ID
        id: String,
    },

    /// List queued sync items
    Items {
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// List conflicts (pending only unless --all)
    Conflicts {
        /// Include resolved and cancelled conflicts
        #[arg(long, short)]
        all: bool,

        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Settle a conflict
    #[command(arg_required_else_help = true)]
    Resolve {
        /// Conflict ID
        id: String,

        /// Strategy (last-writer-wins, server-wins, client-wins, merge)
        #[arg(long)]
        strategy: Option<String>,

        /// Keep one side outright
        #[arg(long, value_enum, conflicts_with = "strategy")]
        keep: Option<Keep>,

        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show recent connection transitions, newest first
    History {
        /// Maximum number of entries
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,

        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show background run statistics
    Stats {
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Delete settled actions and conflicts past their retention window
    Purge,

    /// Print the effective configuration as TOML
    Config,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
