// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use tether_cli::Cli;

fn main() {
    let cli = Cli::parse();
    let log_file = cli.log_file.clone().or_else(tether_cli::env::log_file);
    tether_cli::setup_logging(log_file.as_deref());

    if let Err(e) = tether_cli::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
