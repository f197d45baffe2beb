// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Beacon - Durable push notification delivery.
//!
//! This is the binary entry point. `beacon serve` runs the delivery pipeline;
//! every other subcommand is a one-shot operation against the same database.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::DeliveryCommand;

/// Beacon - Durable push notification delivery.
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the delivery pipeline until SIGINT or SIGTERM.
    Serve,
    #[command(flatten)]
    Delivery(DeliveryCommand),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => beacon_config::load_and_validate_path(path),
        None => beacon_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            beacon_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.log.level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Delivery(command) => commands::run_command(&config, command).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
