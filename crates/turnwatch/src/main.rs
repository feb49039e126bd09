// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turnwatch - response-time tracking for team group chats.
//!
//! Binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod commands;
mod serve;
mod shutdown;

/// Turnwatch - response-time tracking for team group chats.
#[derive(Parser, Debug)]
#[command(name = "turnwatch", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the tracker service.
    Serve,
    /// Print the effective configuration and exit.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match turnwatch_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            turnwatch_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("turnwatch serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            let mut printable = config.clone();
            // The token never leaves the process.
            if printable.telegram.bot_token.is_some() {
                printable.telegram.bot_token = Some("<redacted>".to_string());
            }
            match toml::to_string_pretty(&printable) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => {
                    eprintln!("failed to render configuration: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("turnwatch: use --help for available commands");
        }
    }
}
