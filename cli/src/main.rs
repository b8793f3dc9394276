// Copyright (c) 2026 DSA Platform Team
// SPDX-License-Identifier: AGPL-3.0

//! # DSA Enablement CLI
//!
//! The `dsa-enablement` binary drives the service enablement lifecycle
//! against the configured storage backend.
//!
//! ## Commands
//!
//! - `dsa-enablement migrate` - Apply database migrations
//! - `dsa-enablement request submit|create|get|list|summary|apply|accept|reject|enable|disable|set-status|remark|remove`
//! - `dsa-enablement upload add|accept|reject|remove|list`
//! - `dsa-enablement config show|validate|generate`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use dsa_enablement::commands::{self, ConfigCommand, RequestCommand, UploadCommand};
use dsa_enablement::embedded::resolve_log_level;

/// DSA service enablement request lifecycle
#[derive(Parser)]
#[command(name = "dsa-enablement")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "DSA_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Defaults to `logging.level`.
    #[arg(long, global = true, env = "DSA_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database schema migrations
    Migrate,

    /// Service request lifecycle operations
    Request {
        #[command(subcommand)]
        command: RequestCommand,
    },

    /// Uploaded document verification
    Upload {
        #[command(subcommand)]
        command: UploadCommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&resolve_log_level(cli.log_level.clone(), cli.config.clone()))?;

    match cli.command {
        Some(Commands::Migrate) => commands::migrate::execute(cli.config).await,
        Some(Commands::Request { command }) => commands::request::handle_command(command, cli.config).await,
        Some(Commands::Upload { command }) => commands::upload::handle_command(command, cli.config).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr so JSON output on stdout stays parseable.
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
