// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # NeoCDT CLI
//!
//! The `neocdt` binary drives the deposit request lifecycle engine.
//!
//! ## Commands
//!
//! - `neocdt profile register|show` - Customer profiles
//! - `neocdt request create|list|get|update|transition|delete|history|summary` - Request lifecycle
//! - `neocdt request pending|audit` - Agent review (`--role agent`)
//! - `neocdt config show|validate|generate` - Configuration management
//! - `neocdt db migrate` - Apply the PostgreSQL schema
//! - `neocdt demo` - In-memory walkthrough
//!
//! Every request and profile command acts as the caller given by
//! `--subject` and `--role` (or `NEOCDT_SUBJECT` / `NEOCDT_ROLE`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use neocdt::commands::{self, ConfigCommand, DbCommand, ProfileCommand, RequestCommand};
use neocdt::context::CallerArgs;
use neocdt_core::domain::config::{LogFormat, ServiceConfig};

/// NeoCDT - Time-deposit request lifecycle
#[derive(Parser)]
#[command(name = "neocdt")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "NEOCDT_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to spec.logging.level
    #[arg(long, global = true, env = "NEOCDT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    caller: CallerArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Customer profile operations
    #[command(name = "profile")]
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Deposit request operations
    #[command(name = "request")]
    Request {
        #[command(subcommand)]
        command: RequestCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Database management
    #[command(name = "db")]
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },

    /// Run the lifecycle walkthrough against in-memory storage
    #[command(name = "demo")]
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logging settings come from the config file when it loads; a broken
    // config is reported by the command itself
    let logging = ServiceConfig::load_or_default(cli.config.clone())
        .map(|config| config.spec.logging)
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    init_logging(&level, logging.format)?;

    match cli.command {
        Some(Commands::Profile { command }) => {
            commands::profile::handle_command(command, cli.config, &cli.caller, cli.json).await
        }
        Some(Commands::Request { command }) => {
            commands::request::handle_command(command, cli.config, &cli.caller, cli.json).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Db { command }) => commands::db::handle_command(command, cli.config).await,
        Some(Commands::Demo) => commands::demo::run(cli.config).await,
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}
