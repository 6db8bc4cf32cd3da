// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Database commands
//!
//! Commands: migrate
//!
//! ```bash
//! # Apply all pending migrations
//! neocdt db migrate
//!
//! # Preview migrations without applying
//! neocdt db migrate --dry-run
//! ```

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use neocdt_core::domain::config::{ServiceConfig, DATABASE_URL_ENV};
use neocdt_core::domain::repository::StorageBackend;
use neocdt_core::infrastructure::db::Database;

#[derive(Subcommand)]
pub enum DbCommand {
    /// Apply pending schema migrations
    Migrate {
        /// List pending migrations without applying them
        #[arg(long)]
        dry_run: bool,
    },
}

pub async fn handle_command(command: DbCommand, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        DbCommand::Migrate { dry_run } => migrate(config_path, dry_run).await,
    }
}

async fn migrate(config_path: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let config = ServiceConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let StorageBackend::PostgreSQL(postgres) = config.storage_backend() else {
        bail!(
            "Storage backend is in-memory; set spec.storage.backend to postgres or {}",
            DATABASE_URL_ENV
        );
    };

    println!("Connecting to database...");
    let db = Database::connect(&postgres).await?;

    let pending = db.pending_migrations().await?;
    if pending.is_empty() {
        println!("{}", "✓ Database is up to date".green());
        return Ok(());
    }

    println!("Pending migrations:");
    for (version, description) in &pending {
        println!(" - {} {}", version, description);
    }

    if dry_run {
        println!("Skipping application due to --dry-run");
        return Ok(());
    }

    println!("Applying pending migrations...");
    db.migrate().await?;
    println!("{}", "✓ Database schema is up to date".green());

    Ok(())
}
