// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service wiring shared by the request and profile commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::debug;

use neocdt_core::application::profile_service::ProfileService;
use neocdt_core::application::repository_factory::{
    create_profile_service, create_repositories, create_request_service,
};
use neocdt_core::application::request_service::RequestService;
use neocdt_core::domain::config::ServiceConfig;
use neocdt_core::domain::profile::{CallerIdentity, Role};
use neocdt_core::domain::repository::StorageBackend;

/// Verified caller identity, as issued by the upstream identity provider
#[derive(Args, Debug, Clone)]
pub struct CallerArgs {
    /// Caller subject id
    #[arg(long, global = true, env = "NEOCDT_SUBJECT", value_name = "SUBJECT")]
    pub subject: Option<String>,

    /// Caller role (customer | agent)
    #[arg(long, global = true, env = "NEOCDT_ROLE", default_value = "customer")]
    pub role: Role,
}

impl CallerArgs {
    pub fn identity(&self) -> Result<CallerIdentity> {
        let subject = self
            .subject
            .clone()
            .filter(|s| !s.trim().is_empty())
            .context("--subject (or NEOCDT_SUBJECT) is required for this command")?;
        Ok(match self.role {
            Role::Customer => CallerIdentity::customer(subject),
            Role::Agent => CallerIdentity::agent(subject),
        })
    }
}

pub struct AppContext {
    pub requests: Arc<dyn RequestService>,
    pub profiles: Arc<dyn ProfileService>,
}

impl AppContext {
    pub async fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = ServiceConfig::load_or_default(config_path)
            .context("Failed to load configuration")?;
        config
            .validate()
            .context("Configuration validation failed")?;

        let backend = config.storage_backend();
        debug!(instance = %config.metadata.name, "Loaded configuration");
        if backend == StorageBackend::InMemory {
            eprintln!(
                "{}",
                "Using in-memory storage: data is discarded when this command exits".yellow()
            );
        }

        let repositories = create_repositories(&backend).await?;
        Ok(Self {
            requests: create_request_service(&repositories, config.lifecycle_policy()),
            profiles: create_profile_service(&repositories),
        })
    }
}
