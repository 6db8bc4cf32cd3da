// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend
//! configuration, keeping the domain layer free of infrastructure types.
//!
//! The request repository and the audit trail must share one backing store
//! so that `DepositRequestRepository::commit` can write both atomically. The
//! factory therefore hands them out together as a `Repositories` bundle.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wire repositories and services for a configured backend

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::application::profile_service::{ProfileService, StandardProfileService};
use crate::application::request_service::{RequestService, StandardRequestService};
use crate::domain::deposit::LifecyclePolicy;
use crate::domain::repository::{
    AuditTrail, DepositRequestRepository, ProfileRepository, StorageBackend,
};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::postgres_audit::PostgresAuditTrail;
use crate::infrastructure::repositories::postgres_deposit::PostgresDepositRequestRepository;
use crate::infrastructure::repositories::postgres_profile::PostgresProfileRepository;
use crate::infrastructure::repositories::{InMemoryLifecycleStore, InMemoryProfileRepository};

#[derive(Clone)]
pub struct Repositories {
    pub requests: Arc<dyn DepositRequestRepository>,
    pub audit: Arc<dyn AuditTrail>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Repositories {
    /// Fresh, instance-scoped in-memory stores
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryLifecycleStore::new());
        Self {
            requests: store.clone(),
            audit: store,
            profiles: Arc::new(InMemoryProfileRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            requests: Arc::new(PostgresDepositRequestRepository::new(pool.clone())),
            audit: Arc::new(PostgresAuditTrail::new(pool.clone())),
            profiles: Arc::new(PostgresProfileRepository::new(pool)),
        }
    }
}

/// Creates the repository bundle for the configured backend
pub async fn create_repositories(backend: &StorageBackend) -> anyhow::Result<Repositories> {
    match backend {
        StorageBackend::InMemory => {
            info!("Using in-memory storage backend");
            Ok(Repositories::in_memory())
        }
        StorageBackend::PostgreSQL(config) => {
            info!(max_connections = config.max_connections, "Using PostgreSQL storage backend");
            let db = Database::connect(config).await?;
            Ok(Repositories::postgres(db.get_pool().clone()))
        }
    }
}

pub fn create_request_service(
    repositories: &Repositories,
    policy: LifecyclePolicy,
) -> Arc<dyn RequestService> {
    Arc::new(StandardRequestService::new(
        repositories.requests.clone(),
        repositories.audit.clone(),
        repositories.profiles.clone(),
        policy,
    ))
}

pub fn create_profile_service(repositories: &Repositories) -> Arc<dyn ProfileService> {
    Arc::new(StandardProfileService::new(repositories.profiles.clone()))
}
