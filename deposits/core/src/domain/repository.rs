// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root. As in the rest of the
//! crate, each aggregate has one repository. The interface is defined here in
//! the domain layer and implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `DepositRequestRepository` | `DepositRequest` | `InMemoryLifecycleStore`, `PostgresDepositRequestRepository` |
//! | `AuditTrail` | `StateTransitionRecord` | `InMemoryLifecycleStore`, `PostgresAuditTrail` |
//! | `ProfileRepository` | `CustomerProfile` | `InMemoryProfileRepository`, `PostgresProfileRepository` |
//!
//! ## Atomic lifecycle commits
//!
//! A request write and its audit record must persist together or not at all.
//! The repository therefore never exposes a bare `save`. Writes go through
//! `DepositRequestRepository::commit`, which takes a `LifecycleChange`: one
//! request write plus the audit records that accompany it. Updates and
//! deletes carry the version the caller read. If the stored version has
//! moved on, the commit fails with `RepositoryError::Conflict` and nothing is
//! written.

use async_trait::async_trait;

use crate::domain::audit::{StateTransitionRecord, TransitionRecordId};
use crate::domain::deposit::{DepositRequest, DepositRequestId, DepositState};
use crate::domain::profile::{CustomerProfile, ProfileId, SubjectId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// Request-side half of a lifecycle commit
#[derive(Debug, Clone, PartialEq)]
pub enum RequestWrite {
    /// First write of a new request
    Insert(DepositRequest),
    /// Replace the stored request if it is still at `expected_version`.
    /// `request.version` must already carry the next version.
    Update {
        request: DepositRequest,
        expected_version: i64,
    },
    /// Remove the request if it is still at `expected_version`
    Delete {
        id: DepositRequestId,
        expected_version: i64,
    },
}

/// Unit of work applied atomically by `DepositRequestRepository::commit`
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleChange {
    pub write: RequestWrite,
    pub audit: Vec<StateTransitionRecord>,
}

impl LifecycleChange {
    pub fn new(write: RequestWrite) -> Self {
        Self { write, audit: Vec::new() }
    }

    pub fn with_record(mut self, record: StateTransitionRecord) -> Self {
        self.audit.push(record);
        self
    }
}

/// Repository interface for DepositRequest aggregates
#[async_trait]
pub trait DepositRequestRepository: Send + Sync {
    /// Atomically apply a request write together with its audit records
    async fn commit(&self, change: LifecycleChange) -> Result<(), RepositoryError>;

    /// Find a request by ID, scoped to its owning profile.
    /// A request owned by someone else is reported as `None`.
    async fn find_by_id(
        &self,
        id: DepositRequestId,
        owner: ProfileId,
    ) -> Result<Option<DepositRequest>, RepositoryError>;

    /// Find a request by ID regardless of owner (agent review path)
    async fn find_by_id_unscoped(
        &self,
        id: DepositRequestId,
    ) -> Result<Option<DepositRequest>, RepositoryError>;

    /// All requests of one owner, newest first
    async fn find_all_for_owner(
        &self,
        owner: ProfileId,
    ) -> Result<Vec<DepositRequest>, RepositoryError>;

    /// All requests currently in `state`, oldest first
    async fn find_by_state(
        &self,
        state: DepositState,
    ) -> Result<Vec<DepositRequest>, RepositoryError>;
}

/// Write-once audit trail of state transitions.
/// No update or delete exists at this interface.
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Append one record. Duplicate record ids or (request, sequence) pairs are rejected.
    async fn append(&self, record: &StateTransitionRecord) -> Result<(), RepositoryError>;

    /// Records of one request in chronological order
    async fn list_for(
        &self,
        request_id: DepositRequestId,
    ) -> Result<Vec<StateTransitionRecord>, RepositoryError>;
}

/// Repository interface for CustomerProfile aggregates
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert a new profile. Fails with `Duplicate` if the subject or document is taken.
    async fn insert(&self, profile: &CustomerProfile) -> Result<(), RepositoryError>;

    async fn find_by_owner(
        &self,
        owner: &SubjectId,
    ) -> Result<Option<CustomerProfile>, RepositoryError>;

    async fn find_by_document(
        &self,
        document_number: &str,
    ) -> Result<Option<CustomerProfile>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Version conflict on request {id}: expected version {expected_version}")]
    Conflict {
        id: DepositRequestId,
        expected_version: i64,
    },

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Audit record {0:?} already exists")]
    DuplicateRecord(TransitionRecordId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Duplicate(db.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
