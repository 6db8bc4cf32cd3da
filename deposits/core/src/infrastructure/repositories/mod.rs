// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository contracts defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve domain aggregates
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresDepositRequestRepository** - Requests, with transactional lifecycle commits
//! - **PostgresAuditTrail** - Append-only state transition records
//! - **PostgresProfileRepository** - Customer profiles
//!
//! ## In-Memory Repositories
//!
//! Instance-scoped implementations for tests, demos and local development:
//! - **InMemoryLifecycleStore** - Requests and audit records behind one lock,
//!   implementing both `DepositRequestRepository` and `AuditTrail`
//! - **InMemoryProfileRepository** - Customer profiles

pub mod postgres_audit;
pub mod postgres_deposit;
pub mod postgres_profile;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::domain::audit::{StateTransitionRecord, TransitionRecordId};
use crate::domain::deposit::{DepositRequest, DepositRequestId, DepositState};
use crate::domain::profile::{CustomerProfile, ProfileId, SubjectId};
use crate::domain::repository::{
    AuditTrail, DepositRequestRepository, LifecycleChange, ProfileRepository, RepositoryError,
    RequestWrite,
};

#[derive(Default)]
struct LifecycleTables {
    requests: HashMap<DepositRequestId, DepositRequest>,
    audit: HashMap<DepositRequestId, Vec<StateTransitionRecord>>,
    record_ids: HashSet<TransitionRecordId>,
}

impl LifecycleTables {
    fn check_record(&self, record: &StateTransitionRecord) -> Result<(), RepositoryError> {
        let sequence_taken = self
            .audit
            .get(&record.request_id)
            .is_some_and(|trail| trail.iter().any(|r| r.sequence == record.sequence));
        if self.record_ids.contains(&record.id) || sequence_taken {
            return Err(RepositoryError::DuplicateRecord(record.id));
        }
        Ok(())
    }

    fn check_version(
        &self,
        id: DepositRequestId,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        match self.requests.get(&id) {
            Some(stored) if stored.version == expected_version => Ok(()),
            _ => Err(RepositoryError::Conflict { id, expected_version }),
        }
    }

    fn push_record(&mut self, record: StateTransitionRecord) {
        self.record_ids.insert(record.id);
        self.audit.entry(record.request_id).or_default().push(record);
    }
}

/// Requests and their audit trail behind a single mutex.
///
/// The lock is held only for the duration of one commit or lookup, so the
/// version check and the apply of a `LifecycleChange` are one atomic step.
#[derive(Clone, Default)]
pub struct InMemoryLifecycleStore {
    tables: Arc<Mutex<LifecycleTables>>,
}

impl InMemoryLifecycleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DepositRequestRepository for InMemoryLifecycleStore {
    async fn commit(&self, change: LifecycleChange) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock();

        match &change.write {
            RequestWrite::Insert(request) => {
                if tables.requests.contains_key(&request.id) {
                    return Err(RepositoryError::Duplicate(format!(
                        "deposit request {}",
                        request.id
                    )));
                }
            }
            RequestWrite::Update { request, expected_version } => {
                tables.check_version(request.id, *expected_version)?;
            }
            RequestWrite::Delete { id, expected_version } => {
                tables.check_version(*id, *expected_version)?;
            }
        }
        for record in &change.audit {
            tables.check_record(record)?;
        }

        match change.write {
            RequestWrite::Insert(request) | RequestWrite::Update { request, .. } => {
                tables.requests.insert(request.id, request);
            }
            RequestWrite::Delete { id, .. } => {
                tables.requests.remove(&id);
            }
        }
        for record in change.audit {
            tables.push_record(record);
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: DepositRequestId,
        owner: ProfileId,
    ) -> Result<Option<DepositRequest>, RepositoryError> {
        let tables = self.tables.lock();
        Ok(tables.requests.get(&id).filter(|r| r.owner == owner).cloned())
    }

    async fn find_by_id_unscoped(
        &self,
        id: DepositRequestId,
    ) -> Result<Option<DepositRequest>, RepositoryError> {
        let tables = self.tables.lock();
        Ok(tables.requests.get(&id).cloned())
    }

    async fn find_all_for_owner(
        &self,
        owner: ProfileId,
    ) -> Result<Vec<DepositRequest>, RepositoryError> {
        let tables = self.tables.lock();
        let mut requests: Vec<DepositRequest> = tables
            .requests
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn find_by_state(
        &self,
        state: DepositState,
    ) -> Result<Vec<DepositRequest>, RepositoryError> {
        let tables = self.tables.lock();
        let mut requests: Vec<DepositRequest> = tables
            .requests
            .values()
            .filter(|r| r.state == state)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(requests)
    }
}

#[async_trait]
impl AuditTrail for InMemoryLifecycleStore {
    async fn append(&self, record: &StateTransitionRecord) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock();
        tables.check_record(record)?;
        tables.push_record(record.clone());
        Ok(())
    }

    async fn list_for(
        &self,
        request_id: DepositRequestId,
    ) -> Result<Vec<StateTransitionRecord>, RepositoryError> {
        let tables = self.tables.lock();
        let mut records = tables.audit.get(&request_id).cloned().unwrap_or_default();
        records.sort_by_key(|r| r.sequence);
        Ok(records)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryProfileRepository {
    profiles: Arc<RwLock<HashMap<ProfileId, CustomerProfile>>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn insert(&self, profile: &CustomerProfile) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write();
        let taken = profiles.values().any(|p| {
            p.id == profile.id
                || p.owner == profile.owner
                || p.document_number == profile.document_number
        });
        if taken {
            return Err(RepositoryError::Duplicate(format!(
                "customer profile for {}",
                profile.owner
            )));
        }
        profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn find_by_owner(
        &self,
        owner: &SubjectId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let profiles = self.profiles.read();
        Ok(profiles.values().find(|p| &p.owner == owner).cloned())
    }

    async fn find_by_document(
        &self,
        document_number: &str,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let profiles = self.profiles.read();
        Ok(profiles
            .values()
            .find(|p| p.document_number == document_number)
            .cloned())
    }
}
