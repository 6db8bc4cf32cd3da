// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Request Service
//!
//! Public entry point for deposit request operations.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Resolve the caller's profile, scope reads by owner,
//!   delegate invariants to `LifecycleEngine`, translate every failure into a
//!   `ServiceError`
//! - **Collaborators:**
//!   - Domain: `DepositRequest`, `CustomerProfile`, `StateTransitionRecord`
//!   - Infrastructure: `DepositRequestRepository`, `AuditTrail`, `ProfileRepository`
//!
//! Requests owned by another customer are indistinguishable from requests
//! that do not exist: both produce `ErrorKind::NotFound`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::application::lifecycle_engine::{EngineError, LifecycleEngine, TransitionCommand};
use crate::domain::audit::{self, AuditError, LifecycleHistory, StateTransitionRecord};
use crate::domain::deposit::{
    DepositPatch, DepositRequest, DepositRequestId, DepositState, LifecyclePolicy,
    NewDepositRequest,
};
use crate::domain::profile::{CallerIdentity, CustomerProfile};
use crate::domain::repository::{
    AuditTrail, DepositRequestRepository, ProfileRepository, RepositoryError,
};

/// Error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    /// Role-based refusal (ownership failures surface as `NotFound`)
    Authorization,
    IllegalTransition {
        from: DepositState,
        to: DepositState,
    },
    InvalidState,
    NotFound,
    ConcurrencyConflict,
    ProfileNotFound,
    StorageUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(id: DepositRequestId) -> Self {
        Self::new(ErrorKind::NotFound, format!("Deposit request {} not found", id))
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(message) => ServiceError::new(ErrorKind::Validation, message),
            // Ownership is never revealed
            EngineError::Authorization { request_id, .. } => ServiceError::not_found(request_id),
            EngineError::IllegalTransition { from, to } => ServiceError::new(
                ErrorKind::IllegalTransition { from, to },
                format!("Illegal transition from {} to {}", from, to),
            ),
            e @ EngineError::InvalidState { .. } => {
                ServiceError::new(ErrorKind::InvalidState, e.to_string())
            }
            e @ EngineError::ConcurrencyConflict(_) => {
                ServiceError::new(ErrorKind::ConcurrencyConflict, e.to_string())
            }
            EngineError::Repository(e) => ServiceError::from(e),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { id, .. } => ServiceError::new(
                ErrorKind::ConcurrencyConflict,
                format!("Request {} was modified concurrently", id),
            ),
            other => {
                error!(error = %other, "Storage operation failed");
                ServiceError::new(ErrorKind::StorageUnavailable, "Storage is unavailable")
            }
        }
    }
}

/// Per-owner dashboard figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total: usize,
    pub by_state: BTreeMap<DepositState, usize>,
    /// Sum of principal across approved requests
    pub approved_principal: Decimal,
}

impl PortfolioSummary {
    pub fn from_requests(requests: &[DepositRequest]) -> Self {
        let mut by_state: BTreeMap<DepositState, usize> =
            DepositState::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut approved_principal = Decimal::ZERO;

        for request in requests {
            *by_state.entry(request.state).or_insert(0) += 1;
            if request.state == DepositState::Approved {
                approved_principal += request.principal;
            }
        }

        Self {
            total: requests.len(),
            by_state,
            approved_principal,
        }
    }

    pub fn count(&self, state: DepositState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Deposit request use cases
#[async_trait]
pub trait RequestService: Send + Sync {
    async fn create(
        &self,
        caller: &CallerIdentity,
        input: NewDepositRequest,
    ) -> Result<DepositRequest, ServiceError>;

    async fn get(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<DepositRequest, ServiceError>;

    /// Caller's requests, newest first
    async fn list_for_owner(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<DepositRequest>, ServiceError>;

    async fn mutate_fields(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
        patch: DepositPatch,
    ) -> Result<DepositRequest, ServiceError>;

    async fn transition(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
        command: TransitionCommand,
    ) -> Result<DepositRequest, ServiceError>;

    async fn delete(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<(), ServiceError>;

    /// Audit records of a live request, chronological
    async fn history(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<Vec<StateTransitionRecord>, ServiceError>;

    async fn summary(&self, caller: &CallerIdentity) -> Result<PortfolioSummary, ServiceError>;

    /// Agent only: every request awaiting review, oldest first
    async fn list_pending_review(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<DepositRequest>, ServiceError>;

    /// Agent only: verified lifecycle rebuilt from the audit trail,
    /// available after the request has been deleted
    async fn audit_history(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<LifecycleHistory, ServiceError>;
}

pub struct StandardRequestService {
    engine: LifecycleEngine,
    requests: Arc<dyn DepositRequestRepository>,
    audit: Arc<dyn AuditTrail>,
    profiles: Arc<dyn ProfileRepository>,
}

impl StandardRequestService {
    pub fn new(
        requests: Arc<dyn DepositRequestRepository>,
        audit: Arc<dyn AuditTrail>,
        profiles: Arc<dyn ProfileRepository>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            engine: LifecycleEngine::new(requests.clone(), policy),
            requests,
            audit,
            profiles,
        }
    }

    async fn resolve_profile(
        &self,
        caller: &CallerIdentity,
    ) -> Result<CustomerProfile, ServiceError> {
        self.profiles
            .find_by_owner(&caller.subject)
            .await?
            .ok_or_else(|| {
                ServiceError::new(
                    ErrorKind::ProfileNotFound,
                    format!("No customer profile registered for '{}'", caller.subject),
                )
            })
    }

    /// Load a request as the caller may see it. Agents see every request,
    /// customers only their own.
    async fn load_visible(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<(DepositRequest, Option<CustomerProfile>), ServiceError> {
        if caller.is_agent() {
            let request = self
                .requests
                .find_by_id_unscoped(id)
                .await?
                .ok_or_else(|| ServiceError::not_found(id))?;
            return Ok((request, None));
        }

        let profile = self.resolve_profile(caller).await?;
        let request = self
            .requests
            .find_by_id(id, profile.id)
            .await?
            .ok_or_else(|| ServiceError::not_found(id))?;
        Ok((request, Some(profile)))
    }

    async fn load_owned(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<(DepositRequest, CustomerProfile), ServiceError> {
        let profile = self.resolve_profile(caller).await?;
        let request = self
            .requests
            .find_by_id(id, profile.id)
            .await?
            .ok_or_else(|| ServiceError::not_found(id))?;
        Ok((request, profile))
    }

    fn require_agent(caller: &CallerIdentity, operation: &str) -> Result<(), ServiceError> {
        if !caller.is_agent() {
            return Err(ServiceError::new(
                ErrorKind::Authorization,
                format!("{} is restricted to agents", operation),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RequestService for StandardRequestService {
    async fn create(
        &self,
        caller: &CallerIdentity,
        input: NewDepositRequest,
    ) -> Result<DepositRequest, ServiceError> {
        let profile = self.resolve_profile(caller).await?;
        Ok(self.engine.create(&profile, caller, input).await?)
    }

    async fn get(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<DepositRequest, ServiceError> {
        let (request, _) = self.load_visible(caller, id).await?;
        Ok(request)
    }

    async fn list_for_owner(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<DepositRequest>, ServiceError> {
        let profile = self.resolve_profile(caller).await?;
        Ok(self.requests.find_all_for_owner(profile.id).await?)
    }

    async fn mutate_fields(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
        patch: DepositPatch,
    ) -> Result<DepositRequest, ServiceError> {
        let (request, profile) = self.load_owned(caller, id).await?;
        Ok(self.engine.mutate_fields(request, &profile, &patch).await?)
    }

    async fn transition(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
        command: TransitionCommand,
    ) -> Result<DepositRequest, ServiceError> {
        let (request, profile) = self.load_visible(caller, id).await?;
        Ok(self
            .engine
            .transition(request, caller, profile.as_ref(), &command)
            .await?)
    }

    async fn delete(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<(), ServiceError> {
        let (request, profile) = self.load_owned(caller, id).await?;
        Ok(self.engine.delete(request, &profile).await?)
    }

    async fn history(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<Vec<StateTransitionRecord>, ServiceError> {
        self.load_visible(caller, id).await?;
        Ok(self.audit.list_for(id).await?)
    }

    async fn summary(&self, caller: &CallerIdentity) -> Result<PortfolioSummary, ServiceError> {
        let requests = self.list_for_owner(caller).await?;
        Ok(PortfolioSummary::from_requests(&requests))
    }

    async fn list_pending_review(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<DepositRequest>, ServiceError> {
        Self::require_agent(caller, "Review queue")?;
        let pending = self.requests.find_by_state(DepositState::Validating).await?;
        debug!(count = pending.len(), "Loaded pending review queue");
        Ok(pending)
    }

    async fn audit_history(
        &self,
        caller: &CallerIdentity,
        id: DepositRequestId,
    ) -> Result<LifecycleHistory, ServiceError> {
        Self::require_agent(caller, "Audit replay")?;
        let records = self.audit.list_for(id).await?;
        audit::replay(&records).map_err(|e| match e {
            AuditError::Empty => ServiceError::not_found(id),
            other => {
                error!(request_id = %id, error = %other, "Audit trail failed verification");
                ServiceError::new(
                    ErrorKind::InvalidState,
                    format!("Audit trail of request {} is inconsistent: {}", id, other),
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_and_approved_total() {
        let policy = LifecyclePolicy::default();
        let owner = crate::domain::profile::ProfileId::new();
        let open = |principal: i64| {
            DepositRequest::open(
                owner,
                NewDepositRequest {
                    principal: Decimal::new(principal, 0),
                    term_months: 12,
                    interest_rate: Decimal::new(85, 1),
                },
                &policy,
                chrono::Utc::now(),
            )
            .unwrap()
        };

        let mut approved = open(5_000_000);
        approved.state = DepositState::Approved;
        let mut rejected = open(2_000_000);
        rejected.state = DepositState::Rejected;
        let draft = open(1_000_000);

        let summary = PortfolioSummary::from_requests(&[approved, rejected, draft]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.count(DepositState::Approved), 1);
        assert_eq!(summary.count(DepositState::Validating), 0);
        assert_eq!(summary.approved_principal, Decimal::new(5_000_000, 0));
    }

    #[test]
    fn test_ownership_failures_surface_as_not_found() {
        let id = DepositRequestId::new();
        let err = ServiceError::from(EngineError::Authorization {
            request_id: id,
            operation: "update",
        });
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_storage_errors_are_not_leaked() {
        let err = ServiceError::from(RepositoryError::Database(
            "connection refused to 10.0.0.5".into(),
        ));
        assert_eq!(err.kind, ErrorKind::StorageUnavailable);
        assert!(!err.message.contains("10.0.0.5"));
    }
}
