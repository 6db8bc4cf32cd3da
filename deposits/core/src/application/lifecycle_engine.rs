// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lifecycle Engine
//!
//! The only writer of `DepositRequest::state` and the only creator of
//! `StateTransitionRecord`s. Every mutating operation:
//!
//! 1. checks the caller against the request owner,
//! 2. applies the change to the aggregate (which enforces field bounds and
//!    the transition table),
//! 3. bumps the optimistic concurrency version,
//! 4. commits the request write together with its audit record through
//!    `DepositRequestRepository::commit`.
//!
//! A failure at any step leaves both the request and its trail untouched.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Enforce the lifecycle state machine, ownership and mutability rules
//! - **Collaborators:** `DepositRequestRepository` (atomic commit)

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::audit::{Actor, StateTransitionRecord, DEFAULT_TRANSITION_NOTE};
use crate::domain::deposit::{
    DepositError, DepositPatch, DepositRequest, DepositRequestId, DepositState, LifecyclePolicy,
    NewDepositRequest,
};
use crate::domain::profile::{CallerIdentity, CustomerProfile};
use crate::domain::repository::{
    DepositRequestRepository, LifecycleChange, RepositoryError, RequestWrite,
};

/// Requested state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommand {
    pub target: DepositState,
    /// Free-text note for the audit record
    pub note: Option<String>,
    /// Required when `target` is `Rejected`
    pub rejection_reason: Option<String>,
}

impl TransitionCommand {
    pub fn to(target: DepositState) -> Self {
        Self {
            target,
            note: None,
            rejection_reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            target: DepositState::Rejected,
            note: None,
            rejection_reason: Some(reason.into()),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Audit note: explicit note, else the rejection reason when rejecting,
    /// else the default
    fn audit_note(&self) -> String {
        let reason = match self.target {
            DepositState::Rejected => self.rejection_reason.as_deref(),
            _ => None,
        };
        [self.note.as_deref(), reason]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
            .unwrap_or(DEFAULT_TRANSITION_NOTE)
            .to_string()
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("Caller is not allowed to {operation} request {request_id}")]
    Authorization {
        request_id: DepositRequestId,
        operation: &'static str,
    },

    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition {
        from: DepositState,
        to: DepositState,
    },

    #[error("Request is {state}; {operation} is only permitted in draft")]
    InvalidState {
        state: DepositState,
        operation: &'static str,
    },

    #[error("Request {0} was modified concurrently")]
    ConcurrencyConflict(DepositRequestId),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<DepositError> for EngineError {
    fn from(err: DepositError) -> Self {
        match err {
            DepositError::Validation(message) => EngineError::Validation(message),
            DepositError::InvalidState { state, operation } => {
                EngineError::InvalidState { state, operation }
            }
            DepositError::IllegalTransition { from, to } => {
                EngineError::IllegalTransition { from, to }
            }
        }
    }
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { id, .. } => {
                metrics::counter!("neocdt_concurrency_conflicts_total").increment(1);
                EngineError::ConcurrencyConflict(id)
            }
            other => EngineError::Repository(other),
        }
    }
}

pub struct LifecycleEngine {
    repository: Arc<dyn DepositRequestRepository>,
    policy: LifecyclePolicy,
}

impl LifecycleEngine {
    pub fn new(repository: Arc<dyn DepositRequestRepository>, policy: LifecyclePolicy) -> Self {
        Self { repository, policy }
    }

    /// Open a new draft request for `owner` and record `null -> Draft`.
    pub async fn create(
        &self,
        owner: &CustomerProfile,
        caller: &CallerIdentity,
        input: NewDepositRequest,
    ) -> Result<DepositRequest, EngineError> {
        let now = Utc::now();
        let request = DepositRequest::open(owner.id, input, &self.policy, now)?;
        let record =
            StateTransitionRecord::creation(request.id, request.version, Actor::from(caller), now);

        self.repository
            .commit(LifecycleChange::new(RequestWrite::Insert(request.clone())).with_record(record))
            .await?;

        metrics::counter!("neocdt_requests_created_total").increment(1);
        info!(
            request_id = %request.id,
            owner = %owner.id,
            principal = %request.principal,
            term_months = request.term_months,
            "Deposit request created"
        );
        Ok(request)
    }

    /// Apply a partial field update to a draft owned by `owner`.
    /// An empty patch returns the request unchanged without writing.
    pub async fn mutate_fields(
        &self,
        mut request: DepositRequest,
        owner: &CustomerProfile,
        patch: &DepositPatch,
    ) -> Result<DepositRequest, EngineError> {
        self.ensure_owner(&request, owner, "update")?;
        request.ensure_editable("field update")?;

        if patch.is_empty() {
            debug!(request_id = %request.id, "Empty patch; nothing to write");
            return Ok(request);
        }

        let expected_version = request.version;
        request.apply_patch(patch, &self.policy, Utc::now())?;
        request.version = expected_version + 1;

        self.repository
            .commit(LifecycleChange::new(RequestWrite::Update {
                request: request.clone(),
                expected_version,
            }))
            .await?;

        info!(
            request_id = %request.id,
            version = request.version,
            "Deposit request fields updated"
        );
        Ok(request)
    }

    /// Move `request` to `command.target` on behalf of its owner or an agent.
    pub async fn transition(
        &self,
        mut request: DepositRequest,
        caller: &CallerIdentity,
        caller_profile: Option<&CustomerProfile>,
        command: &TransitionCommand,
    ) -> Result<DepositRequest, EngineError> {
        if !caller.is_agent() {
            match caller_profile {
                Some(profile) => self.ensure_owner(&request, profile, "transition")?,
                None => {
                    return Err(EngineError::Authorization {
                        request_id: request.id,
                        operation: "transition",
                    })
                }
            }
        }

        let now = Utc::now();
        let expected_version = request.version;
        let from = request
            .transition_to(command.target, command.rejection_reason.as_deref(), now)
            .map_err(|e| {
                warn!(request_id = %request.id, error = %e, "Transition refused");
                EngineError::from(e)
            })?;
        request.version = expected_version + 1;

        let record = StateTransitionRecord::transition(
            request.id,
            request.version,
            from,
            request.state,
            command.audit_note(),
            Actor::from(caller),
            now,
        );

        self.repository
            .commit(
                LifecycleChange::new(RequestWrite::Update {
                    request: request.clone(),
                    expected_version,
                })
                .with_record(record),
            )
            .await?;

        metrics::counter!(
            "neocdt_transitions_total",
            "from" => from.as_str(),
            "to" => request.state.as_str()
        )
        .increment(1);
        info!(
            request_id = %request.id,
            from = %from,
            to = %request.state,
            actor = %caller.subject,
            role = caller.role.as_str(),
            "Deposit request transitioned"
        );
        Ok(request)
    }

    /// Remove a draft owned by `owner`. Its audit records are kept.
    pub async fn delete(
        &self,
        request: DepositRequest,
        owner: &CustomerProfile,
    ) -> Result<(), EngineError> {
        self.ensure_owner(&request, owner, "delete")?;
        request.ensure_editable("delete")?;

        self.repository
            .commit(LifecycleChange::new(RequestWrite::Delete {
                id: request.id,
                expected_version: request.version,
            }))
            .await?;

        info!(request_id = %request.id, "Deposit request deleted");
        Ok(())
    }

    fn ensure_owner(
        &self,
        request: &DepositRequest,
        owner: &CustomerProfile,
        operation: &'static str,
    ) -> Result<(), EngineError> {
        if !request.is_owned_by(owner.id) {
            return Err(EngineError::Authorization {
                request_id: request.id,
                operation,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::{NewCustomerProfile, SubjectId};
    use crate::domain::repository::AuditTrail;
    use crate::infrastructure::repositories::InMemoryLifecycleStore;
    use rust_decimal::Decimal;

    fn profile(subject: &str, document: &str) -> CustomerProfile {
        CustomerProfile::register(
            SubjectId::new(subject),
            NewCustomerProfile {
                given_names: "Juan".to_string(),
                family_names: "Pérez".to_string(),
                document_number: document.to_string(),
                phone: "3001234567".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn input() -> NewDepositRequest {
        NewDepositRequest {
            principal: Decimal::new(5_000_000, 0),
            term_months: 12,
            interest_rate: Decimal::new(85, 1),
        }
    }

    fn engine() -> (LifecycleEngine, Arc<InMemoryLifecycleStore>) {
        let store = Arc::new(InMemoryLifecycleStore::new());
        (LifecycleEngine::new(store.clone(), LifecyclePolicy::default()), store)
    }

    #[tokio::test]
    async fn test_create_writes_creation_record() {
        let (engine, store) = engine();
        let juan = profile("juan", "1");
        let caller = CallerIdentity::customer("juan");

        let request = engine.create(&juan, &caller, input()).await.unwrap();
        let trail = store.list_for(request.id).await.unwrap();

        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].previous_state, None);
        assert_eq!(trail[0].new_state, DepositState::Draft);
        assert_eq!(trail[0].sequence, 1);
        assert_eq!(trail[0].actor.subject, caller.subject);
    }

    #[tokio::test]
    async fn test_transition_bumps_version_and_records_note() {
        let (engine, store) = engine();
        let juan = profile("juan", "1");
        let caller = CallerIdentity::customer("juan");
        let request = engine.create(&juan, &caller, input()).await.unwrap();

        let request = engine
            .transition(
                request,
                &caller,
                Some(&juan),
                &TransitionCommand::to(DepositState::Validating),
            )
            .await
            .unwrap();
        assert_eq!(request.version, 2);

        let agent = CallerIdentity::agent("agente");
        let request = engine
            .transition(
                request,
                &agent,
                None,
                &TransitionCommand::reject("income not verified"),
            )
            .await
            .unwrap();
        assert_eq!(request.state, DepositState::Rejected);

        let trail = store.list_for(request.id).await.unwrap();
        assert_eq!(trail.len(), 3);
        assert_eq!(trail[1].note, DEFAULT_TRANSITION_NOTE);
        assert_eq!(trail[2].note, "income not verified");
        assert_eq!(trail[2].sequence, 3);
    }

    #[tokio::test]
    async fn test_non_owner_cannot_mutate() {
        let (engine, _) = engine();
        let juan = profile("juan", "1");
        let maria = profile("maria", "2");
        let request = engine
            .create(&juan, &CallerIdentity::customer("juan"), input())
            .await
            .unwrap();

        let patch = DepositPatch {
            term_months: Some(6),
            ..Default::default()
        };
        let err = engine
            .mutate_fields(request, &maria, &patch)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Authorization {
                operation: "update",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_stale_copy_loses_with_conflict() {
        let (engine, _) = engine();
        let juan = profile("juan", "1");
        let caller = CallerIdentity::customer("juan");
        let request = engine.create(&juan, &caller, input()).await.unwrap();
        let stale = request.clone();

        engine
            .transition(
                request,
                &caller,
                Some(&juan),
                &TransitionCommand::to(DepositState::Validating),
            )
            .await
            .unwrap();

        let err = engine
            .transition(
                stale,
                &caller,
                Some(&juan),
                &TransitionCommand::to(DepositState::Cancelled),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ConcurrencyConflict(_)));
    }

    #[test]
    fn test_audit_note_precedence() {
        assert_eq!(
            TransitionCommand::to(DepositState::Approved).audit_note(),
            DEFAULT_TRANSITION_NOTE
        );
        assert_eq!(
            TransitionCommand::reject("low score").audit_note(),
            "low score"
        );
        assert_eq!(
            TransitionCommand::reject("low score")
                .with_note("reviewed by risk")
                .audit_note(),
            "reviewed by risk"
        );
    }

    #[tokio::test]
    async fn test_stray_reason_does_not_become_audit_note() {
        let (engine, store) = engine();
        let juan = profile("juan", "1");
        let caller = CallerIdentity::customer("juan");
        let request = engine.create(&juan, &caller, input()).await.unwrap();

        let command = TransitionCommand {
            target: DepositState::Validating,
            note: None,
            rejection_reason: Some("left over from a form".to_string()),
        };
        let request = engine
            .transition(request, &caller, Some(&juan), &command)
            .await
            .unwrap();
        assert_eq!(request.rejection_reason, None);

        let trail = store.list_for(request.id).await.unwrap();
        assert_eq!(trail[1].new_state, DepositState::Validating);
        assert_eq!(trail[1].note, DEFAULT_TRANSITION_NOTE);
    }
}
