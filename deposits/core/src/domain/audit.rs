// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # State Transition Audit Records
//!
//! Every lifecycle change of a `DepositRequest` produces exactly one
//! `StateTransitionRecord`. Records are write-once: once appended they are
//! never updated or removed, and they outlive the request they describe.
//!
//! `replay` rebuilds a request's lifecycle from its records alone, so an
//! external reviewer can prove when, and by whom, each transition happened
//! without trusting the current request row.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Audit record value object and lifecycle reconstruction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::deposit::{DepositRequestId, DepositState};
use crate::domain::profile::{CallerIdentity, Role, SubjectId};

pub const CREATION_NOTE: &str = "Request created";
pub const DEFAULT_TRANSITION_NOTE: &str = "State updated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionRecordId(pub Uuid);

impl TransitionRecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransitionRecordId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who caused a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub subject: SubjectId,
    pub role: Role,
}

impl From<&CallerIdentity> for Actor {
    fn from(identity: &CallerIdentity) -> Self {
        Self {
            subject: identity.subject.clone(),
            role: identity.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransitionRecord {
    pub id: TransitionRecordId,
    pub request_id: DepositRequestId,
    /// Request version this record was committed with; strictly increasing per request
    pub sequence: i64,
    pub previous_state: Option<DepositState>,
    pub new_state: DepositState,
    pub note: String,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

impl StateTransitionRecord {
    pub fn creation(
        request_id: DepositRequestId,
        sequence: i64,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransitionRecordId::new(),
            request_id,
            sequence,
            previous_state: None,
            new_state: DepositState::Draft,
            note: CREATION_NOTE.to_string(),
            actor,
            occurred_at,
        }
    }

    pub fn transition(
        request_id: DepositRequestId,
        sequence: i64,
        from: DepositState,
        to: DepositState,
        note: String,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransitionRecordId::new(),
            request_id,
            sequence,
            previous_state: Some(from),
            new_state: to,
            note,
            actor,
            occurred_at,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("No audit records for request")]
    Empty,

    #[error("Audit trail mixes records of several requests")]
    MixedRequests,

    #[error("First record must be a creation into draft (record {sequence})")]
    MissingCreation { sequence: i64 },

    #[error("Record {sequence} starts from {found:?} but the trail was at {expected}")]
    BrokenChain {
        sequence: i64,
        expected: DepositState,
        found: Option<DepositState>,
    },

    #[error("Record {sequence} is an illegal transition {from} -> {to}")]
    IllegalHop {
        sequence: i64,
        from: DepositState,
        to: DepositState,
    },

    #[error("Record sequence {sequence} does not increase")]
    OutOfOrder { sequence: i64 },
}

/// One entry of a reconstructed lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStep {
    pub state: DepositState,
    pub entered_at: DateTime<Utc>,
    pub entered_by: Actor,
    pub note: String,
}

/// Lifecycle rebuilt from an audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleHistory {
    pub request_id: DepositRequestId,
    pub steps: Vec<LifecycleStep>,
}

impl LifecycleHistory {
    pub fn current_state(&self) -> DepositState {
        self.steps
            .last()
            .map(|s| s.state)
            .unwrap_or(DepositState::Draft)
    }

    /// When the request entered `state`, if it ever did
    pub fn entered(&self, state: DepositState) -> Option<&LifecycleStep> {
        self.steps.iter().find(|s| s.state == state)
    }
}

/// Rebuild and verify a lifecycle from its records (in chronological order).
pub fn replay(records: &[StateTransitionRecord]) -> Result<LifecycleHistory, AuditError> {
    let first = records.first().ok_or(AuditError::Empty)?;
    if first.previous_state.is_some() || first.new_state != DepositState::Draft {
        return Err(AuditError::MissingCreation { sequence: first.sequence });
    }

    let request_id = first.request_id;
    let mut steps = Vec::with_capacity(records.len());
    let mut current = first.new_state;
    let mut last_sequence = first.sequence;
    steps.push(step_from(first));

    for record in &records[1..] {
        if record.request_id != request_id {
            return Err(AuditError::MixedRequests);
        }
        if record.sequence <= last_sequence {
            return Err(AuditError::OutOfOrder { sequence: record.sequence });
        }
        if record.previous_state != Some(current) {
            return Err(AuditError::BrokenChain {
                sequence: record.sequence,
                expected: current,
                found: record.previous_state,
            });
        }
        if !current.can_transition_to(record.new_state) {
            return Err(AuditError::IllegalHop {
                sequence: record.sequence,
                from: current,
                to: record.new_state,
            });
        }
        current = record.new_state;
        last_sequence = record.sequence;
        steps.push(step_from(record));
    }

    Ok(LifecycleHistory { request_id, steps })
}

fn step_from(record: &StateTransitionRecord) -> LifecycleStep {
    LifecycleStep {
        state: record.new_state,
        entered_at: record.occurred_at,
        entered_by: record.actor.clone(),
        note: record.note.clone(),
    }
}
