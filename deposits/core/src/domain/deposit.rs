// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Deposit Request Aggregate
//!
//! A `DepositRequest` is a customer's application to open a time deposit
//! (CDT). It moves through a closed state machine:
//!
//! ```text
//! Draft ──► Validating ──► Approved
//!   │            ├───────► Rejected
//!   └────────────┴───────► Cancelled
//! ```
//!
//! `Approved`, `Rejected` and `Cancelled` are terminal. Field edits are only
//! accepted while the request is still a `Draft`.
//!
//! The aggregate only enforces invariants on itself; persistence, ownership
//! and audit recording are the responsibility of
//! `crate::application::lifecycle_engine::LifecycleEngine`.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** DepositRequest aggregate, lifecycle state machine, field rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::profile::ProfileId;

pub const MIN_TERM_MONTHS: u32 = 1;
pub const MAX_TERM_MONTHS: u32 = 60;

/// Lower bound of the annual interest rate, in percent (0.1)
pub fn min_interest_rate() -> Decimal {
    Decimal::new(1, 1)
}

/// Upper bound of the annual interest rate, in percent (20)
pub fn max_interest_rate() -> Decimal {
    Decimal::new(20, 0)
}

/// Default minimum principal accepted for a new deposit
pub fn default_minimum_principal() -> Decimal {
    Decimal::new(100_000, 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepositRequestId(pub Uuid);

impl DepositRequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for DepositRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DepositRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a deposit request (closed enumeration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositState {
    Draft,
    Validating,
    Approved,
    Rejected,
    Cancelled,
}

impl DepositState {
    pub const ALL: [DepositState; 5] = [
        Self::Draft,
        Self::Validating,
        Self::Approved,
        Self::Rejected,
        Self::Cancelled,
    ];

    /// The single legal transition table. Same-state pairs are never legal.
    pub fn can_transition_to(&self, target: DepositState) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Validating)
                | (Self::Validating, Self::Approved)
                | (Self::Validating, Self::Rejected)
                | (Self::Draft, Self::Cancelled)
                | (Self::Validating, Self::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }

    pub fn allows_field_edits(&self) -> bool {
        matches!(self, Self::Draft)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Validating => "validating",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DepositState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DepositState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown deposit state '{}'", s))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DepositError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Request is {state}; {operation} is only permitted in draft")]
    InvalidState {
        state: DepositState,
        operation: &'static str,
    },

    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition {
        from: DepositState,
        to: DepositState,
    },
}

/// Tunable domain policy; bounds that are fixed by product rules stay constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    pub minimum_principal: Decimal,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            minimum_principal: default_minimum_principal(),
        }
    }
}

impl LifecyclePolicy {
    pub fn check_principal(&self, principal: Decimal) -> Result<(), DepositError> {
        if principal <= Decimal::ZERO {
            return Err(DepositError::Validation(
                "principal must be greater than zero".to_string(),
            ));
        }
        if principal < self.minimum_principal {
            return Err(DepositError::Validation(format!(
                "principal {} is below the minimum of {}",
                principal, self.minimum_principal
            )));
        }
        Ok(())
    }

    pub fn check_term(&self, term_months: u32) -> Result<(), DepositError> {
        if !(MIN_TERM_MONTHS..=MAX_TERM_MONTHS).contains(&term_months) {
            return Err(DepositError::Validation(format!(
                "term must be between {} and {} months, got {}",
                MIN_TERM_MONTHS, MAX_TERM_MONTHS, term_months
            )));
        }
        Ok(())
    }

    pub fn check_interest_rate(&self, rate: Decimal) -> Result<(), DepositError> {
        if rate < min_interest_rate() || rate > max_interest_rate() {
            return Err(DepositError::Validation(format!(
                "interest rate must be between {} and {}, got {}",
                min_interest_rate(),
                max_interest_rate(),
                rate
            )));
        }
        Ok(())
    }
}

/// Creation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDepositRequest {
    pub principal: Decimal,
    pub term_months: u32,
    pub interest_rate: Decimal,
}

/// Partial update: only the fields present are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepositPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl DepositPatch {
    pub fn is_empty(&self) -> bool {
        self.principal.is_none()
            && self.term_months.is_none()
            && self.interest_rate.is_none()
            && self.rejection_reason.is_none()
    }
}

/// DepositRequest aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub id: DepositRequestId,
    pub owner: ProfileId,
    pub principal: Decimal,
    pub term_months: u32,
    pub interest_rate: Decimal,
    pub state: DepositState,
    pub rejection_reason: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token; bumped by every committed write
    pub version: i64,
}

impl DepositRequest {
    /// Create a new draft request (aggregate factory method)
    pub fn open(
        owner: ProfileId,
        input: NewDepositRequest,
        policy: &LifecyclePolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, DepositError> {
        policy.check_principal(input.principal)?;
        policy.check_term(input.term_months)?;
        policy.check_interest_rate(input.interest_rate)?;

        Ok(Self {
            id: DepositRequestId::new(),
            owner,
            principal: input.principal,
            term_months: input.term_months,
            interest_rate: input.interest_rate,
            state: DepositState::Draft,
            rejection_reason: None,
            opened_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    // ========================================================================
    // Aggregate Commands (State Mutations)
    // ========================================================================

    /// Apply a partial update. Either every present field is valid and applied,
    /// or nothing changes.
    pub fn apply_patch(
        &mut self,
        patch: &DepositPatch,
        policy: &LifecyclePolicy,
        now: DateTime<Utc>,
    ) -> Result<(), DepositError> {
        self.ensure_editable("field update")?;

        if let Some(principal) = patch.principal {
            policy.check_principal(principal)?;
        }
        if let Some(term) = patch.term_months {
            policy.check_term(term)?;
        }
        if let Some(rate) = patch.interest_rate {
            policy.check_interest_rate(rate)?;
        }
        if patch.rejection_reason.is_some() {
            // Only a transition into Rejected may carry a reason.
            return Err(DepositError::Validation(
                "rejection reason can only be set when rejecting the request".to_string(),
            ));
        }

        if let Some(principal) = patch.principal {
            self.principal = principal;
        }
        if let Some(term) = patch.term_months {
            self.term_months = term;
        }
        if let Some(rate) = patch.interest_rate {
            self.interest_rate = rate;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Move to `target`, returning the previous state.
    pub fn transition_to(
        &mut self,
        target: DepositState,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DepositState, DepositError> {
        let from = self.state;
        if !from.can_transition_to(target) {
            return Err(DepositError::IllegalTransition { from, to: target });
        }

        let reason = rejection_reason.map(str::trim).filter(|r| !r.is_empty());
        if target == DepositState::Rejected && reason.is_none() {
            return Err(DepositError::Validation(
                "a rejection reason is required to reject a request".to_string(),
            ));
        }

        self.state = target;
        self.rejection_reason = match target {
            DepositState::Rejected => reason.map(str::to_string),
            _ => None,
        };
        if target == DepositState::Approved && self.opened_at.is_none() {
            self.opened_at = Some(now);
        }
        self.updated_at = now;
        Ok(from)
    }

    pub fn ensure_editable(&self, operation: &'static str) -> Result<(), DepositError> {
        if !self.state.allows_field_edits() {
            return Err(DepositError::InvalidState {
                state: self.state,
                operation,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Aggregate Queries (State Inspection)
    // ========================================================================

    pub fn is_owned_by(&self, profile: ProfileId) -> bool {
        self.owner == profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> DepositRequest {
        DepositRequest::open(
            ProfileId::new(),
            NewDepositRequest {
                principal: Decimal::new(5_000_000, 0),
                term_months: 12,
                interest_rate: Decimal::new(85, 1),
            },
            &LifecyclePolicy::default(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_open_starts_in_draft_at_version_one() {
        let request = draft();
        assert_eq!(request.state, DepositState::Draft);
        assert_eq!(request.version, 1);
        assert!(request.opened_at.is_none());
        assert!(request.rejection_reason.is_none());
    }

    #[test]
    fn test_open_rejects_out_of_bounds_terms() {
        let policy = LifecyclePolicy::default();
        let base = NewDepositRequest {
            principal: Decimal::new(5_000_000, 0),
            term_months: 12,
            interest_rate: Decimal::new(85, 1),
        };

        let cases = [
            NewDepositRequest {
                principal: Decimal::new(50_000, 0),
                ..base.clone()
            },
            NewDepositRequest {
                principal: Decimal::ZERO,
                ..base.clone()
            },
            NewDepositRequest {
                term_months: 0,
                ..base.clone()
            },
            NewDepositRequest {
                term_months: 61,
                ..base.clone()
            },
            NewDepositRequest {
                interest_rate: Decimal::new(5, 2),
                ..base.clone()
            },
            NewDepositRequest {
                interest_rate: Decimal::new(201, 1),
                ..base.clone()
            },
        ];
        for input in cases {
            let result = DepositRequest::open(ProfileId::new(), input.clone(), &policy, Utc::now());
            assert!(
                matches!(result, Err(DepositError::Validation(_))),
                "expected validation error for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in DepositState::ALL {
            let has_exit = DepositState::ALL.iter().any(|to| from.can_transition_to(*to));
            assert_eq!(from.is_terminal(), !has_exit, "{}", from);
        }
    }

    #[test]
    fn test_transition_table() {
        use DepositState::*;
        let legal = [
            (Draft, Validating),
            (Validating, Approved),
            (Validating, Rejected),
            (Draft, Cancelled),
            (Validating, Cancelled),
        ];
        for from in DepositState::ALL {
            for to in DepositState::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_approval_sets_opened_at_once() {
        let mut request = draft();
        let now = Utc::now();
        request.transition_to(DepositState::Validating, None, now).unwrap();
        assert!(request.opened_at.is_none());

        let previous = request.transition_to(DepositState::Approved, None, now).unwrap();
        assert_eq!(previous, DepositState::Validating);
        assert_eq!(request.opened_at, Some(now));
    }

    #[test]
    fn test_rejection_requires_reason() {
        let mut request = draft();
        request.transition_to(DepositState::Validating, None, Utc::now()).unwrap();

        let err = request.transition_to(DepositState::Rejected, Some("   "), Utc::now());
        assert!(matches!(err, Err(DepositError::Validation(_))));
        assert_eq!(request.state, DepositState::Validating);

        request
            .transition_to(DepositState::Rejected, Some("insufficient income"), Utc::now())
            .unwrap();
        assert_eq!(request.rejection_reason.as_deref(), Some("insufficient income"));
    }

    #[test]
    fn test_reason_is_dropped_for_non_rejection_targets() {
        let mut request = draft();
        request
            .transition_to(DepositState::Validating, Some("ignored"), Utc::now())
            .unwrap();
        assert!(request.rejection_reason.is_none());
    }

    #[test]
    fn test_patch_is_all_or_nothing() {
        let mut request = draft();
        let before = request.clone();
        let patch = DepositPatch {
            principal: Some(Decimal::new(200_000, 0)),
            term_months: Some(99),
            ..Default::default()
        };
        assert!(request.apply_patch(&patch, &LifecyclePolicy::default(), Utc::now()).is_err());
        assert_eq!(request, before);
    }

    #[test]
    fn test_patch_rejected_outside_draft() {
        let mut request = draft();
        request.transition_to(DepositState::Validating, None, Utc::now()).unwrap();
        let patch = DepositPatch {
            term_months: Some(6),
            ..Default::default()
        };
        assert_eq!(
            request.apply_patch(&patch, &LifecyclePolicy::default(), Utc::now()),
            Err(DepositError::InvalidState {
                state: DepositState::Validating,
                operation: "field update",
            })
        );
    }

    #[test]
    fn test_state_parse_is_case_insensitive() {
        assert_eq!("APPROVED".parse::<DepositState>(), Ok(DepositState::Approved));
        assert!("aprobada".parse::<DepositState>().is_err());
    }
}
