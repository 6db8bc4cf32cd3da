// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Audit Trail
//!
//! Append-only storage for `StateTransitionRecord`s. The table carries no
//! foreign key to `deposit_requests` and a trigger rejects UPDATE and DELETE.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements postgres audit trail

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgExecutor, Row};

use crate::domain::audit::{Actor, StateTransitionRecord, TransitionRecordId};
use crate::domain::deposit::DepositRequestId;
use crate::domain::profile::{Role, SubjectId};
use crate::domain::repository::{AuditTrail, RepositoryError};
use crate::infrastructure::repositories::postgres_deposit::{state_code, state_from_code};

/// Insert one record using any executor, so lifecycle commits can reuse it
/// inside their transaction.
pub(crate) async fn insert_record<'e, E>(
    executor: E,
    record: &StateTransitionRecord,
) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO state_transition_records (
            id, request_id, sequence, previous_state, new_state,
            note, actor_subject, actor_role, occurred_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(record.id.0)
    .bind(record.request_id.0)
    .bind(record.sequence)
    .bind(record.previous_state.map(state_code))
    .bind(state_code(record.new_state))
    .bind(&record.note)
    .bind(record.actor.subject.as_str())
    .bind(record.actor.role.as_str())
    .bind(record.occurred_at)
    .execute(executor)
    .await
    .map_err(|e| match RepositoryError::from(e) {
        RepositoryError::Duplicate(_) => RepositoryError::DuplicateRecord(record.id),
        other => other,
    })?;

    Ok(())
}

pub struct PostgresAuditTrail {
    pool: PgPool,
}

impl PostgresAuditTrail {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditTrail for PostgresAuditTrail {
    async fn append(&self, record: &StateTransitionRecord) -> Result<(), RepositoryError> {
        insert_record(&self.pool, record).await
    }

    async fn list_for(
        &self,
        request_id: DepositRequestId,
    ) -> Result<Vec<StateTransitionRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, request_id, sequence, previous_state, new_state,
                   note, actor_subject, actor_role, occurred_at
            FROM state_transition_records
            WHERE request_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_record_row).collect()
    }
}

fn parse_record_row(row: PgRow) -> Result<StateTransitionRecord, RepositoryError> {
    let previous: Option<String> = row.try_get("previous_state")?;
    let new_state: String = row.try_get("new_state")?;
    let role: String = row.try_get("actor_role")?;

    Ok(StateTransitionRecord {
        id: TransitionRecordId(row.try_get("id")?),
        request_id: DepositRequestId(row.try_get("request_id")?),
        sequence: row.try_get("sequence")?,
        previous_state: previous.as_deref().map(state_from_code).transpose()?,
        new_state: state_from_code(&new_state)?,
        note: row.try_get("note")?,
        actor: Actor {
            subject: SubjectId::new(row.try_get::<String, _>("actor_subject")?),
            role: role.parse::<Role>().map_err(RepositoryError::Serialization)?,
        },
        occurred_at: row.try_get("occurred_at")?,
    })
}
