// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Deposit Request Repository
//!
//! Stores `DepositRequest` rows and applies `LifecycleChange`s inside a
//! single transaction. Updates and deletes are guarded by
//! `WHERE id = $1 AND version = $2`; zero affected rows means another
//! writer got there first and the transaction is rolled back.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements postgres deposit request persistence

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::deposit::{DepositRequest, DepositRequestId, DepositState};
use crate::domain::profile::ProfileId;
use crate::domain::repository::{
    DepositRequestRepository, LifecycleChange, RepositoryError, RequestWrite,
};
use crate::infrastructure::repositories::postgres_audit::insert_record;

const SELECT_COLUMNS: &str = r#"
    SELECT id, profile_id, principal, term_months, interest_rate, state,
           rejection_reason, opened_at, created_at, updated_at, version
    FROM deposit_requests
"#;

/// Database code of a lifecycle state
pub(crate) fn state_code(state: DepositState) -> &'static str {
    match state {
        DepositState::Draft => "DRAFT",
        DepositState::Validating => "VALIDATING",
        DepositState::Approved => "APPROVED",
        DepositState::Rejected => "REJECTED",
        DepositState::Cancelled => "CANCELLED",
    }
}

pub(crate) fn state_from_code(code: &str) -> Result<DepositState, RepositoryError> {
    match code {
        "DRAFT" => Ok(DepositState::Draft),
        "VALIDATING" => Ok(DepositState::Validating),
        "APPROVED" => Ok(DepositState::Approved),
        "REJECTED" => Ok(DepositState::Rejected),
        "CANCELLED" => Ok(DepositState::Cancelled),
        other => Err(RepositoryError::Serialization(format!(
            "unknown deposit state code '{}'",
            other
        ))),
    }
}

pub struct PostgresDepositRequestRepository {
    pool: PgPool,
}

impl PostgresDepositRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepositRequestRepository for PostgresDepositRequestRepository {
    async fn commit(&self, change: LifecycleChange) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        match &change.write {
            RequestWrite::Insert(request) => {
                sqlx::query(
                    r#"
                    INSERT INTO deposit_requests (
                        id, profile_id, principal, term_months, interest_rate, state,
                        rejection_reason, opened_at, created_at, updated_at, version
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(request.id.0)
                .bind(request.owner.0)
                .bind(request.principal)
                .bind(request.term_months as i32)
                .bind(request.interest_rate)
                .bind(state_code(request.state))
                .bind(&request.rejection_reason)
                .bind(request.opened_at)
                .bind(request.created_at)
                .bind(request.updated_at)
                .bind(request.version)
                .execute(&mut *tx)
                .await?;
            }
            RequestWrite::Update { request, expected_version } => {
                let result = sqlx::query(
                    r#"
                    UPDATE deposit_requests SET
                        principal = $3,
                        term_months = $4,
                        interest_rate = $5,
                        state = $6,
                        rejection_reason = $7,
                        opened_at = $8,
                        updated_at = $9,
                        version = $10
                    WHERE id = $1 AND version = $2
                    "#,
                )
                .bind(request.id.0)
                .bind(*expected_version)
                .bind(request.principal)
                .bind(request.term_months as i32)
                .bind(request.interest_rate)
                .bind(state_code(request.state))
                .bind(&request.rejection_reason)
                .bind(request.opened_at)
                .bind(request.updated_at)
                .bind(request.version)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::Conflict {
                        id: request.id,
                        expected_version: *expected_version,
                    });
                }
            }
            RequestWrite::Delete { id, expected_version } => {
                let result =
                    sqlx::query("DELETE FROM deposit_requests WHERE id = $1 AND version = $2")
                        .bind(id.0)
                        .bind(*expected_version)
                        .execute(&mut *tx)
                        .await?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::Conflict {
                        id: *id,
                        expected_version: *expected_version,
                    });
                }
            }
        }

        for record in &change.audit {
            insert_record(&mut *tx, record).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: DepositRequestId,
        owner: ProfileId,
    ) -> Result<Option<DepositRequest>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = $1 AND profile_id = $2", SELECT_COLUMNS))
            .bind(id.0)
            .bind(owner.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(parse_request_row).transpose()
    }

    async fn find_by_id_unscoped(
        &self,
        id: DepositRequestId,
    ) -> Result<Option<DepositRequest>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(parse_request_row).transpose()
    }

    async fn find_all_for_owner(
        &self,
        owner: ProfileId,
    ) -> Result<Vec<DepositRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{} WHERE profile_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_request_row).collect()
    }

    async fn find_by_state(
        &self,
        state: DepositState,
    ) -> Result<Vec<DepositRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{} WHERE state = $1 ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))
        .bind(state_code(state))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_request_row).collect()
    }
}

fn parse_request_row(row: PgRow) -> Result<DepositRequest, RepositoryError> {
    let term_months: i32 = row.try_get("term_months")?;
    let state: String = row.try_get("state")?;

    Ok(DepositRequest {
        id: DepositRequestId(row.try_get("id")?),
        owner: ProfileId(row.try_get("profile_id")?),
        principal: row.try_get("principal")?,
        term_months: u32::try_from(term_months).map_err(|_| {
            RepositoryError::Serialization(format!("negative term_months {}", term_months))
        })?,
        interest_rate: row.try_get("interest_rate")?,
        state: state_from_code(&state)?,
        rejection_reason: row.try_get("rejection_reason")?,
        opened_at: row.try_get("opened_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
    })
}
