// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Profile Repository
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements postgres customer profile persistence

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::profile::{CustomerProfile, DocumentType, ProfileId, SubjectId};
use crate::domain::repository::{ProfileRepository, RepositoryError};

const SELECT_COLUMNS: &str = r#"
    SELECT id, owner_subject, given_names, family_names, document_type, document_number,
           phone, birth_date, address, city, country, created_at
    FROM customer_profiles
"#;

pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn insert(&self, profile: &CustomerProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO customer_profiles (
                id, owner_subject, given_names, family_names, document_type, document_number,
                phone, birth_date, address, city, country, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(profile.id.0)
        .bind(profile.owner.as_str())
        .bind(&profile.given_names)
        .bind(&profile.family_names)
        .bind(profile.document_type.as_str())
        .bind(&profile.document_number)
        .bind(&profile.phone)
        .bind(profile.birth_date)
        .bind(&profile.address)
        .bind(&profile.city)
        .bind(&profile.country)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_owner(
        &self,
        owner: &SubjectId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE owner_subject = $1", SELECT_COLUMNS))
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(parse_profile_row).transpose()
    }

    async fn find_by_document(
        &self,
        document_number: &str,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE document_number = $1", SELECT_COLUMNS))
            .bind(document_number)
            .fetch_optional(&self.pool)
            .await?;

        row.map(parse_profile_row).transpose()
    }
}

fn parse_profile_row(row: PgRow) -> Result<CustomerProfile, RepositoryError> {
    let document_type: String = row.try_get("document_type")?;

    Ok(CustomerProfile {
        id: ProfileId(row.try_get("id")?),
        owner: SubjectId::new(row.try_get::<String, _>("owner_subject")?),
        given_names: row.try_get("given_names")?,
        family_names: row.try_get("family_names")?,
        document_type: DocumentType::from_code(&document_type).ok_or_else(|| {
            RepositoryError::Serialization(format!("unknown document type '{}'", document_type))
        })?,
        document_number: row.try_get("document_number")?,
        phone: row.try_get("phone")?,
        birth_date: row.try_get("birth_date")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        country: row.try_get("country")?,
        created_at: row.try_get("created_at")?,
    })
}
