// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Customer Profile & Caller Identity
//!
//! The caller identity is produced by the external auth collaborator and is
//! trusted as-is. A `Customer` subject owns at most one `CustomerProfile`;
//! `Agent` subjects never own one.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Identity value objects and the CustomerProfile aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub Uuid);

impl ProfileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque subject identifier issued by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(subject: impl Into<String>) -> Self {
        Self(subject.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Bank customer; sees only requests attached to their own profile
    Customer,
    /// Bank agent reviewing submitted requests
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Agent => "agent",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" | "cliente" => Ok(Self::Customer),
            "agent" | "agente" => Ok(Self::Agent),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Verified caller identity attached to every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub subject: SubjectId,
    pub role: Role,
}

impl CallerIdentity {
    pub fn customer(subject: impl Into<String>) -> Self {
        Self {
            subject: SubjectId::new(subject),
            role: Role::Customer,
        }
    }

    pub fn agent(subject: impl Into<String>) -> Self {
        Self {
            subject: SubjectId::new(subject),
            role: Role::Agent,
        }
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    /// Cédula de ciudadanía
    CC,
    /// Cédula de extranjería
    CE,
    Passport,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CC => "CC",
            Self::CE => "CE",
            Self::Passport => "PASSPORT",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CC" => Some(Self::CC),
            "CE" => Some(Self::CE),
            "PASSPORT" => Some(Self::Passport),
            _ => None,
        }
    }
}

impl Default for DocumentType {
    fn default() -> Self {
        Self::CC
    }
}

/// Registration payload for a new customer profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCustomerProfile {
    pub given_names: String,
    pub family_names: String,
    #[serde(default)]
    pub document_type: DocumentType,
    pub document_number: String,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("{0} cannot be empty")]
    MissingField(&'static str),
}

/// CustomerProfile aggregate root
///
/// Identity fields are fixed at registration; there is no mutation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: ProfileId,
    pub owner: SubjectId,
    pub given_names: String,
    pub family_names: String,
    pub document_type: DocumentType,
    pub document_number: String,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CustomerProfile {
    pub fn register(owner: SubjectId, input: NewCustomerProfile) -> Result<Self, ProfileError> {
        if owner.as_str().trim().is_empty() {
            return Err(ProfileError::MissingField("owner subject"));
        }
        if input.given_names.trim().is_empty() {
            return Err(ProfileError::MissingField("given names"));
        }
        if input.family_names.trim().is_empty() {
            return Err(ProfileError::MissingField("family names"));
        }
        if input.document_number.trim().is_empty() {
            return Err(ProfileError::MissingField("document number"));
        }

        Ok(Self {
            id: ProfileId::new(),
            owner,
            given_names: input.given_names.trim().to_string(),
            family_names: input.family_names.trim().to_string(),
            document_type: input.document_type,
            document_number: input.document_number.trim().to_string(),
            phone: input.phone.trim().to_string(),
            birth_date: input.birth_date,
            address: input.address,
            city: input.city,
            country: input.country,
            created_at: Utc::now(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_names, self.family_names)
    }
}
