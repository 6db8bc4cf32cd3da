// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Profile Service
//!
//! Registers the single `CustomerProfile` a customer subject may own and
//! resolves it back for the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::application::request_service::{ErrorKind, ServiceError};
use crate::domain::profile::{CallerIdentity, CustomerProfile, NewCustomerProfile};
use crate::domain::repository::{ProfileRepository, RepositoryError};

#[async_trait]
pub trait ProfileService: Send + Sync {
    /// Register the caller's profile.
    ///
    /// # Errors
    ///
    /// - Validation: subject already registered, document taken, blank identity fields
    /// - Authorization: caller is an agent
    async fn register(
        &self,
        caller: &CallerIdentity,
        input: NewCustomerProfile,
    ) -> Result<CustomerProfile, ServiceError>;

    async fn get_profile(&self, caller: &CallerIdentity) -> Result<CustomerProfile, ServiceError>;
}

pub struct StandardProfileService {
    profiles: Arc<dyn ProfileRepository>,
}

impl StandardProfileService {
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl ProfileService for StandardProfileService {
    async fn register(
        &self,
        caller: &CallerIdentity,
        input: NewCustomerProfile,
    ) -> Result<CustomerProfile, ServiceError> {
        if caller.is_agent() {
            return Err(ServiceError::new(
                ErrorKind::Authorization,
                "Agents cannot own a customer profile",
            ));
        }

        let profile = CustomerProfile::register(caller.subject.clone(), input)
            .map_err(|e| ServiceError::new(ErrorKind::Validation, e.to_string()))?;

        if self.profiles.find_by_owner(&caller.subject).await?.is_some() {
            return Err(ServiceError::new(
                ErrorKind::Validation,
                format!("Subject '{}' already has a profile", caller.subject),
            ));
        }
        if self
            .profiles
            .find_by_document(&profile.document_number)
            .await?
            .is_some()
        {
            return Err(ServiceError::new(
                ErrorKind::Validation,
                "Document number is already registered",
            ));
        }

        // A concurrent registration can still win between the checks and the insert
        self.profiles.insert(&profile).await.map_err(|e| match e {
            RepositoryError::Duplicate(_) => {
                ServiceError::new(ErrorKind::Validation, "Profile already registered")
            }
            other => ServiceError::from(other),
        })?;

        info!(profile_id = %profile.id, subject = %caller.subject, "Customer profile registered");
        Ok(profile)
    }

    async fn get_profile(&self, caller: &CallerIdentity) -> Result<CustomerProfile, ServiceError> {
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
}
