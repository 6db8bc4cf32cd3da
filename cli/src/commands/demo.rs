// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Walkthrough of the request lifecycle against in-memory storage.
//!
//! Seeds two customers and one agent, then runs the approval, minimum
//! principal, rejection and delete-guard flows end to end.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use rust_decimal::Decimal;
use std::fmt::Debug;
use std::path::PathBuf;

use neocdt_core::application::lifecycle_engine::TransitionCommand;
use neocdt_core::application::repository_factory::{
    create_profile_service, create_request_service, Repositories,
};
use neocdt_core::application::request_service::{ErrorKind, RequestService, ServiceError};
use neocdt_core::domain::config::ServiceConfig;
use neocdt_core::domain::deposit::{DepositPatch, DepositState, NewDepositRequest};
use neocdt_core::domain::profile::{CallerIdentity, DocumentType, NewCustomerProfile};
use neocdt_core::domain::repository::AuditTrail;

use crate::output::{print_history, print_records, print_request, print_summary};

pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = ServiceConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;
    let repositories = Repositories::in_memory();
    let requests = create_request_service(&repositories, config.lifecycle_policy());
    let profiles = create_profile_service(&repositories);

    let juan = CallerIdentity::customer("juan");
    let maria = CallerIdentity::customer("maria");
    let agent = CallerIdentity::agent("agente");

    profiles
        .register(
            &juan,
            NewCustomerProfile {
                given_names: "Juan Carlos".to_string(),
                family_names: "Pérez González".to_string(),
                document_type: DocumentType::CC,
                document_number: "1234567890".to_string(),
                phone: "3216549870".to_string(),
                city: Some("Bogotá".to_string()),
                country: Some("Colombia".to_string()),
                ..Default::default()
            },
        )
        .await?;
    profiles
        .register(
            &maria,
            NewCustomerProfile {
                given_names: "María Fernanda".to_string(),
                family_names: "López Martínez".to_string(),
                document_type: DocumentType::CC,
                document_number: "9876543210".to_string(),
                phone: "3109876543".to_string(),
                city: Some("Medellín".to_string()),
                country: Some("Colombia".to_string()),
                ..Default::default()
            },
        )
        .await?;
    println!("{}", "✓ Seeded profiles: juan, maria (agent: agente)".green());
    println!();

    // A: draft -> validating -> approved
    heading("Approval");
    let request = requests.create(&juan, new_request(5_000_000)).await?;
    requests
        .transition(&juan, request.id, TransitionCommand::to(DepositState::Validating))
        .await?;
    let approved = requests
        .transition(
            &agent,
            request.id,
            TransitionCommand::to(DepositState::Approved).with_note("ok"),
        )
        .await?;
    print_request(&approved);
    print_records(&requests.history(&juan, request.id).await?);
    println!();

    // B: below minimum principal
    heading("Minimum principal");
    expect_failure(
        "create with principal 50.000",
        requests.create(&juan, new_request(50_000)).await,
        ErrorKind::Validation,
    )?;
    println!();

    // C: rejection requires a reason, rejected requests are frozen
    heading("Rejection");
    let request = requests.create(&maria, new_request(2_000_000)).await?;
    requests
        .transition(&maria, request.id, TransitionCommand::to(DepositState::Validating))
        .await?;
    expect_failure(
        "reject without a reason",
        requests
            .transition(&agent, request.id, TransitionCommand::to(DepositState::Rejected))
            .await,
        ErrorKind::Validation,
    )?;
    let rejected = requests
        .transition(&agent, request.id, TransitionCommand::reject("insufficient income"))
        .await?;
    println!("  {} rejected: {:?}", "✓".green(), rejected.rejection_reason);
    expect_failure(
        "edit a rejected request",
        requests
            .mutate_fields(
                &maria,
                request.id,
                DepositPatch {
                    principal: Some(Decimal::new(3_000_000, 0)),
                    ..Default::default()
                },
            )
            .await,
        ErrorKind::InvalidState,
    )?;
    println!();

    // D: only drafts may be deleted
    heading("Delete guard");
    let request = requests.create(&juan, new_request(1_500_000)).await?;
    requests
        .transition(&juan, request.id, TransitionCommand::to(DepositState::Validating))
        .await?;
    expect_failure(
        "delete a request in validation",
        requests.delete(&juan, request.id).await,
        ErrorKind::InvalidState,
    )?;
    let kept = requests.get(&juan, request.id).await?;
    let records = repositories.audit.list_for(request.id).await?;
    println!(
        "  {} request still {} with {} audit records",
        "✓".green(),
        kept.state,
        records.len()
    );
    expect_failure(
        "maria reads juan's request",
        requests.get(&maria, request.id).await,
        ErrorKind::NotFound,
    )?;
    println!();

    heading("Draft deletion keeps the audit trail");
    let draft = requests.create(&maria, new_request(800_000)).await?;
    requests.delete(&maria, draft.id).await?;
    print_history(&requests.audit_history(&agent, draft.id).await?);
    println!();

    print_summary(&requests.summary(&juan).await?);
    Ok(())
}

fn new_request(principal: i64) -> NewDepositRequest {
    NewDepositRequest {
        principal: Decimal::new(principal, 0),
        term_months: 12,
        interest_rate: Decimal::new(85, 1),
    }
}

fn heading(title: &str) {
    println!("{}", format!("== {} ==", title).bold());
}

fn expect_failure<T: Debug>(
    step: &str,
    result: Result<T, ServiceError>,
    expected: ErrorKind,
) -> Result<()> {
    match result {
        Err(err) if err.kind == expected => {
            println!("  {} {}: {}", "✓".green(), step, err.message.dimmed());
            Ok(())
        }
        Err(err) => bail!("{}: expected {:?}, got {:?}", step, expected, err),
        Ok(value) => bail!("{}: expected {:?}, got {:?}", step, expected, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_walkthrough_completes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neocdt-config.yaml");
        ServiceConfig::default().to_yaml_file(&path).unwrap();

        run(Some(path)).await.unwrap();
    }
}
