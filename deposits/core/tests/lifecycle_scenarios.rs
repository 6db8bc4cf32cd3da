// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use neocdt_core::application::lifecycle_engine::TransitionCommand;
use neocdt_core::application::repository_factory::{
    create_profile_service, create_request_service, Repositories,
};
use neocdt_core::application::profile_service::ProfileService;
use neocdt_core::application::request_service::{ErrorKind, RequestService};
use neocdt_core::domain::deposit::{DepositPatch, DepositState, LifecyclePolicy, NewDepositRequest};
use neocdt_core::domain::profile::{CallerIdentity, NewCustomerProfile};
use neocdt_core::domain::repository::AuditTrail;
use rust_decimal::Decimal;
use std::sync::Arc;

struct Harness {
    requests: Arc<dyn RequestService>,
    repositories: Repositories,
}

async fn harness() -> Harness {
    let repositories = Repositories::in_memory();
    let profiles = create_profile_service(&repositories);
    for (subject, document) in [("juan", "1234567890"), ("maria", "9876543210")] {
        profiles
            .register(
                &CallerIdentity::customer(subject),
                NewCustomerProfile {
                    given_names: subject.to_string(),
                    family_names: "Test".to_string(),
                    document_number: document.to_string(),
                    phone: "3000000000".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    Harness {
        requests: create_request_service(&repositories, LifecyclePolicy::default()),
        repositories,
    }
}

fn cdt(principal: i64) -> NewDepositRequest {
    NewDepositRequest {
        principal: Decimal::new(principal, 0),
        term_months: 12,
        interest_rate: Decimal::new(85, 1),
    }
}

fn juan() -> CallerIdentity {
    CallerIdentity::customer("juan")
}

fn agent() -> CallerIdentity {
    CallerIdentity::agent("agente")
}

#[tokio::test]
async fn scenario_a_create_validate_approve() {
    let h = harness().await;
    let request = h.requests.create(&juan(), cdt(5_000_000)).await.unwrap();
    assert_eq!(request.state, DepositState::Draft);

    h.requests
        .transition(&juan(), request.id, TransitionCommand::to(DepositState::Validating))
        .await
        .unwrap();
    let approved = h
        .requests
        .transition(
            &juan(),
            request.id,
            TransitionCommand::to(DepositState::Approved).with_note("ok"),
        )
        .await
        .unwrap();
    assert_eq!(approved.state, DepositState::Approved);
    assert!(approved.opened_at.is_some());

    let trail = h.requests.history(&juan(), request.id).await.unwrap();
    let hops: Vec<_> = trail.iter().map(|r| (r.previous_state, r.new_state)).collect();
    assert_eq!(
        hops,
        vec![
            (None, DepositState::Draft),
            (Some(DepositState::Draft), DepositState::Validating),
            (Some(DepositState::Validating), DepositState::Approved),
        ]
    );
    assert_eq!(trail[2].note, "ok");
}

#[tokio::test]
async fn scenario_b_principal_below_minimum() {
    let h = harness().await;
    let err = h.requests.create(&juan(), cdt(50_000)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(h.requests.list_for_owner(&juan()).await.unwrap().is_empty());
}

#[tokio::test]
async fn scenario_c_rejection_requires_reason_and_freezes_fields() {
    let h = harness().await;
    let request = h.requests.create(&juan(), cdt(2_000_000)).await.unwrap();
    h.requests
        .transition(&juan(), request.id, TransitionCommand::to(DepositState::Validating))
        .await
        .unwrap();

    let err = h
        .requests
        .transition(&agent(), request.id, TransitionCommand::to(DepositState::Rejected))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let rejected = h
        .requests
        .transition(&agent(), request.id, TransitionCommand::reject("insufficient income"))
        .await
        .unwrap();
    assert_eq!(rejected.rejection_reason.as_deref(), Some("insufficient income"));

    let err = h
        .requests
        .mutate_fields(
            &juan(),
            request.id,
            DepositPatch {
                term_months: Some(24),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}

#[tokio::test]
async fn scenario_d_delete_outside_draft_keeps_everything() {
    let h = harness().await;
    let request = h.requests.create(&juan(), cdt(1_000_000)).await.unwrap();
    h.requests
        .transition(&juan(), request.id, TransitionCommand::to(DepositState::Validating))
        .await
        .unwrap();

    let err = h.requests.delete(&juan(), request.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);

    let stored = h.requests.get(&juan(), request.id).await.unwrap();
    assert_eq!(stored.state, DepositState::Validating);
    assert_eq!(h.requests.history(&juan(), request.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn other_customers_see_not_found() {
    let h = harness().await;
    let maria = CallerIdentity::customer("maria");
    let request = h.requests.create(&juan(), cdt(1_000_000)).await.unwrap();

    let get = h.requests.get(&maria, request.id).await.unwrap_err();
    let patch = h
        .requests
        .mutate_fields(
            &maria,
            request.id,
            DepositPatch {
                term_months: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    let transition = h
        .requests
        .transition(&maria, request.id, TransitionCommand::to(DepositState::Cancelled))
        .await
        .unwrap_err();
    let delete = h.requests.delete(&maria, request.id).await.unwrap_err();

    for err in [get, patch, transition, delete] {
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
    assert!(h.requests.list_for_owner(&maria).await.unwrap().is_empty());
}

#[tokio::test]
async fn unregistered_caller_has_no_profile() {
    let h = harness().await;
    let err = h
        .requests
        .create(&CallerIdentity::customer("pedro"), cdt(1_000_000))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ProfileNotFound);

    let err = h.requests.create(&agent(), cdt(1_000_000)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ProfileNotFound);
}

#[tokio::test]
async fn partial_patch_keeps_absent_fields() {
    let h = harness().await;
    let request = h.requests.create(&juan(), cdt(1_000_000)).await.unwrap();

    let updated = h
        .requests
        .mutate_fields(
            &juan(),
            request.id,
            DepositPatch {
                interest_rate: Some(Decimal::new(95, 1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.interest_rate, Decimal::new(95, 1));
    assert_eq!(updated.principal, request.principal);
    assert_eq!(updated.term_months, request.term_months);
    assert_eq!(updated.version, 2);

    let unchanged = h
        .requests
        .mutate_fields(&juan(), request.id, DepositPatch::default())
        .await
        .unwrap();
    assert_eq!(unchanged.version, 2);

    // Field edits are not state changes
    assert_eq!(h.requests.history(&juan(), request.id).await.unwrap().len(), 1);

    let err = h
        .requests
        .mutate_fields(
            &juan(),
            request.id,
            DepositPatch {
                rejection_reason: Some("n/a".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn list_is_newest_first_and_summary_totals_approved() {
    let h = harness().await;
    let first = h.requests.create(&juan(), cdt(5_000_000)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = h.requests.create(&juan(), cdt(3_000_000)).await.unwrap();

    let listed = h.requests.list_for_owner(&juan()).await.unwrap();
    assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id, first.id]);

    h.requests
        .transition(&juan(), first.id, TransitionCommand::to(DepositState::Validating))
        .await
        .unwrap();
    h.requests
        .transition(&agent(), first.id, TransitionCommand::to(DepositState::Approved))
        .await
        .unwrap();

    let summary = h.requests.summary(&juan()).await.unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.count(DepositState::Approved), 1);
    assert_eq!(summary.count(DepositState::Draft), 1);
    assert_eq!(summary.approved_principal, Decimal::new(5_000_000, 0));
}

#[tokio::test]
async fn agents_review_queue_and_audit_replay() {
    let h = harness().await;
    let maria = CallerIdentity::customer("maria");
    let a = h.requests.create(&juan(), cdt(1_000_000)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let b = h.requests.create(&maria, cdt(2_000_000)).await.unwrap();
    for (caller, id) in [(juan(), a.id), (maria.clone(), b.id)] {
        h.requests
            .transition(&caller, id, TransitionCommand::to(DepositState::Validating))
            .await
            .unwrap();
    }

    let queue = h.requests.list_pending_review(&agent()).await.unwrap();
    assert_eq!(queue.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a.id, b.id]);

    let err = h.requests.list_pending_review(&juan()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);

    h.requests
        .transition(&agent(), b.id, TransitionCommand::to(DepositState::Approved))
        .await
        .unwrap();
    let history = h.requests.audit_history(&agent(), b.id).await.unwrap();
    assert_eq!(history.current_state(), DepositState::Approved);
    let approval = history.entered(DepositState::Approved).unwrap();
    assert_eq!(approval.entered_by.subject.as_str(), "agente");

    let err = h.requests.audit_history(&maria, b.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn audit_trail_outlives_deleted_draft() {
    let h = harness().await;
    let request = h.requests.create(&juan(), cdt(1_000_000)).await.unwrap();
    h.requests.delete(&juan(), request.id).await.unwrap();

    let err = h.requests.get(&juan(), request.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let records = h.repositories.audit.list_for(request.id).await.unwrap();
    assert_eq!(records.len(), 1);

    let history = h.requests.audit_history(&agent(), request.id).await.unwrap();
    assert_eq!(history.current_state(), DepositState::Draft);
}

#[tokio::test]
async fn terminal_states_accept_no_transition() {
    let h = harness().await;
    let request = h.requests.create(&juan(), cdt(1_000_000)).await.unwrap();
    h.requests
        .transition(&juan(), request.id, TransitionCommand::to(DepositState::Cancelled))
        .await
        .unwrap();

    for target in DepositState::ALL {
        let err = h
            .requests
            .transition(&agent(), request.id, TransitionCommand::to(target))
            .await
            .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::IllegalTransition {
                from: DepositState::Cancelled,
                to: target,
            }
        );
    }
    assert_eq!(h.requests.history(&juan(), request.id).await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_approve_and_reject_have_one_winner() {
    for _ in 0..25 {
        let h = harness().await;
        let request = h.requests.create(&juan(), cdt(1_000_000)).await.unwrap();
        h.requests
            .transition(&juan(), request.id, TransitionCommand::to(DepositState::Validating))
            .await
            .unwrap();

        let approve = {
            let service = h.requests.clone();
            tokio::spawn(async move {
                service
                    .transition(&agent(), request.id, TransitionCommand::to(DepositState::Approved))
                    .await
            })
        };
        let reject = {
            let service = h.requests.clone();
            tokio::spawn(async move {
                service
                    .transition(
                        &agent(),
                        request.id,
                        TransitionCommand::reject("duplicate request"),
                    )
                    .await
            })
        };

        let results = [approve.await.unwrap(), reject.await.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one transition must win: {:?}", results);

        for loser in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(
                    loser.kind,
                    ErrorKind::ConcurrencyConflict | ErrorKind::IllegalTransition { .. }
                ),
                "unexpected loser error {:?}",
                loser
            );
        }

        let trail = h.requests.history(&juan(), request.id).await.unwrap();
        assert_eq!(trail.len(), 3);
        let final_state = h.requests.get(&juan(), request.id).await.unwrap().state;
        assert_eq!(trail[2].new_state, final_state);
    }
}
