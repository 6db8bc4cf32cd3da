// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal rendering for deposit requests.
//!
//! Customer-facing state labels and the legacy state codes live here and
//! nowhere else.

use colored::{ColoredString, Colorize};
use rust_decimal::Decimal;

use neocdt_core::application::request_service::PortfolioSummary;
use neocdt_core::domain::audit::{LifecycleHistory, StateTransitionRecord};
use neocdt_core::domain::deposit::{DepositRequest, DepositState};
use neocdt_core::domain::profile::CustomerProfile;

/// Customer-facing label of a state
pub fn state_label(state: DepositState) -> &'static str {
    match state {
        DepositState::Draft => "Borrador",
        DepositState::Validating => "En validación",
        DepositState::Approved => "Aprobada",
        DepositState::Rejected => "Rechazada",
        DepositState::Cancelled => "Cancelada",
    }
}

/// Accepts internal names (`validating`), legacy codes (`EN_VALIDACION`)
/// and labels (`En validación`).
pub fn parse_state(input: &str) -> Result<DepositState, String> {
    if let Ok(state) = input.parse::<DepositState>() {
        return Ok(state);
    }
    let normalized = input.trim().to_uppercase().replace(' ', "_");
    match normalized.as_str() {
        "BORRADOR" => Ok(DepositState::Draft),
        "EN_VALIDACION" | "EN_VALIDACIÓN" => Ok(DepositState::Validating),
        "APROBADA" => Ok(DepositState::Approved),
        "RECHAZADA" => Ok(DepositState::Rejected),
        "CANCELADA" => Ok(DepositState::Cancelled),
        _ => Err(format!("unknown state '{}'", input)),
    }
}

pub fn format_state(state: DepositState) -> ColoredString {
    let label = state_label(state);
    match state {
        DepositState::Draft => label.normal(),
        DepositState::Validating => label.yellow(),
        DepositState::Approved => label.green(),
        DepositState::Rejected => label.red(),
        DepositState::Cancelled => label.dimmed(),
    }
}

/// `5000000` -> `$5.000.000`, `1234.5` -> `$1.234,50`
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let whole = rounded.trunc().abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let fraction = rounded.fract().abs();
    if fraction.is_zero() {
        format!("{}${}", sign, grouped)
    } else {
        let cents = (fraction * Decimal::ONE_HUNDRED).trunc();
        format!("{}${},{:0>2}", sign, grouped, cents)
    }
}

pub fn print_request(request: &DepositRequest) {
    println!("Request {}", request.id.to_string().bold());
    println!("  State: {}", format_state(request.state));
    println!("  Principal: {}", format_money(request.principal));
    println!("  Term: {} months", request.term_months);
    println!("  Rate: {}% EA", request.interest_rate);
    if let Some(reason) = &request.rejection_reason {
        println!("  Rejection reason: {}", reason);
    }
    if let Some(opened) = request.opened_at {
        println!("  Opened: {}", opened.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("  Created: {}", request.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Version: {}", request.version);
}

pub fn print_request_line(request: &DepositRequest) {
    println!(
        "  {} - {} - {} months @ {}% - {}",
        request.id,
        format_money(request.principal),
        request.term_months,
        request.interest_rate,
        format_state(request.state)
    );
}

pub fn print_records(records: &[StateTransitionRecord]) {
    for record in records {
        let from = record
            .previous_state
            .map(state_label)
            .unwrap_or("-");
        println!(
            "  #{} {} {} → {} ({} {}) {}",
            record.sequence,
            record.occurred_at.format("%Y-%m-%d %H:%M:%S"),
            from,
            format_state(record.new_state),
            record.actor.role.as_str(),
            record.actor.subject,
            record.note.dimmed()
        );
    }
}

pub fn print_history(history: &LifecycleHistory) {
    println!(
        "Lifecycle of {} (verified, now {})",
        history.request_id,
        format_state(history.current_state())
    );
    for step in &history.steps {
        println!(
            "  {} {} by {} {} - {}",
            step.entered_at.format("%Y-%m-%d %H:%M:%S"),
            format_state(step.state),
            step.entered_by.role.as_str(),
            step.entered_by.subject,
            step.note
        );
    }
}

pub fn print_summary(summary: &PortfolioSummary) {
    println!("{}", "Portfolio summary:".bold());
    println!("  Total requests: {}", summary.total);
    for (state, count) in &summary.by_state {
        println!("  {}: {}", format_state(*state), count);
    }
    println!("  Approved principal: {}", format_money(summary.approved_principal));
}

pub fn print_profile(profile: &CustomerProfile) {
    println!("Profile {}", profile.id.to_string().bold());
    println!("  Name: {}", profile.full_name());
    println!(
        "  Document: {} {}",
        profile.document_type.as_str(),
        profile.document_number
    );
    println!("  Phone: {}", profile.phone);
    if let Some(city) = &profile.city {
        println!("  City: {}", city);
    }
}
