// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Deposit request commands
//!
//! Commands: create, list, get, update, transition, delete, history,
//! summary, pending, audit

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;
use std::path::PathBuf;

use neocdt_core::application::lifecycle_engine::TransitionCommand;
use neocdt_core::domain::deposit::{DepositPatch, DepositRequestId, DepositState, NewDepositRequest};

use crate::context::{AppContext, CallerArgs};
use crate::output::{
    parse_state, print_history, print_records, print_request, print_request_line,
    print_summary,
};

#[derive(Subcommand)]
pub enum RequestCommand {
    /// Open a new request in draft
    Create {
        /// Principal in COP
        #[arg(long)]
        principal: Decimal,

        /// Term in months (1-60)
        #[arg(long)]
        term: u32,

        /// Annual effective rate in percent
        #[arg(long)]
        rate: Decimal,
    },

    /// List the caller's requests, newest first
    List,

    /// Show one request
    Get {
        #[arg(value_parser = parse_request_id)]
        id: DepositRequestId,
    },

    /// Edit the fields of a draft request
    Update {
        #[arg(value_parser = parse_request_id)]
        id: DepositRequestId,

        #[arg(long)]
        principal: Option<Decimal>,

        #[arg(long)]
        term: Option<u32>,

        #[arg(long)]
        rate: Option<Decimal>,
    },

    /// Move a request to another state
    Transition {
        #[arg(value_parser = parse_request_id)]
        id: DepositRequestId,

        /// Target state (validating, EN_VALIDACION, "En validación", ...)
        #[arg(long, value_parser = parse_state)]
        to: DepositState,

        /// Audit note
        #[arg(long)]
        note: Option<String>,

        /// Rejection reason, required when rejecting
        #[arg(long)]
        reason: Option<String>,
    },

    /// Delete a draft request
    Delete {
        #[arg(value_parser = parse_request_id)]
        id: DepositRequestId,
    },

    /// Show the state transitions of a request
    History {
        #[arg(value_parser = parse_request_id)]
        id: DepositRequestId,
    },

    /// Show the caller's portfolio summary
    Summary,

    /// Agent: list requests awaiting review
    Pending,

    /// Agent: replay the audit trail of a request, including deleted ones
    Audit {
        #[arg(value_parser = parse_request_id)]
        id: DepositRequestId,
    },
}

fn parse_request_id(s: &str) -> Result<DepositRequestId, String> {
    DepositRequestId::from_string(s).map_err(|e| format!("invalid request id: {}", e))
}

fn transition_command(
    to: DepositState,
    note: Option<String>,
    reason: Option<String>,
) -> TransitionCommand {
    let command = match (to, reason) {
        (DepositState::Rejected, Some(reason)) => TransitionCommand::reject(reason),
        (target, _) => TransitionCommand::to(target),
    };
    match note {
        Some(note) => command.with_note(note),
        None => command,
    }
}

pub async fn handle_command(
    command: RequestCommand,
    config_path: Option<PathBuf>,
    caller: &CallerArgs,
    json: bool,
) -> Result<()> {
    let identity = caller.identity()?;
    let ctx = AppContext::load(config_path).await?;
    let service = &ctx.requests;

    match command {
        RequestCommand::Create {
            principal,
            term,
            rate,
        } => {
            let request = service
                .create(
                    &identity,
                    NewDepositRequest {
                        principal,
                        term_months: term,
                        interest_rate: rate,
                    },
                )
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&request)?);
            } else {
                println!("{}", format!("✓ Request created: {}", request.id).green());
                print_request(&request);
            }
        }
        RequestCommand::List => {
            let requests = service.list_for_owner(&identity).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&requests)?);
            } else if requests.is_empty() {
                println!("{}", "No requests found".yellow());
            } else {
                println!("{}", format!("Requests ({}):", requests.len()).bold());
                requests.iter().for_each(print_request_line);
            }
        }
        RequestCommand::Get { id } => {
            let request = service.get(&identity, id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&request)?);
            } else {
                print_request(&request);
            }
        }
        RequestCommand::Update {
            id,
            principal,
            term,
            rate,
        } => {
            let patch = DepositPatch {
                principal,
                term_months: term,
                interest_rate: rate,
                rejection_reason: None,
            };
            let request = service.mutate_fields(&identity, id, patch).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&request)?);
            } else {
                println!("{}", "✓ Request updated".green());
                print_request(&request);
            }
        }
        RequestCommand::Transition {
            id,
            to,
            note,
            reason,
        } => {
            let request = service
                .transition(&identity, id, transition_command(to, note, reason))
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&request)?);
            } else {
                println!("{}", "✓ State updated".green());
                print_request(&request);
            }
        }
        RequestCommand::Delete { id } => {
            service.delete(&identity, id).await?;
            if json {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("{}", format!("✓ Request deleted: {}", id).green());
            }
        }
        RequestCommand::History { id } => {
            let records = service.history(&identity, id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                println!("{}", format!("History of {}:", id).bold());
                print_records(&records);
            }
        }
        RequestCommand::Summary => {
            let summary = service.summary(&identity).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        RequestCommand::Pending => {
            let requests = service.list_pending_review(&identity).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&requests)?);
            } else if requests.is_empty() {
                println!("{}", "No requests awaiting review".yellow());
            } else {
                println!("{}", format!("Awaiting review ({}):", requests.len()).bold());
                requests.iter().for_each(print_request_line);
            }
        }
        RequestCommand::Audit { id } => {
            let history = service.audit_history(&identity, id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                print_history(&history);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_only_applies_to_rejection() {
        let rejected = transition_command(
            DepositState::Rejected,
            None,
            Some("Documentos incompletos".to_string()),
        );
        assert_eq!(rejected.target, DepositState::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("Documentos incompletos")
        );

        let approved = transition_command(
            DepositState::Approved,
            Some("ok".to_string()),
            Some("ignored".to_string()),
        );
        assert_eq!(approved.rejection_reason, None);
        assert_eq!(approved.note.as_deref(), Some("ok"));
    }

    #[test]
    fn test_parse_request_id() {
        assert!(parse_request_id("not-a-uuid").is_err());
        let id = DepositRequestId::new();
        assert_eq!(parse_request_id(&id.to_string()), Ok(id));
    }
}
