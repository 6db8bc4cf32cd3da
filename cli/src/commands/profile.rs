// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Customer profile commands
//!
//! Commands: register, show

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use neocdt_core::domain::profile::{DocumentType, NewCustomerProfile};

use crate::context::{AppContext, CallerArgs};
use crate::output::print_profile;

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Register the caller's customer profile
    Register {
        #[arg(long)]
        given_names: String,

        #[arg(long)]
        family_names: String,

        /// CC, CE or PASSPORT
        #[arg(long, default_value = "CC", value_parser = parse_document_type)]
        document_type: DocumentType,

        #[arg(long)]
        document_number: String,

        #[arg(long)]
        phone: String,

        /// YYYY-MM-DD
        #[arg(long)]
        birth_date: Option<NaiveDate>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        country: Option<String>,
    },

    /// Show the caller's profile
    Show,
}

fn parse_document_type(code: &str) -> Result<DocumentType, String> {
    DocumentType::from_code(&code.to_uppercase())
        .ok_or_else(|| format!("unknown document type '{}'", code))
}

pub async fn handle_command(
    command: ProfileCommand,
    config_path: Option<PathBuf>,
    caller: &CallerArgs,
    json: bool,
) -> Result<()> {
    let identity = caller.identity()?;
    let ctx = AppContext::load(config_path).await?;

    let profile = match command {
        ProfileCommand::Register {
            given_names,
            family_names,
            document_type,
            document_number,
            phone,
            birth_date,
            address,
            city,
            country,
        } => {
            let profile = ctx
                .profiles
                .register(
                    &identity,
                    NewCustomerProfile {
                        given_names,
                        family_names,
                        document_type,
                        document_number,
                        phone,
                        birth_date,
                        address,
                        city,
                        country,
                    },
                )
                .await?;
            if !json {
                println!("{}", format!("✓ Profile registered: {}", profile.id).green());
            }
            profile
        }
        ProfileCommand::Show => ctx.profiles.get_profile(&identity).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        print_profile(&profile);
    }
    Ok(())
}
