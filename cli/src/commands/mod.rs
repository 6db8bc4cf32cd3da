// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the NeoCDT CLI

pub mod config;
pub mod db;
pub mod demo;
pub mod profile;
pub mod request;

pub use self::config::ConfigCommand;
pub use self::db::DbCommand;
pub use self::profile::ProfileCommand;
pub use self::request::RequestCommand;
