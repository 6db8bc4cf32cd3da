// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! NeoCDT Core
//!
//! Lifecycle engine for time-deposit (CDT) requests: the request state
//! machine, its append-only audit trail, and the repositories behind them.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application services and storage adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
