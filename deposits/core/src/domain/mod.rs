// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Aggregates, value objects and repository contracts of the deposit
//! request lifecycle. Nothing here touches storage or I/O except
//! `config`, which reads the service manifest.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure business model

pub mod audit;
pub mod config;
pub mod deposit;
pub mod profile;
pub mod repository;
