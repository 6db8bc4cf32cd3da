// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod lifecycle_engine;
pub mod profile_service;
pub mod repository_factory;
pub mod request_service;

// Re-export use cases for convenience
pub use lifecycle_engine::{EngineError, LifecycleEngine, TransitionCommand};
pub use profile_service::{ProfileService, StandardProfileService};
pub use repository_factory::{create_repositories, Repositories};
pub use request_service::{
    ErrorKind, PortfolioSummary, RequestService, ServiceError, StandardRequestService,
};
