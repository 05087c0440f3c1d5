//! Content-store API surface consumed by the sync engine
//!
//! This module defines the abstract gateway the engine talks to, the data
//! it exchanges with it, and a resilience wrapper adding timeouts and retries
//! on top of any gateway implementation. The concrete HTTP bindings live
//! outside this crate.

pub mod error;
pub mod gateway;
pub mod models;
pub mod resilience;

#[cfg(test)]
pub mod mock;

pub use error::ApiError;
pub use gateway::TableApiGateway;
pub use models::{Migration, MigrationOutcome, MigrationStatus, Page, Row, WriteKind};
pub use resilience::{ResilienceConfig, ResilientGateway, RetryConfig, RetryPolicy};
