//! Timeouts and retries for gateway calls
//!
//! Wraps any [`TableApiGateway`](crate::api::TableApiGateway) with a per-request
//! timeout and an exponential backoff retry policy for transient failures.

pub mod config;
pub mod gateway;
pub mod retry;

pub use config::{ResilienceConfig, ResilienceConfigBuilder};
pub use gateway::ResilientGateway;
pub use retry::{RetryConfig, RetryPolicy};
