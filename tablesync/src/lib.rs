//! Dependency-ordered schema and row synchronization between two instances of
//! a table content-store API.
//!
//! The engine works against the [`api::TableApiGateway`] trait and never talks
//! HTTP itself. A run looks like:
//!
//! 1. list candidate tables and fetch their schemas (best effort)
//! 2. order tables by foreign-key dependency ([`sync::logic::dependency_graph`])
//! 3. replay the source's migrations against the target ([`sync::logic::migration`])
//! 4. per table, categorize source rows against target rows ([`sync::logic::row_diff`])
//!    and write them in batches ([`sync::logic::batch`])
//!
//! [`sync::SyncOrchestrator`] drives all of the above and returns a
//! [`sync::SyncReport`] for the presentation layer.

pub mod api;
pub mod config;
pub mod logging;
pub mod sync;

pub use api::{
    ApiError, Migration, MigrationOutcome, MigrationStatus, Page, Row, TableApiGateway, WriteKind,
};
pub use config::SyncConfig;
pub use sync::{
    DataSyncResult, DependencyAnalysisResult, DiffResult, RowCategorization, SchemaSyncResult,
    SyncError, SyncOptions, SyncOrchestrator, SyncReport, SyncRunError, TableSyncResult,
};
