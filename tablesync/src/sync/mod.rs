//! Dependency-ordered schema and row synchronization
//!
//! `logic` holds the pure building blocks, `orchestrator` drives a full run
//! against two gateways.

pub mod error;
pub mod logic;
pub mod orchestrator;
pub mod types;

pub use error::{DiffError, MigrationFailure, RowSyncError, SyncError, SyncRunError};
pub use orchestrator::{SyncOptions, SyncOrchestrator};
pub use types::{
    DataSyncResult, DependencyAnalysisResult, DiffResult, DiffSummary, Patch, PatchApplyResult,
    PatchDiff, PatchDiffStatus, PatchFile, PatchOp, RowCategorization, RowDiff, SchemaSyncResult,
    SyncReport, SyncStats, TableSyncResult,
};
