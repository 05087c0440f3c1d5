//! Business logic for the sync engine
//!
//! This module contains:
//! - Foreign-key dependency ordering of tables
//! - Row categorization and patch diffing
//! - Batched writes with bulk fallback
//! - Ordered migration replay
//! - Path expressions and canonical content hashing used by the above

pub mod batch;
pub mod content_hash;
pub mod dependency_graph;
pub mod migration;
pub mod path;
pub mod row_diff;

pub use batch::{BatchMutationExecutor, BatchOutcome, BatchSize, BulkSupport, SessionState};
pub use dependency_graph::{DependencyGraph, collect_foreign_keys, resolve_dependencies};
pub use migration::{apply_migrations, dry_run_migrations};
pub use row_diff::{categorize, compare_with_api};
