//! Error types for the sync engine

use std::fmt;

use crate::api::ApiError;

use super::types::{SchemaSyncResult, SyncReport};

/// Fatal failure while writing a table's rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSyncError {
    pub table: String,
    pub status: Option<u16>,
    /// Batch size in effect when the failure happened
    pub batch_size: Option<usize>,
    pub message: String,
}

impl RowSyncError {
    pub fn payload_too_large(table: &str, batch_size: usize, message: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            status: Some(413),
            batch_size: Some(batch_size),
            message: message.into(),
        }
    }

    pub fn from_api(table: &str, error: &ApiError) -> Self {
        Self {
            table: table.to_string(),
            status: error.status,
            batch_size: None,
            message: error.message.clone(),
        }
    }

    pub fn is_payload_too_large(&self) -> bool {
        self.status == Some(413)
    }
}

impl fmt::Display for RowSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row sync failed for table '{}'", self.table)?;
        match (self.status, self.batch_size) {
            (Some(status), Some(size)) => write!(f, " (HTTP {}, batch size {})", status, size)?,
            (Some(status), None) => write!(f, " (HTTP {})", status)?,
            (None, Some(size)) => write!(f, " (batch size {})", size)?,
            (None, None) => {}
        }
        write!(f, ": {}", self.message)?;
        if self.is_payload_too_large() {
            write!(f, ". Payload too large: reduce the batch size and retry")?;
        }
        Ok(())
    }
}

impl std::error::Error for RowSyncError {}

/// A migration the target rejected; later migrations were not attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    pub migration_id: String,
    pub message: String,
    /// Migrations applied before the failure
    pub partial: SchemaSyncResult,
}

impl fmt::Display for MigrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Migration '{}' failed after {} applied: {}",
            self.migration_id, self.partial.migrations_applied, self.message
        )
    }
}

impl std::error::Error for MigrationFailure {}

/// Patch files could not be diffed as one set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// Patch files target more than one table
    MixedTables { tables: Vec<String> },
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffError::MixedTables { tables } => write!(
                f,
                "All patch files must target the same table, found: {}",
                tables.join(", ")
            ),
        }
    }
}

impl std::error::Error for DiffError {}

/// Any fatal sync engine error
#[derive(Debug, Clone)]
pub enum SyncError {
    RowSync(RowSyncError),
    Migration(MigrationFailure),
    /// A gateway call the engine could not do without
    Api { context: String, source: ApiError },
    Diff(DiffError),
}

impl SyncError {
    pub fn api(context: impl Into<String>, source: ApiError) -> Self {
        SyncError::Api {
            context: context.into(),
            source,
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::RowSync(e) => write!(f, "{}", e),
            SyncError::Migration(e) => write!(f, "{}", e),
            SyncError::Api { context, source } => write!(f, "{}: {}", context, source),
            SyncError::Diff(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::RowSync(e) => Some(e),
            SyncError::Migration(e) => Some(e),
            SyncError::Api { source, .. } => Some(source),
            SyncError::Diff(e) => Some(e),
        }
    }
}

impl From<RowSyncError> for SyncError {
    fn from(e: RowSyncError) -> Self {
        SyncError::RowSync(e)
    }
}

impl From<MigrationFailure> for SyncError {
    fn from(e: MigrationFailure) -> Self {
        SyncError::Migration(e)
    }
}

impl From<DiffError> for SyncError {
    fn from(e: DiffError) -> Self {
        SyncError::Diff(e)
    }
}

/// A sync run that stopped early, with the report of what completed
#[derive(Debug)]
pub struct SyncRunError {
    pub error: SyncError,
    pub partial: Box<SyncReport>,
}

impl fmt::Display for SyncRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sync aborted: {}", self.error)
    }
}

impl std::error::Error for SyncRunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
