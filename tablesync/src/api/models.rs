//! Core data types exchanged with the content-store API

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single row of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row identifier, unique within its table
    pub id: String,
    /// Row content as JSON
    pub data: Value,
}

impl Row {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next_page: bool,
    /// Cursor to pass to the next call, set when `has_next_page` is true
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// A page with nothing after it
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_next_page: false,
            next_cursor: None,
        }
    }
}

/// Kind of row write, selecting the bulk and single-row endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteKind {
    /// Insert a new row with the given id
    Create,
    /// Replace the content of an existing row
    Update,
    /// Apply field-level patches to an existing row; `Row::data` holds the
    /// patch list (`[{"op", "path", "value"}]`)
    Patch,
}

impl WriteKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Patch => "patch",
        }
    }
}

/// A schema change record, applied to the target in list order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "changeType", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Migration {
    /// Create a table with the given schema
    Init {
        id: String,
        table_id: String,
        schema: Value,
    },
    /// Alter a table's schema with JSON patches
    Update {
        id: String,
        table_id: String,
        patches: Vec<Value>,
    },
    /// Rename a table
    Rename {
        id: String,
        table_id: String,
        next_table_id: String,
    },
    /// Drop a table
    Remove { id: String, table_id: String },
}

impl Migration {
    /// Opaque identifier used for ordering and status reporting
    pub fn id(&self) -> &str {
        match self {
            Self::Init { id, .. }
            | Self::Update { id, .. }
            | Self::Rename { id, .. }
            | Self::Remove { id, .. } => id,
        }
    }

    /// Table the migration applies to (the old name for renames)
    pub fn table_id(&self) -> &str {
        match self {
            Self::Init { table_id, .. }
            | Self::Update { table_id, .. }
            | Self::Rename { table_id, .. }
            | Self::Remove { table_id, .. } => table_id,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Update { .. } => "update",
            Self::Rename { .. } => "rename",
            Self::Remove { .. } => "remove",
        }
    }
}

/// Result status of applying one migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    Applied,
    /// Target already reflects this change
    Skipped,
    Failed,
}

/// Response of `apply_migration`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOutcome {
    pub status: MigrationStatus,
    /// Server-side message, set when `status` is `Failed`
    pub error: Option<String>,
}

impl MigrationOutcome {
    pub fn applied() -> Self {
        Self {
            status: MigrationStatus::Applied,
            error: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: MigrationStatus::Skipped,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: MigrationStatus::Failed,
            error: Some(error.into()),
        }
    }
}
