//! The gateway trait the engine consumes

use async_trait::async_trait;
use serde_json::Value;

use super::error::ApiError;
use super::models::{Migration, MigrationOutcome, Page, Row, WriteKind};

/// Connection to one instance of the content-store API
///
/// Implementations are supplied by the connection layer. Writes target the
/// instance's draft revision.
#[async_trait]
pub trait TableApiGateway: Send + Sync {
    /// List table identifiers, one page at a time
    async fn list_tables(&self, cursor: Option<&str>) -> Result<Page<String>, ApiError>;

    /// List rows of a table, one page at a time
    async fn list_rows(&self, table: &str, cursor: Option<&str>) -> Result<Page<Row>, ApiError>;

    /// Fetch the schema of a table
    async fn get_table_schema(&self, table: &str) -> Result<Value, ApiError>;

    async fn create_rows_bulk(&self, table: &str, rows: &[Row]) -> Result<(), ApiError>;
    async fn update_rows_bulk(&self, table: &str, rows: &[Row]) -> Result<(), ApiError>;
    async fn patch_rows_bulk(&self, table: &str, rows: &[Row]) -> Result<(), ApiError>;

    async fn create_row(&self, table: &str, row: &Row) -> Result<(), ApiError>;
    async fn update_row(&self, table: &str, row: &Row) -> Result<(), ApiError>;
    async fn patch_row(&self, table: &str, row: &Row) -> Result<(), ApiError>;

    /// All migrations of the instance, oldest first
    async fn list_migrations(&self) -> Result<Vec<Migration>, ApiError>;

    async fn apply_migration(&self, migration: &Migration) -> Result<MigrationOutcome, ApiError>;

    /// Dispatch a bulk write by kind
    async fn write_rows_bulk(
        &self,
        kind: WriteKind,
        table: &str,
        rows: &[Row],
    ) -> Result<(), ApiError> {
        match kind {
            WriteKind::Create => self.create_rows_bulk(table, rows).await,
            WriteKind::Update => self.update_rows_bulk(table, rows).await,
            WriteKind::Patch => self.patch_rows_bulk(table, rows).await,
        }
    }

    /// Dispatch a single-row write by kind
    async fn write_row(&self, kind: WriteKind, table: &str, row: &Row) -> Result<(), ApiError> {
        match kind {
            WriteKind::Create => self.create_row(table, row).await,
            WriteKind::Update => self.update_row(table, row).await,
            WriteKind::Patch => self.patch_row(table, row).await,
        }
    }
}
