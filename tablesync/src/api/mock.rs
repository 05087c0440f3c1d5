//! In-memory gateway for tests
//!
//! Stores tables and rows in memory, records every call, and can be told to
//! fail specific endpoints.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    ApiError, Migration, MigrationOutcome, MigrationStatus, Page, Row, TableApiGateway, WriteKind,
};
use crate::sync::logic::path::{PathExpr, set_path};

/// A recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListTables,
    ListRows { table: String },
    GetSchema { table: String },
    BulkWrite {
        kind: WriteKind,
        table: String,
        row_ids: Vec<String>,
    },
    SingleWrite {
        kind: WriteKind,
        table: String,
        row_id: String,
    },
    ListMigrations,
    ApplyMigration { id: String },
}

#[derive(Default)]
struct State {
    tables: Vec<String>,
    schemas: HashMap<String, Value>,
    rows: HashMap<String, Vec<Row>>,
    migrations: Vec<Migration>,
    migration_outcomes: HashMap<String, MigrationOutcome>,
    migration_errors: HashMap<String, ApiError>,
    calls: Vec<Call>,
    page_size: usize,
    bulk_error: Option<ApiError>,
    single_write_error: Option<ApiError>,
    failing_rows: HashSet<String>,
    failing_schemas: HashSet<String>,
    failing_row_reads: HashSet<String>,
    read_failures: usize,
    read_error: Option<ApiError>,
}

pub struct MockGateway {
    state: Mutex<State>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                page_size: 100,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Register a table; `None` schema reads back as `null`
    pub fn with_table(self, table: &str, schema: Option<Value>) -> Self {
        {
            let mut state = self.state();
            state.tables.push(table.to_string());
            state.schemas.insert(table.to_string(), schema.unwrap_or(Value::Null));
            state.rows.entry(table.to_string()).or_default();
        }
        self
    }

    pub fn with_rows(self, table: &str, rows: Vec<Row>) -> Self {
        self.state().rows.insert(table.to_string(), rows);
        self
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state().page_size = page_size.max(1);
        self
    }

    pub fn with_migrations(self, migrations: Vec<Migration>) -> Self {
        self.state().migrations = migrations;
        self
    }

    pub fn with_migration_outcome(self, id: &str, outcome: MigrationOutcome) -> Self {
        self.state().migration_outcomes.insert(id.to_string(), outcome);
        self
    }

    /// `apply_migration` for `id` fails with `error`
    pub fn with_migration_error(self, id: &str, error: ApiError) -> Self {
        self.state().migration_errors.insert(id.to_string(), error);
        self
    }

    /// Bulk endpoints answer 404
    pub fn without_bulk(self) -> Self {
        self.state().bulk_error = Some(ApiError::http(404, "Not Found"));
        self
    }

    /// Bulk endpoints answer with `error`
    pub fn with_bulk_error(self, error: ApiError) -> Self {
        self.state().bulk_error = Some(error);
        self
    }

    pub fn with_failing_row(self, row_id: &str) -> Self {
        self.state().failing_rows.insert(row_id.to_string());
        self
    }

    pub fn with_failing_schema(self, table: &str) -> Self {
        self.state().failing_schemas.insert(table.to_string());
        self
    }

    pub fn with_failing_row_reads(self, table: &str) -> Self {
        self.state().failing_row_reads.insert(table.to_string());
        self
    }

    /// Make the next `count` read calls fail with `error`
    pub fn fail_next_reads(&self, count: usize, error: ApiError) {
        let mut state = self.state();
        state.read_failures = count;
        state.read_error = Some(error);
    }

    /// Make every single-row write fail with `error`
    pub fn fail_single_writes_with(&self, error: ApiError) {
        self.state().single_write_error = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state().rows.get(table).cloned().unwrap_or_default()
    }

    pub fn tables(&self) -> Vec<String> {
        self.state().tables.clone()
    }

    pub fn bulk_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::BulkWrite { .. }))
            .count()
    }

    pub fn single_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::SingleWrite { .. }))
            .count()
    }

    pub fn applied_migration_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ApplyMigration { id } => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl State {
    fn take_read_failure(&mut self) -> Option<ApiError> {
        if self.read_failures == 0 {
            return None;
        }
        self.read_failures -= 1;
        self.read_error.clone()
    }

    fn page<T: Clone>(&self, items: &[T], cursor: Option<&str>) -> Page<T> {
        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(items.len());
        let has_next_page = end < items.len();
        Page {
            items: items[start.min(end)..end].to_vec(),
            has_next_page,
            next_cursor: has_next_page.then(|| end.to_string()),
        }
    }

    fn apply_write(&mut self, kind: WriteKind, table: &str, row: &Row) -> Result<(), ApiError> {
        let rows = self.rows.entry(table.to_string()).or_default();
        let existing = rows.iter_mut().find(|r| r.id == row.id);

        match (kind, existing) {
            (WriteKind::Create, Some(_)) => {
                Err(ApiError::http(409, format!("row {} exists", row.id)))
            }
            (WriteKind::Create, None) => {
                rows.push(row.clone());
                Ok(())
            }
            (WriteKind::Update, Some(target)) => {
                target.data = row.data.clone();
                Ok(())
            }
            (WriteKind::Patch, Some(target)) => {
                let patches = row.data.as_array().cloned().unwrap_or_default();
                for patch in patches {
                    let path = patch.get("path").and_then(|p| p.as_str()).unwrap_or_default();
                    let value = patch.get("value").cloned().unwrap_or(Value::Null);
                    let expr =
                        PathExpr::parse(path).map_err(|e| ApiError::http(400, e.to_string()))?;
                    set_path(&mut target.data, &expr, value)
                        .map_err(|e| ApiError::http(400, e.to_string()))?;
                }
                Ok(())
            }
            (_, None) => Err(ApiError::http(404, format!("row {} not found", row.id))),
        }
    }
}

#[async_trait]
impl TableApiGateway for MockGateway {
    async fn list_tables(&self, cursor: Option<&str>) -> Result<Page<String>, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::ListTables);
        if let Some(error) = state.take_read_failure() {
            return Err(error);
        }
        let tables = state.tables.clone();
        Ok(state.page(&tables, cursor))
    }

    async fn list_rows(&self, table: &str, cursor: Option<&str>) -> Result<Page<Row>, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::ListRows { table: table.to_string() });
        if let Some(error) = state.take_read_failure() {
            return Err(error);
        }
        if state.failing_row_reads.contains(table) {
            return Err(ApiError::http(404, format!("table {} not found", table)));
        }
        let Some(rows) = state.rows.get(table).cloned() else {
            return Err(ApiError::http(404, format!("table {} not found", table)));
        };
        Ok(state.page(&rows, cursor))
    }

    async fn get_table_schema(&self, table: &str) -> Result<Value, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::GetSchema { table: table.to_string() });
        if let Some(error) = state.take_read_failure() {
            return Err(error);
        }
        if state.failing_schemas.contains(table) {
            return Err(ApiError::http(500, "schema unavailable"));
        }
        state
            .schemas
            .get(table)
            .cloned()
            .ok_or_else(|| ApiError::http(404, format!("table {} not found", table)))
    }

    async fn create_rows_bulk(&self, table: &str, rows: &[Row]) -> Result<(), ApiError> {
        self.bulk(WriteKind::Create, table, rows)
    }

    async fn update_rows_bulk(&self, table: &str, rows: &[Row]) -> Result<(), ApiError> {
        self.bulk(WriteKind::Update, table, rows)
    }

    async fn patch_rows_bulk(&self, table: &str, rows: &[Row]) -> Result<(), ApiError> {
        self.bulk(WriteKind::Patch, table, rows)
    }

    async fn create_row(&self, table: &str, row: &Row) -> Result<(), ApiError> {
        self.single(WriteKind::Create, table, row)
    }

    async fn update_row(&self, table: &str, row: &Row) -> Result<(), ApiError> {
        self.single(WriteKind::Update, table, row)
    }

    async fn patch_row(&self, table: &str, row: &Row) -> Result<(), ApiError> {
        self.single(WriteKind::Patch, table, row)
    }

    async fn list_migrations(&self) -> Result<Vec<Migration>, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::ListMigrations);
        Ok(state.migrations.clone())
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<MigrationOutcome, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::ApplyMigration { id: migration.id().to_string() });
        if let Some(error) = state.migration_errors.get(migration.id()) {
            return Err(error.clone());
        }

        let outcome = state
            .migration_outcomes
            .get(migration.id())
            .cloned()
            .unwrap_or_else(MigrationOutcome::applied);

        if outcome.status == MigrationStatus::Applied {
            match migration {
                Migration::Init { table_id, schema, .. } => {
                    state.tables.push(table_id.clone());
                    state.schemas.insert(table_id.clone(), schema.clone());
                    state.rows.entry(table_id.clone()).or_default();
                }
                Migration::Update { .. } => {}
                Migration::Rename { table_id, next_table_id, .. } => {
                    for t in state.tables.iter_mut() {
                        if t.as_str() == table_id.as_str() {
                            *t = next_table_id.clone();
                        }
                    }
                    if let Some(rows) = state.rows.remove(table_id) {
                        state.rows.insert(next_table_id.clone(), rows);
                    }
                }
                Migration::Remove { table_id, .. } => {
                    state.tables.retain(|t| t != table_id);
                    state.rows.remove(table_id);
                }
            }
        }

        Ok(outcome)
    }
}

impl MockGateway {
    fn bulk(&self, kind: WriteKind, table: &str, rows: &[Row]) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(Call::BulkWrite {
            kind,
            table: table.to_string(),
            row_ids: rows.iter().map(|r| r.id.clone()).collect(),
        });
        if let Some(error) = state.bulk_error.clone() {
            return Err(error);
        }
        for row in rows {
            state.apply_write(kind, table, row)?;
        }
        Ok(())
    }

    fn single(&self, kind: WriteKind, table: &str, row: &Row) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(Call::SingleWrite {
            kind,
            table: table.to_string(),
            row_id: row.id.clone(),
        });
        if let Some(error) = state.single_write_error.clone() {
            return Err(error);
        }
        if state.failing_rows.contains(&row.id) {
            return Err(ApiError::http(400, format!("row {} rejected", row.id)));
        }
        state.apply_write(kind, table, row)
    }
}
