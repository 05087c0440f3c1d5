//! Top-level sync coordinator
//!
//! A run lists the candidate tables, orders them by foreign-key dependency,
//! replays schema migrations on the target and then syncs rows table by table
//! in that order. Everything is sequential: one remote call at a time.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::api::{ApiError, Row, TableApiGateway, WriteKind};

use super::error::{RowSyncError, SyncError, SyncRunError};
use super::logic::batch::{BatchMutationExecutor, BatchSize, SessionState};
use super::logic::dependency_graph::resolve_dependencies;
use super::logic::migration::{apply_migrations, dry_run_migrations};
use super::logic::row_diff::{categorize, changed_patch_rows, compare_with_api, index_rows};
use super::types::{
    DataSyncResult, DependencyAnalysisResult, PatchApplyResult, PatchDiffStatus, PatchFile,
    RowDiff, SchemaSyncResult, SyncReport, SyncStats, TableSyncResult,
};

/// What a run does
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub batch_size: BatchSize,
    /// Compute what would change without writing
    pub dry_run: bool,
    /// Restrict the run to these tables; `None` syncs every source table
    pub tables: Option<Vec<String>>,
    pub sync_schema: bool,
    pub sync_data: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: BatchSize::default(),
            dry_run: false,
            tables: None,
            sync_schema: true,
            sync_data: true,
        }
    }
}

/// Fetch every table id, following pagination
pub async fn fetch_all_tables(gateway: &dyn TableApiGateway) -> Result<Vec<String>, ApiError> {
    let mut tables = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = gateway.list_tables(cursor.as_deref()).await?;
        tables.extend(page.items);
        match page.next_cursor {
            Some(next) if page.has_next_page => cursor = Some(next),
            _ => break,
        }
    }

    Ok(tables)
}

/// Fetch every row of a table, following pagination
pub async fn fetch_all_rows(
    gateway: &dyn TableApiGateway,
    table: &str,
) -> Result<Vec<Row>, ApiError> {
    let mut rows = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = gateway.list_rows(table, cursor.as_deref()).await?;
        rows.extend(page.items);
        match page.next_cursor {
            Some(next) if page.has_next_page => cursor = Some(next),
            _ => break,
        }
    }

    log::debug!("Fetched {} rows from {}", rows.len(), table);
    Ok(rows)
}

/// Syncs schema and rows from a source to a target
pub struct SyncOrchestrator {
    source: Arc<dyn TableApiGateway>,
    target: Arc<dyn TableApiGateway>,
    options: SyncOptions,
    /// Bulk support state of the target connection
    session: SessionState,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn TableApiGateway>,
        target: Arc<dyn TableApiGateway>,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            target,
            options,
            session: SessionState::new(),
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Tables named by the filter, or every source table
    pub async fn candidate_tables(&self) -> Result<Vec<String>, SyncError> {
        match &self.options.tables {
            Some(tables) => Ok(tables.clone()),
            None => fetch_all_tables(self.source.as_ref())
                .await
                .map_err(|e| SyncError::api("Failed to list source tables", e)),
        }
    }

    /// Order tables by their foreign-key references
    ///
    /// Schemas are fetched from the source best-effort: a table whose schema
    /// cannot be read is kept without dependencies.
    pub async fn analyze_dependencies(&self, tables: &[String]) -> DependencyAnalysisResult {
        let mut schemas: Vec<(String, Option<Value>)> = Vec::with_capacity(tables.len());

        for table in tables {
            let schema = match self.source.get_table_schema(table).await {
                Ok(schema) => Some(schema),
                Err(e) => {
                    log::warn!("Skipping dependencies of {} - no schema: {}", table, e);
                    None
                }
            };
            schemas.push((table.clone(), schema));
        }

        resolve_dependencies(&schemas)
    }

    /// Replay source migrations on the target
    pub async fn sync_schema(&self) -> Result<SchemaSyncResult, SyncError> {
        let migrations = self
            .source
            .list_migrations()
            .await
            .map_err(|e| SyncError::api("Failed to list source migrations", e))?;

        log::info!("Found {} migrations in source", migrations.len());

        if self.options.dry_run {
            return Ok(dry_run_migrations(&migrations));
        }

        Ok(apply_migrations(self.target.as_ref(), &migrations).await?)
    }

    /// Sync the rows of one table
    pub async fn sync_table(&mut self, table: &str) -> Result<TableSyncResult, RowSyncError> {
        let source_rows = fetch_all_rows(self.source.as_ref(), table)
            .await
            .map_err(|e| RowSyncError::from_api(table, &e))?;

        let target_rows = fetch_all_rows(self.target.as_ref(), table).await;
        let existing: HashMap<String, Value> = match target_rows {
            Ok(rows) => index_rows(rows),
            Err(e) if self.options.dry_run => {
                log::warn!("Could not read {} from target, assuming empty: {}", table, e);
                HashMap::new()
            }
            Err(e) => return Err(RowSyncError::from_api(table, &e)),
        };

        let categorized = categorize(&source_rows, &existing);
        let mut stats = SyncStats {
            skipped: categorized.skipped_count,
            ..Default::default()
        };

        if self.options.dry_run {
            stats.created = categorized.to_create.len();
            stats.updated = categorized.to_update.len();
        } else if categorized.has_writes() {
            let executor =
                BatchMutationExecutor::new(self.target.as_ref(), self.options.batch_size);

            let created = executor
                .execute(&mut self.session, WriteKind::Create, table, &categorized.to_create)
                .await?;
            stats.created = created.succeeded;
            stats.errors += created.failed;

            let updated = executor
                .execute(&mut self.session, WriteKind::Update, table, &categorized.to_update)
                .await?;
            stats.updated = updated.succeeded;
            stats.errors += updated.failed;
        }

        log::info!(
            "{} {}: {} created, {} updated, {} skipped, {} errors",
            if self.options.dry_run { "Analyzed" } else { "Synced" },
            table,
            stats.created,
            stats.updated,
            stats.skipped,
            stats.errors
        );

        Ok(TableSyncResult {
            table: table.to_string(),
            stats,
            source_rows: source_rows.len(),
        })
    }

    /// Sync rows of `tables` in order
    ///
    /// On failure the tables completed so far are left in `result`.
    pub async fn sync_data(
        &mut self,
        tables: &[String],
        result: &mut DataSyncResult,
    ) -> Result<(), RowSyncError> {
        result.dry_run = self.options.dry_run;

        for (i, table) in tables.iter().enumerate() {
            log::info!("Syncing rows of {} ({}/{})", table, i + 1, tables.len());
            let table_result = self.sync_table(table).await?;
            result.push(table_result);
        }

        Ok(())
    }

    /// Run a full sync
    ///
    /// A fatal error stops the run; the error carries the report of
    /// everything completed before it.
    pub async fn run(&mut self) -> Result<SyncReport, SyncRunError> {
        let mut report = SyncReport::new(self.options.dry_run);
        log::info!(
            "Starting sync run {}{}",
            report.run_id,
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        let outcome = self.run_phases(&mut report).await;
        match outcome {
            Ok(()) => {
                report.finish();
                let totals = report.totals();
                log::info!(
                    "Sync run {} finished in {:.1}s: {} created, {} updated, {} skipped, {} errors",
                    report.run_id,
                    report.duration_seconds().unwrap_or_default(),
                    totals.created,
                    totals.updated,
                    totals.skipped,
                    totals.errors
                );
                Ok(report)
            }
            Err(error) => {
                log::error!("Sync run {} aborted: {}", report.run_id, error);
                report.aborted = Some(error.to_string());
                report.finish();
                Err(SyncRunError {
                    error,
                    partial: Box::new(report),
                })
            }
        }
    }

    async fn run_phases(&mut self, report: &mut SyncReport) -> Result<(), SyncError> {
        let tables = self.candidate_tables().await?;
        log::info!("Found {} tables", tables.len());

        let analysis = self.analyze_dependencies(&tables).await;
        if analysis.has_cycles() {
            log::warn!(
                "{} circular dependency group(s); their tables are synced in listing order",
                analysis.cycles.len()
            );
        }
        let order = analysis.sorted_tables.clone();
        report.dependencies = Some(analysis);

        if self.options.sync_schema {
            match self.sync_schema().await {
                Ok(schema) => report.schema = Some(schema),
                Err(SyncError::Migration(failure)) => {
                    report.schema = Some(failure.partial.clone());
                    return Err(SyncError::Migration(failure));
                }
                Err(e) => return Err(e),
            }
        }

        if self.options.sync_data {
            let mut data = DataSyncResult::default();
            let outcome = self.sync_data(&order, &mut data).await;
            report.data = Some(data);
            outcome?;
        }

        Ok(())
    }

    /// Diff patch files against the target and write the changed fields
    ///
    /// Only patches whose value differs from the live row are sent. In a dry
    /// run only the diff is computed.
    ///
    /// A row with any `Error` patch counts once in `errors`, even when its
    /// other patches were written and it also counts in `updated`. `skipped`
    /// holds rows whose patches all matched.
    pub async fn apply_patches(
        &mut self,
        patch_files: &[PatchFile],
        dry_run: bool,
    ) -> Result<PatchApplyResult, SyncError> {
        let mut result = PatchApplyResult {
            dry_run,
            ..Default::default()
        };
        let Some(first) = patch_files.first() else {
            return Ok(result);
        };
        let table = first.table.clone();

        let live = fetch_all_rows(self.target.as_ref(), &table)
            .await
            .map_err(|e| SyncError::api(format!("Failed to read rows of {}", table), e))?;
        let live = index_rows(live);

        result.diff = compare_with_api(patch_files, |id| live.get(id))?;
        log::info!(
            "Patch diff for {}: {} changes in {} rows, {} unchanged, {} errors",
            table,
            result.diff.summary.total_changes,
            result.diff.summary.rows_with_changes,
            result.diff.summary.skipped,
            result.diff.summary.errors
        );

        if dry_run {
            return Ok(result);
        }

        let rows = changed_patch_rows(&result.diff);
        let executor = BatchMutationExecutor::new(self.target.as_ref(), self.options.batch_size);
        let outcome = executor
            .execute(&mut self.session, WriteKind::Patch, &table, &rows)
            .await?;

        let has_error =
            |r: &&RowDiff| r.patches.iter().any(|p| p.status == PatchDiffStatus::Error);
        let unresolved = result.diff.rows.iter().filter(has_error).count();
        let unchanged = result
            .diff
            .rows
            .iter()
            .filter(|r| !r.has_changes())
            .filter(|r| !has_error(r))
            .count();

        result.stats = SyncStats {
            created: 0,
            updated: outcome.succeeded,
            skipped: unchanged,
            errors: outcome.failed + unresolved,
        };

        Ok(result)
    }
}
