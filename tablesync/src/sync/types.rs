//! Core data types for the sync engine
//!
//! These types carry the results of dependency analysis, row comparison,
//! schema sync and data sync up to the presentation layer. They are plain
//! serializable data and carry no behavior beyond counting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::Row;

/// Processing order for a set of tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyAnalysisResult {
    /// Every input table exactly once, dependencies before dependents
    pub sorted_tables: Vec<String>,
    /// Detected cycles, each as the path of tables forming it
    pub cycles: Vec<Vec<String>>,
    /// Human-readable cycle warnings and remediation hints
    pub warnings: Vec<String>,
}

impl DependencyAnalysisResult {
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// Partition of a table's source rows by required action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowCategorization {
    /// Rows missing from the target
    pub to_create: Vec<Row>,
    /// Rows present in the target with different content
    pub to_update: Vec<Row>,
    /// Rows already identical in the target
    pub skipped_count: usize,
}

impl RowCategorization {
    pub fn total(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.skipped_count
    }

    pub fn has_writes(&self) -> bool {
        !self.to_create.is_empty() || !self.to_update.is_empty()
    }
}

/// Patch operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    #[default]
    Replace,
}

impl PatchOp {
    pub fn label(&self) -> &'static str {
        match self {
            PatchOp::Replace => "replace",
        }
    }
}

/// A declarative field-level change to a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(default)]
    pub op: PatchOp,
    /// Path expression into the row data (`metadata.author`, `items[0].name`)
    pub path: String,
    #[serde(default)]
    pub value: Value,
}

impl Patch {
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value,
        }
    }
}

/// Patches declared for one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchFile {
    pub table: String,
    pub row_id: String,
    pub patches: Vec<Patch>,
}

/// Outcome of comparing one patch against the live row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatchDiffStatus {
    /// Live value differs from the patch value
    Change,
    /// Live value already equals the patch value
    Skip,
    /// Comparison failed (row missing, path unresolvable)
    Error,
}

/// Comparison of one declared patch against the live value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchDiff {
    pub path: String,
    /// Live value at the path; `None` when absent
    pub current_value: Option<Value>,
    pub new_value: Option<Value>,
    pub op: PatchOp,
    pub status: PatchDiffStatus,
    pub error: Option<String>,
}

/// All patch comparisons for one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDiff {
    pub row_id: String,
    pub patches: Vec<PatchDiff>,
}

impl RowDiff {
    pub fn has_changes(&self) -> bool {
        self.patches
            .iter()
            .any(|p| p.status == PatchDiffStatus::Change)
    }

    pub fn changes(&self) -> impl Iterator<Item = &PatchDiff> {
        self.patches
            .iter()
            .filter(|p| p.status == PatchDiffStatus::Change)
    }
}

/// Totals of a diff, counted per patch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total_rows: usize,
    pub rows_with_changes: usize,
    pub total_changes: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Diff of a set of patch files against one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub table: String,
    pub rows: Vec<RowDiff>,
    pub summary: DiffSummary,
}

/// Write counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl SyncStats {
    pub fn merge(&mut self, other: &SyncStats) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.errors
    }
}

/// Result of syncing one table's rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSyncResult {
    pub table: String,
    pub stats: SyncStats,
    /// Rows read from the source
    pub source_rows: usize,
}

/// Result of replaying migrations against the target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSyncResult {
    pub migrations_applied: usize,
    /// Already reflected in the target
    pub migrations_skipped: usize,
    pub tables_created: Vec<String>,
    /// Updated tables; renames appear as `"old → new"`
    pub tables_updated: Vec<String>,
    pub tables_removed: Vec<String>,
    pub dry_run: bool,
}

/// Result of syncing rows across all tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSyncResult {
    /// Per-table results in processing order
    pub tables: Vec<TableSyncResult>,
    pub totals: SyncStats,
    pub dry_run: bool,
}

impl DataSyncResult {
    /// Record a finished table and fold it into the totals
    pub fn push(&mut self, result: TableSyncResult) {
        self.totals.merge(&result.stats);
        self.tables.push(result);
    }
}

/// Result of diffing and applying patch files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchApplyResult {
    pub diff: DiffResult,
    /// `updated` counts patched rows
    pub stats: SyncStats,
    pub dry_run: bool,
}

/// Combined summary of one sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub dependencies: Option<DependencyAnalysisResult>,
    pub schema: Option<SchemaSyncResult>,
    pub data: Option<DataSyncResult>,
    /// Set when the run stopped on a fatal error
    pub aborted: Option<String>,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            completed_at: None,
            dry_run,
            dependencies: None,
            schema: None,
            data: None,
            aborted: None,
        }
    }

    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Data totals, zero when no data sync ran
    pub fn totals(&self) -> SyncStats {
        self.data.as_ref().map(|d| d.totals).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_sync_result_push_accumulates() {
        let mut result = DataSyncResult::default();
        result.push(TableSyncResult {
            table: "images".into(),
            stats: SyncStats { created: 2, updated: 1, skipped: 3, errors: 0 },
            source_rows: 6,
        });
        result.push(TableSyncResult {
            table: "posts".into(),
            stats: SyncStats { created: 1, updated: 0, skipped: 0, errors: 2 },
            source_rows: 3,
        });

        assert_eq!(result.tables.len(), 2);
        assert_eq!(
            result.totals,
            SyncStats { created: 3, updated: 1, skipped: 3, errors: 2 }
        );
        assert_eq!(result.totals.total(), 9);
    }

    #[test]
    fn test_patch_file_deserialize_defaults_op() {
        let file: PatchFile = serde_json::from_value(json!({
            "table": "articles",
            "rowId": "a1",
            "patches": [{"path": "metadata.author", "value": "John"}]
        }))
        .unwrap();

        assert_eq!(file.patches[0].op, PatchOp::Replace);
        assert_eq!(file.patches[0], Patch::replace("metadata.author", json!("John")));
    }

    #[test]
    fn test_patch_diff_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_value(PatchDiffStatus::Change).unwrap(),
            json!("CHANGE")
        );
    }

    #[test]
    fn test_report_finish_sets_duration() {
        let mut report = SyncReport::new(true);
        assert!(report.duration_seconds().is_none());

        report.finish();

        assert!(report.duration_seconds().unwrap() >= 0.0);
        assert_eq!(report.totals(), SyncStats::default());
        assert_eq!(report.run_id.len(), 36);
    }
}
