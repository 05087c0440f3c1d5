//! Row comparison
//!
//! Two independent comparisons share the equality primitive:
//! - `categorize` splits source rows into create/update/skip against the target
//! - `compare_with_api` diffs declared field patches against live rows

use std::collections::HashMap;

use serde_json::{Value, json};

use super::content_hash::content_equal;
use super::path::{PathExpr, resolve_path};
use crate::api::Row;
use crate::sync::error::DiffError;
use crate::sync::types::{
    DiffResult, DiffSummary, PatchDiff, PatchDiffStatus, PatchFile, PatchOp, RowCategorization,
    RowDiff,
};

pub const ROW_NOT_FOUND: &str = "Row not found in API";

/// Index rows by id
pub fn index_rows(rows: Vec<Row>) -> HashMap<String, Value> {
    rows.into_iter().map(|row| (row.id, row.data)).collect()
}

/// Split source rows by the write they need against `existing`
pub fn categorize(source_rows: &[Row], existing: &HashMap<String, Value>) -> RowCategorization {
    let mut result = RowCategorization::default();

    for row in source_rows {
        match existing.get(&row.id) {
            None => result.to_create.push(row.clone()),
            Some(current) if content_equal(&row.data, current) => result.skipped_count += 1,
            Some(_) => result.to_update.push(row.clone()),
        }
    }

    log::debug!(
        "Categorized {} rows: {} create, {} update, {} skip",
        source_rows.len(),
        result.to_create.len(),
        result.to_update.len(),
        result.skipped_count
    );

    result
}

/// Diff patch files against live rows of their table
///
/// `lookup` returns the live data of a row by id. All patch files must target
/// the same table.
pub fn compare_with_api<'a, F>(
    patch_files: &[PatchFile],
    lookup: F,
) -> Result<DiffResult, DiffError>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    let mut tables: Vec<String> = Vec::new();
    for file in patch_files {
        if !tables.contains(&file.table) {
            tables.push(file.table.clone());
        }
    }
    if tables.len() > 1 {
        return Err(DiffError::MixedTables { tables });
    }

    let mut result = DiffResult {
        table: tables.pop().unwrap_or_default(),
        rows: Vec::with_capacity(patch_files.len()),
        summary: DiffSummary::default(),
    };

    for file in patch_files {
        let row = match lookup(&file.row_id) {
            Some(live) => diff_row(file, live),
            None => RowDiff {
                row_id: file.row_id.clone(),
                patches: vec![PatchDiff {
                    path: String::new(),
                    current_value: None,
                    new_value: None,
                    op: PatchOp::Replace,
                    status: PatchDiffStatus::Error,
                    error: Some(ROW_NOT_FOUND.to_string()),
                }],
            },
        };

        result.summary.total_rows += 1;
        if row.has_changes() {
            result.summary.rows_with_changes += 1;
        }
        for patch in &row.patches {
            match patch.status {
                PatchDiffStatus::Change => result.summary.total_changes += 1,
                PatchDiffStatus::Skip => result.summary.skipped += 1,
                PatchDiffStatus::Error => result.summary.errors += 1,
            }
        }
        result.rows.push(row);
    }

    Ok(result)
}

fn diff_row(file: &PatchFile, live: &Value) -> RowDiff {
    let patches = file
        .patches
        .iter()
        .map(|patch| {
            let resolved =
                PathExpr::parse(&patch.path).and_then(|expr| resolve_path(live, &expr));

            let (current_value, status, error) = match resolved {
                Ok(current) => {
                    let status = match current {
                        Some(value) if *value == patch.value => PatchDiffStatus::Skip,
                        _ => PatchDiffStatus::Change,
                    };
                    (current.cloned(), status, None)
                }
                Err(e) => (None, PatchDiffStatus::Error, Some(e.to_string())),
            };

            PatchDiff {
                path: patch.path.clone(),
                current_value,
                new_value: Some(patch.value.clone()),
                op: patch.op,
                status,
                error,
            }
        })
        .collect();

    RowDiff {
        row_id: file.row_id.clone(),
        patches,
    }
}

/// Patch-write rows for every row with at least one change
///
/// Row data is the list of changed patches as `{op, path, value}` objects.
pub fn changed_patch_rows(diff: &DiffResult) -> Vec<Row> {
    diff.rows
        .iter()
        .filter(|row| row.has_changes())
        .map(|row| {
            let patches: Vec<Value> = row
                .changes()
                .map(|p| {
                    json!({
                        "op": p.op.label(),
                        "path": p.path,
                        "value": p.new_value.clone().unwrap_or(Value::Null),
                    })
                })
                .collect();
            Row::new(row.row_id.clone(), Value::Array(patches))
        })
        .collect()
}
