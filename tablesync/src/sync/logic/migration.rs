//! Ordered replay of schema migrations
//!
//! Migrations are applied one at a time in list order. The first failure stops
//! the replay; nothing after it is sent.

use crate::api::{Migration, MigrationStatus, TableApiGateway};
use crate::sync::error::MigrationFailure;
use crate::sync::types::SchemaSyncResult;

/// Record an applied (or would-be applied) migration in the result
fn record(result: &mut SchemaSyncResult, migration: &Migration) {
    result.migrations_applied += 1;
    match migration {
        Migration::Init { table_id, .. } => result.tables_created.push(table_id.clone()),
        Migration::Update { table_id, .. } => result.tables_updated.push(table_id.clone()),
        Migration::Rename {
            table_id,
            next_table_id,
            ..
        } => result
            .tables_updated
            .push(format!("{} → {}", table_id, next_table_id)),
        Migration::Remove { table_id, .. } => result.tables_removed.push(table_id.clone()),
    }
}

/// Apply migrations to the target in order, stopping at the first failure
///
/// A transport error counts as a failure. The returned failure carries the
/// result of everything applied before it.
pub async fn apply_migrations(
    target: &dyn TableApiGateway,
    migrations: &[Migration],
) -> Result<SchemaSyncResult, MigrationFailure> {
    let mut result = SchemaSyncResult::default();

    for migration in migrations {
        log::debug!(
            "Applying {} migration {} on {}",
            migration.kind_label(),
            migration.id(),
            migration.table_id()
        );

        let outcome = match target.apply_migration(migration).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return Err(MigrationFailure {
                    migration_id: migration.id().to_string(),
                    message: e.to_string(),
                    partial: result,
                });
            }
        };

        match outcome.status {
            MigrationStatus::Applied => record(&mut result, migration),
            MigrationStatus::Skipped => {
                log::debug!("Migration {} already applied, skipping", migration.id());
                result.migrations_skipped += 1;
            }
            MigrationStatus::Failed => {
                let message = outcome
                    .error
                    .unwrap_or_else(|| "migration rejected by target".to_string());
                log::error!("Migration {} failed: {}", migration.id(), message);
                return Err(MigrationFailure {
                    migration_id: migration.id().to_string(),
                    message,
                    partial: result,
                });
            }
        }
    }

    log::info!(
        "Applied {} migrations ({} skipped)",
        result.migrations_applied,
        result.migrations_skipped
    );

    Ok(result)
}

/// Classify migrations by kind without contacting the target
pub fn dry_run_migrations(migrations: &[Migration]) -> SchemaSyncResult {
    let mut result = SchemaSyncResult {
        dry_run: true,
        ..Default::default()
    };
    for migration in migrations {
        record(&mut result, migration);
    }
    result
}
