//! Gateway wrapper applying timeouts and retries to another gateway
//!
//! Reads and idempotent writes (update, patch) are retried on transport
//! failures, 429 and 5xx. Creates and migrations run once under the timeout:
//! repeating them after an ambiguous failure could double-apply.
//! 404 and 413 are never retried since the batch executor reacts to them.

use async_trait::async_trait;
use serde_json::Value;

use super::config::ResilienceConfig;
use super::retry::RetryPolicy;
use crate::api::{ApiError, Migration, MigrationOutcome, Page, Row, TableApiGateway};

pub struct ResilientGateway<G> {
    inner: G,
    policy: RetryPolicy,
    config: ResilienceConfig,
}

impl<G: TableApiGateway> ResilientGateway<G> {
    pub fn new(inner: G, config: ResilienceConfig) -> Self {
        Self {
            inner,
            policy: RetryPolicy::new(config.retry.clone()),
            config,
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: TableApiGateway> TableApiGateway for ResilientGateway<G> {
    async fn list_tables(&self, cursor: Option<&str>) -> Result<Page<String>, ApiError> {
        self.policy
            .execute("list_tables", self.config.request_timeout, move || {
                self.inner.list_tables(cursor)
            })
            .await
    }

    async fn list_rows(&self, table: &str, cursor: Option<&str>) -> Result<Page<Row>, ApiError> {
        self.policy
            .execute("list_rows", self.config.request_timeout, move || {
                self.inner.list_rows(table, cursor)
            })
            .await
    }

    async fn get_table_schema(&self, table: &str) -> Result<Value, ApiError> {
        self.policy
            .execute("get_table_schema", self.config.request_timeout, move || {
                self.inner.get_table_schema(table)
            })
            .await
    }

    async fn create_rows_bulk(&self, table: &str, rows: &[Row]) -> Result<(), ApiError> {
        self.policy
            .run_once(
                "create_rows_bulk",
                self.config.request_timeout,
                self.inner.create_rows_bulk(table, rows),
            )
            .await
    }

    async fn update_rows_bulk(&self, table: &str, rows: &[Row]) -> Result<(), ApiError> {
        self.policy
            .execute("update_rows_bulk", self.config.request_timeout, move || {
                self.inner.update_rows_bulk(table, rows)
            })
            .await
    }

    async fn patch_rows_bulk(&self, table: &str, rows: &[Row]) -> Result<(), ApiError> {
        self.policy
            .execute("patch_rows_bulk", self.config.request_timeout, move || {
                self.inner.patch_rows_bulk(table, rows)
            })
            .await
    }

    async fn create_row(&self, table: &str, row: &Row) -> Result<(), ApiError> {
        self.policy
            .run_once(
                "create_row",
                self.config.request_timeout,
                self.inner.create_row(table, row),
            )
            .await
    }

    async fn update_row(&self, table: &str, row: &Row) -> Result<(), ApiError> {
        self.policy
            .execute("update_row", self.config.request_timeout, move || {
                self.inner.update_row(table, row)
            })
            .await
    }

    async fn patch_row(&self, table: &str, row: &Row) -> Result<(), ApiError> {
        self.policy
            .execute("patch_row", self.config.request_timeout, move || {
                self.inner.patch_row(table, row)
            })
            .await
    }

    async fn list_migrations(&self) -> Result<Vec<Migration>, ApiError> {
        self.policy
            .execute("list_migrations", self.config.request_timeout, move || {
                self.inner.list_migrations()
            })
            .await
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<MigrationOutcome, ApiError> {
        self.policy
            .run_once(
                "apply_migration",
                self.config.request_timeout,
                self.inner.apply_migration(migration),
            )
            .await
    }
}
