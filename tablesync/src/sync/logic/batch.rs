//! Batched row writes with bulk-to-single fallback
//!
//! Rows are written in fixed-size batches through the bulk endpoints. A
//! backend without bulk endpoints answers 404; the first such answer marks
//! the connection as bulk-unsupported for the rest of the run and every
//! remaining row goes through the single-row endpoints.

use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::api::{Row, TableApiGateway, WriteKind};
use crate::sync::error::RowSyncError;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Whether a connection accepts bulk writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkSupport {
    /// No bulk call has been answered yet
    #[default]
    Unknown,
    Supported,
    /// Terminal: no bulk call is made again on this connection
    Unsupported,
}

/// Per-connection state that lives for one run
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    bulk: BulkSupport,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bulk_support(&self) -> BulkSupport {
        self.bulk
    }

    pub fn bulk_allowed(&self) -> bool {
        self.bulk != BulkSupport::Unsupported
    }

    pub fn mark_bulk_supported(&mut self) {
        if self.bulk == BulkSupport::Unknown {
            self.bulk = BulkSupport::Supported;
        }
    }

    pub fn mark_bulk_unsupported(&mut self) {
        self.bulk = BulkSupport::Unsupported;
    }
}

/// Rows per bulk request, never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    pub fn new(size: usize) -> Option<Self> {
        NonZeroUsize::new(size).map(BatchSize)
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

impl BatchSize {
    const DEFAULT: NonZeroUsize = match NonZeroUsize::new(DEFAULT_BATCH_SIZE) {
        Some(size) => size,
        None => panic!("DEFAULT_BATCH_SIZE must be non-zero"),
    };
}

impl Default for BatchSize {
    fn default() -> Self {
        BatchSize(Self::DEFAULT)
    }
}

impl TryFrom<usize> for BatchSize {
    type Error = String;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        BatchSize::new(size).ok_or_else(|| "batch size must be greater than zero".to_string())
    }
}

impl From<BatchSize> for usize {
    fn from(size: BatchSize) -> Self {
        size.get()
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counts from one executor call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// At least one bulk request succeeded
    pub used_bulk: bool,
    /// Bulk was found unsupported during this call
    pub fell_back: bool,
}

/// Writes rows of one table in order
pub struct BatchMutationExecutor<'a> {
    gateway: &'a dyn TableApiGateway,
    batch_size: BatchSize,
}

impl<'a> BatchMutationExecutor<'a> {
    pub fn new(gateway: &'a dyn TableApiGateway, batch_size: BatchSize) -> Self {
        Self {
            gateway,
            batch_size,
        }
    }

    /// Write `rows` to `table`
    ///
    /// Error responses are counted as row-level failures. A 413 answer to a
    /// bulk request is fatal, and so is a bulk request that got no answer at
    /// all, since the target may have committed it. Both are returned as an
    /// error carrying the batch size.
    pub async fn execute(
        &self,
        session: &mut SessionState,
        kind: WriteKind,
        table: &str,
        rows: &[Row],
    ) -> Result<BatchOutcome, RowSyncError> {
        let mut outcome = BatchOutcome::default();
        if rows.is_empty() {
            return Ok(outcome);
        }

        if !session.bulk_allowed() {
            self.write_single(kind, table, rows, &mut outcome).await;
            return Ok(outcome);
        }

        let size = self.batch_size.get();
        for (batch_index, batch) in rows.chunks(size).enumerate() {
            match self.gateway.write_rows_bulk(kind, table, batch).await {
                Ok(()) => {
                    session.mark_bulk_supported();
                    outcome.succeeded += batch.len();
                    outcome.used_bulk = true;
                    log::debug!(
                        "Bulk {} of {} rows in {} succeeded",
                        kind.label(),
                        batch.len(),
                        table
                    );
                }
                Err(e) if e.is_not_found() => {
                    log::warn!(
                        "Bulk {} not supported by target ({}), using single-row writes",
                        kind.label(),
                        e
                    );
                    session.mark_bulk_unsupported();
                    outcome.fell_back = true;

                    let remaining = &rows[batch_index * size..];
                    self.write_single(kind, table, remaining, &mut outcome).await;
                    return Ok(outcome);
                }
                Err(e) if e.is_payload_too_large() => {
                    log::error!(
                        "Bulk {} of {} rows in {} rejected as too large",
                        kind.label(),
                        batch.len(),
                        table
                    );
                    return Err(RowSyncError::payload_too_large(table, size, e.message));
                }
                Err(e) if e.is_transport() => {
                    log::error!(
                        "Bulk {} of {} rows in {} got no answer: {}",
                        kind.label(),
                        batch.len(),
                        table,
                        e
                    );
                    return Err(RowSyncError {
                        batch_size: Some(size),
                        ..RowSyncError::from_api(table, &e)
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Bulk {} of {} rows in {} failed: {}",
                        kind.label(),
                        batch.len(),
                        table,
                        e
                    );
                    outcome.failed += batch.len();
                }
            }
        }

        Ok(outcome)
    }

    async fn write_single(
        &self,
        kind: WriteKind,
        table: &str,
        rows: &[Row],
        outcome: &mut BatchOutcome,
    ) {
        for row in rows {
            match self.gateway.write_row(kind, table, row).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    log::warn!("Failed to {} row {} in {}: {}", kind.label(), row.id, table, e);
                    outcome.failed += 1;
                }
            }
        }
    }
}
