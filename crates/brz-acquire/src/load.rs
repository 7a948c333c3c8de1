//! Batch loading
//!
//! Streams normalized chunks into the bronze store. Each chunk splits into
//! load batches; every batch first attempts the native columnar insert
//! (faster, immune to SQL-escaping edge cases) and only on a recoverable
//! native error falls back to a textual INSERT statement that reproduces
//! the identical row content. A textual failure is fatal to the task.
//!
//! The provenance timestamp is appended here, immediately before insertion,
//! so all rows of one load batch share the same `create_date` value.

use chrono::Local;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::destination::StoreClient;
use crate::error::{AcquireError, AcquireResult};
use crate::normalize::NormalizedRecord;
use crate::provision::{quote_ident, PROVENANCE_COLUMN};

/// Provenance timestamp format: second precision, local process clock.
const PROVENANCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Loads normalized records into one bronze table, batch by batch.
pub struct BatchLoader {
    store: Arc<dyn StoreClient>,
    batch_size: usize,
}

impl BatchLoader {
    pub fn new(store: Arc<dyn StoreClient>, batch_size: usize) -> Self {
        Self { store, batch_size }
    }

    /// Load one chunk. Returns the number of records written.
    pub async fn load_chunk(
        &self,
        table: &str,
        columns: &[String],
        records: &[NormalizedRecord],
    ) -> AcquireResult<u64> {
        let mut columns_with_provenance: Vec<String> = columns.to_vec();
        columns_with_provenance.push(PROVENANCE_COLUMN.to_string());

        let mut loaded = 0u64;
        for batch in records.chunks(self.batch_size) {
            loaded += self
                .load_batch(table, &columns_with_provenance, batch)
                .await?;
        }

        Ok(loaded)
    }

    /// Load one batch: stamp provenance, try native, fall back to textual
    /// only on a recoverable native error.
    async fn load_batch(
        &self,
        table: &str,
        columns: &[String],
        batch: &[NormalizedRecord],
    ) -> AcquireResult<u64> {
        let stamp = Local::now().format(PROVENANCE_FORMAT).to_string();

        let rows: Vec<Vec<String>> = batch
            .iter()
            .map(|record| {
                let mut row = record.values.clone();
                row.push(stamp.clone());
                row
            })
            .collect();

        match self.store.bulk_insert(table, columns, &rows).await {
            Ok(n) => {
                debug!(table, rows = n, "Batch inserted (native)");
                Ok(n)
            },
            Err(err) if err.is_recoverable_load() => {
                warn!(table, error = %err, "Native insert failed, retrying textually");
                let sql = build_insert_statement(table, columns, &rows);
                self.store
                    .execute(&sql)
                    .await
                    .map_err(|e| AcquireError::TextualInsert(e.to_string()))?;
                debug!(table, rows = rows.len(), "Batch inserted (textual)");
                Ok(rows.len() as u64)
            },
            Err(err) => Err(err),
        }
    }
}

/// Textual multi-row INSERT: every value single-quoted, internal single
/// quotes doubled. Reproduces exactly the rows the native path would write.
pub fn build_insert_statement(table: &str, columns: &[String], rows: &[Vec<String>]) -> String {
    let column_list = columns
        .iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ");

    let values = rows
        .iter()
        .map(|row| {
            let quoted = row
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", quoted)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {} ({}) VALUES {}", table, column_list, values)
}
