//! Per-task extraction pipeline
//!
//! One task owns one source reader and one bronze table. The flow is
//! strictly sequential: open the reader, size the chunks once, provision the
//! table once from the first chunk's column set, then read -> normalize ->
//! load in offset order until the source is exhausted. Later chunks loading
//! into the same table is why no chunk is ever loaded out of order.

use std::sync::Arc;
use tracing::{debug, info};

use crate::chunk::{plan_chunks, Chunk};
use crate::config::AcquireConfig;
use crate::destination::StoreClient;
use crate::error::AcquireResult;
use crate::load::BatchLoader;
use crate::normalize;
use crate::provision::{ProvisionPolicy, TableProvisioner};
use crate::source::{ChunkRead, SourceReader};
use crate::task::{ExtractionTarget, LoadMode};

/// Running totals for one task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskCounters {
    pub records_extracted: i64,
    pub records_loaded: i64,
}

/// Map a target's load mode onto a provisioning policy.
pub fn policy_for(mode: LoadMode) -> ProvisionPolicy {
    match mode {
        LoadMode::Full => ProvisionPolicy::Recreate,
        LoadMode::Refresh => ProvisionPolicy::TruncateOrCreate,
    }
}

/// Run one extraction task to completion over an already-opened reader.
/// Any error is fatal to this task only; the scheduler folds it into the
/// job result.
pub async fn run_task(
    store: Arc<dyn StoreClient>,
    config: &AcquireConfig,
    target: &ExtractionTarget,
    mut reader: Box<dyn SourceReader>,
) -> AcquireResult<TaskCounters> {
    let estimated_rows = reader.count().await?;
    let plan = plan_chunks(estimated_rows);

    info!(
        source = %target.source.address(),
        table = %target.target_table,
        estimated_rows,
        chunk_size = plan.chunk_size,
        estimated_chunks = plan.estimated_chunks,
        load_batch_size = plan.load_batch_size,
        "Task starting"
    );

    let provisioner = TableProvisioner::new(store.clone(), &config.bronze_schema);
    let loader = BatchLoader::new(store.clone(), plan.load_batch_size);
    let qualified = provisioner.qualified(&target.target_table);

    let mut counters = TaskCounters::default();
    // Column contract, fixed from the first observed chunk.
    let mut columns: Option<Vec<String>> = None;

    loop {
        match reader.next_chunk(plan.chunk_size).await? {
            ChunkRead::Empty => break,
            ChunkRead::Partial(chunk) => {
                load_one_chunk(
                    &provisioner,
                    &loader,
                    target,
                    &qualified,
                    &mut columns,
                    &chunk,
                    &mut counters,
                )
                .await?;
                break;
            },
            ChunkRead::Complete(chunk) => {
                load_one_chunk(
                    &provisioner,
                    &loader,
                    target,
                    &qualified,
                    &mut columns,
                    &chunk,
                    &mut counters,
                )
                .await?;
            },
        }
    }

    if counters.records_extracted == 0 {
        info!(table = %target.target_table, "Source was empty, nothing loaded");
    } else {
        info!(
            table = %target.target_table,
            records_extracted = counters.records_extracted,
            records_loaded = counters.records_loaded,
            "Task extraction complete"
        );
    }

    Ok(counters)
}

/// Normalize and load one chunk. The first chunk also fixes the column
/// contract and provisions the table, strictly before any insert.
async fn load_one_chunk(
    provisioner: &TableProvisioner,
    loader: &BatchLoader,
    target: &ExtractionTarget,
    qualified: &str,
    columns: &mut Option<Vec<String>>,
    chunk: &Chunk,
    counters: &mut TaskCounters,
) -> AcquireResult<()> {
    if columns.is_none() {
        let contract = chunk
            .records
            .first()
            .map(|record| record.column_names())
            .unwrap_or_default();

        provisioner.ensure_schema().await?;
        provisioner
            .provision(&target.target_table, &contract, policy_for(target.load_mode))
            .await?;

        *columns = Some(contract);
    }

    let contract = columns.as_deref().unwrap_or_default();

    let mut normalized = Vec::with_capacity(chunk.len());
    for record in &chunk.records {
        normalized.push(normalize::normalize(record, contract, qualified)?);
    }

    counters.records_extracted += chunk.len() as i64;
    let loaded = loader.load_chunk(qualified, contract, &normalized).await?;
    counters.records_loaded += loaded as i64;

    debug!(
        table = %target.target_table,
        offset = chunk.offset,
        rows = chunk.len(),
        loaded,
        "Chunk loaded"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_mapping() {
        assert_eq!(policy_for(LoadMode::Full), ProvisionPolicy::Recreate);
        assert_eq!(policy_for(LoadMode::Refresh), ProvisionPolicy::TruncateOrCreate);
    }
}
