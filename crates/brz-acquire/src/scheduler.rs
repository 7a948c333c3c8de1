//! Fan-out scheduler
//!
//! Launches one extraction task per target, all together, and awaits them
//! jointly. Parallelism is bounded by a semaphore; a task's failure is
//! caught at the task boundary and folded into the job result so siblings
//! always run to completion. There is no mid-flight cancellation.
//!
//! Calling-convention violations (no targets, duplicate target tables) are
//! rejected here, before any task starts; everything after that surfaces
//! only through the structured job result.

use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::aggregate::{aggregate, JobResult};
use crate::config::AcquireConfig;
use crate::destination::StoreClient;
use crate::error::{AcquireError, AcquireResult};
use crate::pipeline;
use crate::source::{open_reader, SourceDescriptor, SourceReader};
use crate::task::{ExtractionTarget, ExtractionTask, TaskResult, TaskStatus};

/// Async factory turning a descriptor into a reader; swapped out in tests.
pub type ReaderFactory = Arc<
    dyn Fn(SourceDescriptor) -> BoxFuture<'static, AcquireResult<Box<dyn SourceReader>>>
        + Send
        + Sync,
>;

/// Runs acquisition jobs: one concurrent task per extraction target.
pub struct FanoutScheduler {
    store: Arc<dyn StoreClient>,
    config: AcquireConfig,
    reader_factory: ReaderFactory,
}

impl FanoutScheduler {
    pub fn new(store: Arc<dyn StoreClient>, config: AcquireConfig) -> Self {
        Self {
            store,
            config,
            reader_factory: Arc::new(
                |descriptor: SourceDescriptor| -> BoxFuture<'static, AcquireResult<Box<dyn SourceReader>>> {
                    Box::pin(async move { open_reader(&descriptor).await })
                },
            ),
        }
    }

    /// Replace the reader factory (used by tests to script sources).
    pub fn with_reader_factory(mut self, factory: ReaderFactory) -> Self {
        self.reader_factory = factory;
        self
    }

    /// Run one job. Returns `Err` only for calling-convention violations;
    /// per-target outcomes, including failures, live in the [`JobResult`].
    pub async fn run_job(&self, targets: Vec<ExtractionTarget>) -> AcquireResult<JobResult> {
        validate_targets(&targets)?;

        info!(
            targets = targets.len(),
            max_parallel = self.config.max_parallel_tasks,
            "Job starting"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_tasks));
        let mut join_set = JoinSet::new();

        for target in targets {
            let store = self.store.clone();
            let config = self.config.clone();
            let factory = self.reader_factory.clone();
            let semaphore = semaphore.clone();

            join_set.spawn(async move {
                let mut task = ExtractionTask::new(target);
                let started = Instant::now();

                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return task.into_result(
                            Some(format!("scheduler semaphore closed: {}", e)),
                            started.elapsed().as_millis() as u64,
                        );
                    },
                };

                task.status = TaskStatus::Running;
                info!(task_id = %task.id, table = %task.target.target_table, "Task running");

                let outcome = run_with_deadline(&store, &config, &factory, &task).await;
                drop(permit);

                let duration_ms = started.elapsed().as_millis() as u64;
                match outcome {
                    Ok(counters) => {
                        task.status = TaskStatus::Succeeded;
                        task.records_extracted = counters.records_extracted;
                        task.records_loaded = counters.records_loaded;
                        task.into_result(None, duration_ms)
                    },
                    Err(e) => {
                        warn!(task_id = %task.id, table = %task.target.target_table, error = %e, "Task failed");
                        task.status = TaskStatus::Failed;
                        task.into_result(Some(e.to_string()), duration_ms)
                    },
                }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    // A panicked task must not take the job down with it.
                    error!(error = %e, "Task panicked");
                    results.push(TaskResult::failed(
                        uuid::Uuid::new_v4(),
                        "<unknown>",
                        format!("task panicked: {}", e),
                        0,
                    ));
                },
            }
        }

        let job_result = aggregate(results);
        info!(status = %job_result.status.as_str(), "{}", job_result.summary());

        Ok(job_result)
    }
}

/// Run one task through the pipeline, under the configured deadline when one
/// is set. An elapsed deadline fails this task only.
async fn run_with_deadline(
    store: &Arc<dyn StoreClient>,
    config: &AcquireConfig,
    factory: &ReaderFactory,
    task: &ExtractionTask,
) -> AcquireResult<pipeline::TaskCounters> {
    let run = async {
        let reader = (factory)(task.target.source.clone()).await?;
        pipeline::run_task(store.clone(), config, &task.target, reader).await
    };

    match config.task_timeout() {
        Some(deadline) => match timeout(deadline, run).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AcquireError::Deadline(config.task_timeout_secs)),
        },
        None => run.await,
    }
}

/// Reject malformed job requests before any task starts.
fn validate_targets(targets: &[ExtractionTarget]) -> AcquireResult<()> {
    if targets.is_empty() {
        return Err(AcquireError::Config("job has no extraction targets".to_string()));
    }

    let mut seen = HashSet::new();
    for target in targets {
        if target.target_table.is_empty() {
            return Err(AcquireError::Config("target table name cannot be empty".to_string()));
        }
        if !seen.insert(target.target_table.as_str()) {
            // Two tasks interleaving DDL and inserts on one table would
            // corrupt it; this is a caller contract, enforced here.
            return Err(AcquireError::Config(format!(
                "duplicate target table '{}' in one job",
                target.target_table
            )));
        }
        target.source.validate()?;
    }

    Ok(())
}
