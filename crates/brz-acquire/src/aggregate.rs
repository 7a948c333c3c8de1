//! Job result aggregation
//!
//! Folds per-task outcomes into one job-level response. Aggregation never
//! fails: a job with zero successes still produces a well-formed result
//! that enumerates every task's outcome and error.

use serde::{Deserialize, Serialize};

use crate::task::TaskResult;

/// Job-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    CompletedWithErrors,
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Success => "success",
            JobStatus::CompletedWithErrors => "completed_with_errors",
        }
    }
}

/// Aggregate outcome of one acquisition job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    /// Records extracted across all succeeded tasks.
    pub records_extracted: i64,
    /// Records loaded across all succeeded tasks.
    pub records_loaded: i64,
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    /// Per-task outcomes, each with its own error message when failed.
    pub tasks: Vec<TaskResult>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    /// Human-readable rollup for logs.
    pub fn summary(&self) -> String {
        format!(
            "Job completed: {} succeeded, {} failed, {} records loaded",
            self.tasks_succeeded, self.tasks_failed, self.records_loaded
        )
    }
}

/// Merge per-task results into the job result. Counters sum over succeeded
/// tasks; failed tasks contribute their error message, not their counts.
pub fn aggregate(results: Vec<TaskResult>) -> JobResult {
    let mut records_extracted = 0i64;
    let mut records_loaded = 0i64;
    let mut tasks_succeeded = 0usize;
    let mut tasks_failed = 0usize;

    for result in &results {
        if result.is_success() {
            tasks_succeeded += 1;
            records_extracted += result.records_extracted;
            records_loaded += result.records_loaded;
        } else {
            tasks_failed += 1;
        }
    }

    let status = if tasks_failed == 0 {
        JobStatus::Success
    } else {
        JobStatus::CompletedWithErrors
    };

    JobResult {
        status,
        records_extracted,
        records_loaded,
        tasks_succeeded,
        tasks_failed,
        tasks: results,
    }
}
