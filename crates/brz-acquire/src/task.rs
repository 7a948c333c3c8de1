//! Extraction task types
//!
//! One task pairs a source target with a bronze table. Tasks are created at
//! fan-out time and destroyed when their result is folded into the job
//! aggregate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::source::SourceDescriptor;

/// How the target table is provisioned before loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Column set comes from a fresh probe of the source; drop and recreate.
    #[default]
    Full,
    /// Table may be incrementally refreshed; truncate if present, else create.
    Refresh,
}

/// One (source target -> bronze table) pairing submitted to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionTarget {
    pub source: SourceDescriptor,
    /// Unqualified table name; the engine prefixes the bronze schema.
    pub target_table: String,
    #[serde(default)]
    pub load_mode: LoadMode,
}

/// Task lifecycle. There is no cancelled state: in-flight tasks run to
/// completion or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        }
    }
}

/// One live extraction task: created at fan-out time, destroyed when its
/// result is folded into the aggregate.
#[derive(Debug, Clone)]
pub struct ExtractionTask {
    pub id: Uuid,
    pub target: ExtractionTarget,
    pub status: TaskStatus,
    pub records_extracted: i64,
    pub records_loaded: i64,
}

impl ExtractionTask {
    pub fn new(target: ExtractionTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            status: TaskStatus::Pending,
            records_extracted: 0,
            records_loaded: 0,
        }
    }

    /// Fold this task into its terminal result. A present error always means
    /// the task failed, whatever state it reached before.
    pub fn into_result(self, error: Option<String>, duration_ms: u64) -> TaskResult {
        let status = if error.is_some() {
            TaskStatus::Failed
        } else {
            self.status
        };

        TaskResult {
            task_id: self.id,
            target_table: self.target.target_table,
            status,
            records_extracted: self.records_extracted,
            records_loaded: self.records_loaded,
            error,
            duration_ms,
        }
    }
}

/// Per-task outcome reported back to the job aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: Uuid,
    pub target_table: String,
    pub status: TaskStatus,
    pub records_extracted: i64,
    pub records_loaded: i64,
    pub error: Option<String>,
    /// Wall-clock duration of the task in milliseconds.
    pub duration_ms: u64,
}

impl TaskResult {
    /// A freshly failed result carrying the task error message.
    pub fn failed(task_id: Uuid, target_table: &str, error: String, duration_ms: u64) -> Self {
        Self {
            task_id,
            target_table: target_table.to_string(),
            status: TaskStatus::Failed,
            records_extracted: 0,
            records_loaded: 0,
            error: Some(error),
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::Pending.as_str(), "pending");
        assert_eq!(TaskStatus::Running.as_str(), "running");
        assert_eq!(TaskStatus::Succeeded.as_str(), "succeeded");
        assert_eq!(TaskStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_failed_result_carries_error() {
        let id = Uuid::new_v4();
        let result = TaskResult::failed(id, "orders", "connection refused".to_string(), 12);
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.records_loaded, 0);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
        assert!(!result.is_success());
    }
}
